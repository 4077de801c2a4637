//! The pull-sequence boundary: declared pipelines (`Sequence`) that open independent
//! evaluations (`BoxStream`s), plus the buffering step every ordering evaluation starts with.

use std::{pin::pin, sync::Arc};

use futures::{
    future::{select, Either},
    stream::{self, BoxStream},
    Stream, StreamExt,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{OrderError, Result},
    scope_print,
};

/// A declared pipeline of elements.
///
/// Every call to [`Sequence::open`] starts a fresh, independent evaluation. Dropping the returned
/// stream disposes of it.
pub trait Sequence: Send + Sync {
    type Item: Send + Sync + 'static;

    /// Opens a new evaluation of this sequence.
    fn open(&self, cancel: &CancellationToken) -> BoxStream<'static, Result<Self::Item>>;

    /// Number of elements, if it can be known without pulling the sequence.
    fn cheap_count(&self) -> Option<usize> {
        None
    }
}

impl<S: Sequence + ?Sized> Sequence for Arc<S> {
    type Item = S::Item;

    #[inline(always)]
    fn open(&self, cancel: &CancellationToken) -> BoxStream<'static, Result<Self::Item>> {
        (**self).open(cancel)
    }

    #[inline(always)]
    fn cheap_count(&self) -> Option<usize> {
        (**self).cheap_count()
    }
}

/// In-memory source. Each evaluation clones the elements out one at a time.
#[derive(Clone, Debug)]
pub struct SliceSource<T> {
    items: Arc<[T]>,
}

impl<T> SliceSource<T> {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> Sequence for SliceSource<T> {
    type Item = T;

    fn open(&self, _cancel: &CancellationToken) -> BoxStream<'static, Result<T>> {
        let items = self.items.clone();
        stream::iter((0..items.len()).map(move |i| Ok(items[i].clone()))).boxed()
    }

    #[inline(always)]
    fn cheap_count(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

pub fn from_vec<T: Clone + Send + Sync + 'static>(items: Vec<T>) -> SliceSource<T> {
    SliceSource {
        items: items.into(),
    }
}

pub fn from_slice<T: Clone + Send + Sync + 'static>(items: &[T]) -> SliceSource<T> {
    SliceSource {
        items: items.into(),
    }
}

/// Source backed by a stream factory, re-invoked for every evaluation. Has no cheap count.
pub struct FnSource<F> {
    factory: F,
}

impl<T, S, F> Sequence for FnSource<F>
where
    T: Send + Sync + 'static,
    S: Stream<Item = Result<T>> + Send + 'static,
    F: Fn(CancellationToken) -> S + Send + Sync,
{
    type Item = T;

    fn open(&self, cancel: &CancellationToken) -> BoxStream<'static, Result<T>> {
        (self.factory)(cancel.clone()).boxed()
    }
}

pub fn from_fn<T, S, F>(factory: F) -> FnSource<F>
where
    T: Send + Sync + 'static,
    S: Stream<Item = Result<T>> + Send + 'static,
    F: Fn(CancellationToken) -> S + Send + Sync,
{
    FnSource { factory }
}

/// Pulls the next element, observing cancellation while the pull is pending.
pub(crate) async fn pull_next<T, S>(upstream: &mut S, cancel: &CancellationToken) -> Result<Option<T>>
where
    S: Stream<Item = Result<T>> + Unpin,
{
    if cancel.is_cancelled() {
        return Err(OrderError::Cancelled);
    }

    let cancelled = pin!(cancel.cancelled());
    match select(cancelled, upstream.next()).await {
        Either::Left(_) => Err(OrderError::Cancelled),
        Either::Right((next, _)) => next.transpose(),
    }
}

/// Pulls `source` to completion into a fresh buffer.
///
/// On error the partially consumed upstream is dropped together with the partial buffer.
pub(crate) async fn buffer_source<T>(
    source: &(dyn Sequence<Item = T> + '_),
    cancel: &CancellationToken,
) -> Result<Vec<T>>
where
    T: Send + Sync + 'static,
{
    scope_print!("buffer_source");
    if cancel.is_cancelled() {
        return Err(OrderError::Cancelled);
    }

    let mut upstream = source.open(cancel);
    let mut buffer = Vec::with_capacity(source.cheap_count().unwrap_or(0));
    while let Some(item) = pull_next(&mut upstream, cancel).await? {
        buffer.push(item);
    }

    log::trace!("buffered {} elements", buffer.len());
    Ok(buffer)
}

/// Pulls `source` to completion, counting elements without keeping them.
pub(crate) async fn count_source<T>(
    source: &(dyn Sequence<Item = T> + '_),
    cancel: &CancellationToken,
) -> Result<usize>
where
    T: Send + Sync + 'static,
{
    if cancel.is_cancelled() {
        return Err(OrderError::Cancelled);
    }

    let mut upstream = source.open(cancel);
    let mut count = 0usize;
    while pull_next(&mut upstream, cancel).await?.is_some() {
        count += 1;
    }
    Ok(count)
}
