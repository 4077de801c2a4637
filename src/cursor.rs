//! One evaluation of an ordered sequence or bounded view, exposed as a `Stream`.
//!
//! States: `Created` (nothing pulled) -> `Sorting` (buffering, key computation and sorting; the
//! only place the cursor suspends) -> `Iterating` (yields `buffer[map[i]]`) -> `Disposed` (buffer
//! and map released). Errors, cancellation, exhaustion and [`OrderedCursor::dispose`] all land in
//! `Disposed`, which is terminal.

use std::{
    mem,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    vec,
};

use futures::{future::BoxFuture, stream::FusedStream, Stream};
use tokio_util::sync::CancellationToken;

use crate::{
    bounded::Bounds,
    error::Result,
    keys::KeySpec,
    scope_print,
    seq::{buffer_source, Sequence},
    sort::quick::apply_map,
};

/// The ordered elements of one evaluation still to be yielded.
pub(crate) struct Window<T> {
    items: vec::IntoIter<T>,
}

impl<T> Window<T> {
    pub(crate) fn empty() -> Self {
        Self {
            items: Vec::new().into_iter(),
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    fn next_item(&mut self) -> Option<T> {
        self.items.next()
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        self.items.collect()
    }
}

/// Buffers `source` once and orders the positions `bounds` selects.
///
/// A range covering the whole buffer is fully sorted, a single position is found with
/// quickselect, and anything else is partially sorted. The buffer is then reordered in place and
/// trimmed to the window, so no second copy of the elements is made.
pub(crate) async fn sorted_window<T>(
    source: &(dyn Sequence<Item = T> + '_),
    keys: &KeySpec<T>,
    bounds: Bounds,
    cancel: &CancellationToken,
) -> Result<Window<T>>
where
    T: Send + Sync + 'static,
{
    scope_print!("sorted_window");
    let mut buffer = buffer_source(source, cancel).await?;
    let count = buffer.len();
    if count <= bounds.min {
        return Ok(Window::empty());
    }

    let min = bounds.min;
    let max = bounds.max.min(count - 1);
    let sorter = keys.build_sorter();
    if min == max {
        let selected = sorter.select_rank(&buffer, min, cancel).await?;
        let item = buffer.swap_remove(selected);
        buffer.clear();
        buffer.push(item);
    } else {
        let mut map = if min == 0 && max == count - 1 {
            sorter.sort(&buffer, cancel).await?
        } else {
            sorter.sort_range(&buffer, min, max, cancel).await?
        };
        apply_map(&mut buffer, &mut map);
        buffer.truncate(max + 1);
        buffer.drain(..min);
    }
    log::trace!("ordered positions {min}..={max} of {count}");

    Ok(Window {
        items: buffer.into_iter(),
    })
}

/// Everything an evaluation needs before it starts.
pub(crate) struct Plan<T> {
    pub(crate) source: Arc<dyn Sequence<Item = T>>,
    pub(crate) keys: Arc<KeySpec<T>>,
    /// `None` selects nothing and never pulls the source.
    pub(crate) bounds: Option<Bounds>,
    pub(crate) cancel: CancellationToken,
}

impl<T: Send + Sync + 'static> Plan<T> {
    fn run(self) -> BoxFuture<'static, Result<Window<T>>> {
        Box::pin(async move {
            match self.bounds {
                Some(bounds) => {
                    sorted_window(self.source.as_ref(), &self.keys, bounds, &self.cancel).await
                }
                None => Ok(Window::empty()),
            }
        })
    }
}

/// Observable state of an [`OrderedCursor`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Phase {
    Created,
    Sorting,
    Iterating,
    Disposed,
}

enum State<T> {
    Created(Plan<T>),
    Sorting(BoxFuture<'static, Result<Window<T>>>),
    Iterating(Window<T>),
    Disposed,
}

/// A single evaluation of an ordered sequence. Nothing is pulled until the first poll.
pub struct OrderedCursor<T> {
    state: State<T>,
}

// The sorting future is boxed and nothing else is pinned structurally.
impl<T> Unpin for OrderedCursor<T> {}

impl<T: Send + Sync + 'static> OrderedCursor<T> {
    pub(crate) fn new(plan: Plan<T>) -> Self {
        Self {
            state: State::Created(plan),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Created(_) => Phase::Created,
            State::Sorting(_) => Phase::Sorting,
            State::Iterating(_) => Phase::Iterating,
            State::Disposed => Phase::Disposed,
        }
    }

    /// Releases the buffer, the permutation and the upstream. Idempotent.
    pub fn dispose(&mut self) {
        if !matches!(self.state, State::Disposed) {
            log::trace!("cursor disposed from {:?}", self.phase());
        }
        self.state = State::Disposed;
    }
}

impl<T: Send + Sync + 'static> Stream for OrderedCursor<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match mem::replace(&mut this.state, State::Disposed) {
                State::Created(plan) => {
                    log::trace!("cursor started sorting");
                    this.state = State::Sorting(plan.run());
                }
                State::Sorting(mut sorting) => match sorting.as_mut().poll(cx) {
                    Poll::Pending => {
                        this.state = State::Sorting(sorting);
                        return Poll::Pending;
                    }
                    Poll::Ready(Ok(window)) => {
                        log::trace!("cursor iterating over {} elements", window.len());
                        this.state = State::Iterating(window);
                    }
                    Poll::Ready(Err(err)) => {
                        log::debug!("ordered evaluation ended: {err}");
                        return Poll::Ready(Some(Err(err)));
                    }
                },
                State::Iterating(mut window) => {
                    if let Some(item) = window.next_item() {
                        this.state = State::Iterating(window);
                        return Poll::Ready(Some(Ok(item)));
                    }
                    return Poll::Ready(None);
                }
                State::Disposed => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.state {
            State::Iterating(window) => (window.len(), Some(window.len())),
            State::Disposed => (0, Some(0)),
            _ => (0, None),
        }
    }
}

impl<T: Send + Sync + 'static> FusedStream for OrderedCursor<T> {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Disposed)
    }
}
