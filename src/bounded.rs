//! Index windows over an ordered sequence.
//!
//! `skip`/`take` on an [`OrderedSequence`] do not stack wrappers: they produce a [`BoundedView`]
//! holding one inclusive position range, and further `skip`/`take` calls adjust that range.
//! Terminal operations then run a partial sort of just that range, or a quickselect when the
//! range is a single position.

use futures::{stream::BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::{
    cursor::OrderedCursor,
    error::Result,
    ordered::OrderedSequence,
    seq::Sequence,
};

/// Inclusive range `min..=max` of ordered positions. `max` may exceed the element count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: usize,
    pub max: usize,
}

impl Bounds {
    pub const ALL: Bounds = Bounds {
        min: 0,
        max: usize::MAX,
    };

    /// Number of positions selected out of `count` elements.
    #[inline(always)]
    pub fn clamp_count(&self, count: usize) -> usize {
        if count <= self.min {
            return 0;
        }
        (count - 1).min(self.max) - self.min + 1
    }

    /// Drops the first `count` positions. `None` when nothing is left.
    pub fn skip(self, count: usize) -> Option<Bounds> {
        let min = self.min.checked_add(count)?;
        (min <= self.max).then_some(Bounds { min, max: self.max })
    }

    /// Keeps at most the first `count` positions. `None` when nothing is left.
    pub fn take(self, count: usize) -> Option<Bounds> {
        if count == 0 {
            return None;
        }
        Some(Bounds {
            min: self.min,
            max: self.min.saturating_add(count - 1).min(self.max),
        })
    }
}

/// Marks sequences that know their ordering, so `skip`/`take` can narrow the sort instead of
/// discarding sorted elements.
pub trait OrderedPartition: Sequence {
    fn skip(&self, count: usize) -> BoundedView<Self::Item>;

    fn take(&self, count: usize) -> BoundedView<Self::Item>;
}

/// An ordered sequence restricted to a range of its positions. `bounds == None` is the empty
/// window; evaluating it never pulls the source.
pub struct BoundedView<T> {
    source: OrderedSequence<T>,
    bounds: Option<Bounds>,
}

impl<T> Clone for BoundedView<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            bounds: self.bounds,
        }
    }
}

impl<T: Send + Sync + 'static> BoundedView<T> {
    pub(crate) fn new(source: OrderedSequence<T>, bounds: Option<Bounds>) -> Self {
        Self { source, bounds }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn skip(&self, count: usize) -> Self {
        Self::new(self.source.clone(), self.bounds.and_then(|b| b.skip(count)))
    }

    pub fn take(&self, count: usize) -> Self {
        Self::new(self.source.clone(), self.bounds.and_then(|b| b.take(count)))
    }

    /// Opens an evaluation of the window.
    pub fn cursor(&self, cancel: &CancellationToken) -> OrderedCursor<T> {
        self.source.plan(self.bounds, cancel)
    }

    pub async fn to_vec(&self, cancel: &CancellationToken) -> Result<Vec<T>> {
        match self.bounds {
            Some(bounds) => self.source.window_vec(bounds, cancel).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn to_array(&self, cancel: &CancellationToken) -> Result<Box<[T]>> {
        Ok(self.to_vec(cancel).await?.into_boxed_slice())
    }

    /// Number of elements in the window, never sorting. See [`OrderedSequence::count`].
    pub async fn count(&self, only_if_cheap: bool, cancel: &CancellationToken) -> Result<Option<usize>> {
        let Some(bounds) = self.bounds else {
            return Ok(Some(0));
        };
        Ok(self
            .source
            .count(only_if_cheap, cancel)
            .await?
            .map(|count| bounds.clamp_count(count)))
    }

    /// The element at `index` within the window, or `Ok(None)` outside it.
    pub async fn element_at(&self, index: usize, cancel: &CancellationToken) -> Result<Option<T>> {
        let Some(bounds) = self.bounds else {
            return Ok(None);
        };
        match bounds.min.checked_add(index) {
            Some(rank) if rank <= bounds.max => self.source.element_at(rank, cancel).await,
            _ => Ok(None),
        }
    }

    pub async fn first(&self, cancel: &CancellationToken) -> Result<Option<T>> {
        match self.bounds {
            Some(bounds) => self.source.first_in(bounds, cancel).await,
            None => Ok(None),
        }
    }

    pub async fn last(&self, cancel: &CancellationToken) -> Result<Option<T>> {
        match self.bounds {
            Some(bounds) => self.source.last_in(bounds, cancel).await,
            None => Ok(None),
        }
    }
}

impl<T: Send + Sync + 'static> Sequence for BoundedView<T> {
    type Item = T;

    fn open(&self, cancel: &CancellationToken) -> BoxStream<'static, Result<T>> {
        self.cursor(cancel).boxed()
    }

    fn cheap_count(&self) -> Option<usize> {
        match self.bounds {
            Some(bounds) => Sequence::cheap_count(&self.source).map(|c| bounds.clamp_count(c)),
            None => Some(0),
        }
    }
}

impl<T: Send + Sync + 'static> OrderedPartition for OrderedSequence<T> {
    fn skip(&self, count: usize) -> BoundedView<T> {
        OrderedSequence::skip(self, count)
    }

    fn take(&self, count: usize) -> BoundedView<T> {
        OrderedSequence::take(self, count)
    }
}

impl<T: Send + Sync + 'static> OrderedPartition for BoundedView<T> {
    fn skip(&self, count: usize) -> BoundedView<T> {
        BoundedView::skip(self, count)
    }

    fn take(&self, count: usize) -> BoundedView<T> {
        BoundedView::take(self, count)
    }
}
