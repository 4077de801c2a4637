//! Keyed sorting over a buffered snapshot.
//!
//! A [`KeyedSorter`] is built from a `KeySpec` chain for a single evaluation. It first fills one
//! key cache per chain level (the only step that may suspend), then orders a permutation map of
//! the buffer with comparisons that read the caches and never suspend.

use std::cmp::Ordering;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    keys::{Comparer, KeyProducer, Level},
    scope_print,
};

pub mod quick;
pub mod streaming;

/// Per-evaluation state of one chain level.
pub(crate) trait SortLevel<T> {
    /// Fills the key cache, one key per buffered element, index for index.
    fn compute_keys<'a>(
        &'a mut self,
        buffer: &'a [T],
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>>;

    /// Compares the cached keys of buffer positions `i` and `j`, direction applied.
    fn compare(&self, i: usize, j: usize) -> Ordering;
}

pub(crate) struct KeyCache<'a, T, P: KeyProducer<T>, C> {
    level: &'a Level<T, P, C>,
    keys: Vec<P::Key>,
}

impl<'a, T, P: KeyProducer<T>, C> KeyCache<'a, T, P, C> {
    pub(crate) fn new(level: &'a Level<T, P, C>) -> Self {
        Self {
            level,
            keys: Vec::new(),
        }
    }
}

impl<T, P, C> SortLevel<T> for KeyCache<'_, T, P, C>
where
    T: Send + Sync + 'static,
    P: KeyProducer<T>,
    C: Comparer<P::Key>,
{
    fn compute_keys<'a>(
        &'a mut self,
        buffer: &'a [T],
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.keys.clear();
            self.keys.reserve_exact(buffer.len());
            for element in buffer {
                let key = self.level.producer.produce(element, cancel).await?;
                self.keys.push(key);
            }
            Ok(())
        })
    }

    #[inline(always)]
    fn compare(&self, i: usize, j: usize) -> Ordering {
        let ord = self.level.comparer.compare(&self.keys[i], &self.keys[j]);
        if self.level.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Sorter for one evaluation of a `KeySpec` chain. Consumed by whichever of
/// [`sort`](Self::sort), [`sort_range`](Self::sort_range) or [`select_rank`](Self::select_rank)
/// runs, which releases the key caches with it.
pub struct KeyedSorter<'a, T> {
    levels: Vec<Box<dyn SortLevel<T> + Send + 'a>>,
}

impl<'a, T: Send + Sync + 'static> KeyedSorter<'a, T> {
    pub(crate) fn new(levels: Vec<Box<dyn SortLevel<T> + Send + 'a>>) -> Self {
        Self { levels }
    }

    /// Fills every level's key cache, primary level first.
    pub async fn compute_keys(&mut self, buffer: &[T], cancel: &CancellationToken) -> Result<()> {
        scope_print!("compute_keys");
        for level in self.levels.iter_mut() {
            level.compute_keys(buffer, cancel).await?;
        }
        Ok(())
    }

    /// Compares buffer positions `i` and `j` level by level, then by position.
    /// Only `Equal` when `i == j`.
    #[inline(always)]
    pub fn compare_any(&self, i: usize, j: usize) -> Ordering {
        for level in &self.levels {
            let ord = level.compare(i, j);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        i.cmp(&j)
    }

    /// Full permutation of `buffer`.
    pub async fn sort(mut self, buffer: &[T], cancel: &CancellationToken) -> Result<Vec<usize>> {
        self.compute_keys(buffer, cancel).await?;
        let mut map = identity(buffer.len());
        quick::sort_map(&mut map, &|a, b| self.compare_any(a, b));
        Ok(map)
    }

    /// Permutation of `buffer` that is correct at positions `min..=max` only.
    pub async fn sort_range(
        mut self,
        buffer: &[T],
        min: usize,
        max: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<usize>> {
        self.compute_keys(buffer, cancel).await?;
        let mut map = identity(buffer.len());
        quick::partial_sort_map(&mut map, min, max, &|a, b| self.compare_any(a, b));
        Ok(map)
    }

    /// Buffer index of the element a full sort would put at `rank`. `rank` must be in range.
    pub async fn select_rank(
        mut self,
        buffer: &[T],
        rank: usize,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.compute_keys(buffer, cancel).await?;
        let mut map = identity(buffer.len());
        Ok(quick::select_map(&mut map, rank, &|a, b| self.compare_any(a, b)))
    }
}

#[inline(always)]
fn identity(len: usize) -> Vec<usize> {
    (0..len).collect()
}
