//! Incremental extremum search.
//!
//! A [`StreamingComparer`] keeps only the best key seen so far for every chain level, so finding
//! the first or last element of an ordering takes one pass over the elements and `O(depth)` extra
//! memory instead of buffering and sorting.

use std::cmp::Ordering;

use futures::{future::BoxFuture, Stream};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    keys::{Comparer, KeyProducer, Level},
    scope_print,
    seq::pull_next,
};

/// Per-evaluation state of one chain level.
pub(crate) trait StreamLevel<T> {
    /// Records `element`'s key as the current best.
    fn set_best<'a>(
        &'a mut self,
        element: &'a T,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>>;

    /// Computes `element`'s key, holds it as the candidate and compares it against the best,
    /// direction applied.
    fn probe<'a>(
        &'a mut self,
        element: &'a T,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Ordering>>;

    /// Promotes the last probed key to best.
    fn accept(&mut self);
}

pub(crate) struct BestKey<'a, T, P: KeyProducer<T>, C> {
    level: &'a Level<T, P, C>,
    best: Option<P::Key>,
    candidate: Option<P::Key>,
}

impl<'a, T, P: KeyProducer<T>, C> BestKey<'a, T, P, C> {
    pub(crate) fn new(level: &'a Level<T, P, C>) -> Self {
        Self {
            level,
            best: None,
            candidate: None,
        }
    }
}

impl<T, P, C> StreamLevel<T> for BestKey<'_, T, P, C>
where
    T: Send + Sync + 'static,
    P: KeyProducer<T>,
    C: Comparer<P::Key>,
{
    fn set_best<'a>(
        &'a mut self,
        element: &'a T,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.best = Some(self.level.producer.produce(element, cancel).await?);
            self.candidate = None;
            Ok(())
        })
    }

    fn probe<'a>(
        &'a mut self,
        element: &'a T,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Ordering>> {
        Box::pin(async move {
            let key = self.level.producer.produce(element, cancel).await?;
            let ord = match &self.best {
                Some(best) => {
                    let ord = self.level.comparer.compare(&key, best);
                    if self.level.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
                None => Ordering::Less,
            };
            self.candidate = Some(key);
            Ok(ord)
        })
    }

    #[inline(always)]
    fn accept(&mut self) {
        if let Some(key) = self.candidate.take() {
            self.best = Some(key);
        }
    }
}

/// Streaming comparer for one evaluation of a `KeySpec` chain.
pub struct StreamingComparer<'a, T> {
    levels: Vec<Box<dyn StreamLevel<T> + Send + 'a>>,
}

impl<'a, T: Send + Sync + 'static> StreamingComparer<'a, T> {
    pub(crate) fn new(levels: Vec<Box<dyn StreamLevel<T> + Send + 'a>>) -> Self {
        Self { levels }
    }

    /// Makes `element` the current best on every level.
    pub async fn set_best(&mut self, element: &T, cancel: &CancellationToken) -> Result<()> {
        for level in self.levels.iter_mut() {
            level.set_best(element, cancel).await?;
        }
        Ok(())
    }

    /// Compares `element` against the current best, level by level.
    ///
    /// The first level that does not tie decides. The best is replaced when `element` orders
    /// below it with `prefer_lower`, or above it without; deeper levels then take `element`'s
    /// keys too. Deeper keys are only computed when every level before them tied.
    pub async fn compare(
        &mut self,
        element: &T,
        prefer_lower: bool,
        cancel: &CancellationToken,
    ) -> Result<Ordering> {
        for depth in 0..self.levels.len() {
            let ord = self.levels[depth].probe(element, cancel).await?;
            if ord == Ordering::Equal {
                continue;
            }

            if prefer_lower == (ord == Ordering::Less) {
                self.levels[depth].accept();
                for deeper in self.levels[depth + 1..].iter_mut() {
                    deeper.set_best(element, cancel).await?;
                }
            }
            return Ok(ord);
        }

        Ok(Ordering::Equal)
    }

    /// One pass over `upstream` keeping the element a stable sort would put first
    /// (`prefer_lower`) or last (`!prefer_lower`). `Ok(None)` when `upstream` is empty.
    pub async fn extreme<S>(
        mut self,
        upstream: &mut S,
        prefer_lower: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<T>>
    where
        S: Stream<Item = Result<T>> + Unpin + Send,
    {
        scope_print!("streaming_extreme");
        let Some(mut best) = pull_next(upstream, cancel).await? else {
            return Ok(None);
        };
        self.set_best(&best, cancel).await?;

        while let Some(element) = pull_next(upstream, cancel).await? {
            let ord = self.compare(&element, prefer_lower, cancel).await?;
            // Ties go to the earliest element for "first" and the latest for "last".
            let replace = if prefer_lower {
                ord == Ordering::Less
            } else {
                ord != Ordering::Less
            };
            if replace {
                best = element;
            }
        }

        Ok(Some(best))
    }
}

#[cfg(test)]
mod tests {
    use futures::stream::{self, StreamExt};

    use super::*;
    use crate::keys::{AsyncKey, KeySpec, NaturalOrder, SyncKey};

    type Row = (&'static str, u32, char);

    fn rows() -> Vec<Row> {
        vec![
            ("b", 2, 'p'),
            ("a", 1, 'q'),
            ("a", 2, 'r'),
            ("c", 0, 's'),
            ("a", 1, 't'),
            ("c", 0, 'u'),
        ]
    }

    fn upstream(rows: Vec<Row>) -> impl Stream<Item = Result<Row>> + Unpin + Send {
        stream::iter(rows.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn test_first_keeps_earliest_of_ties() {
        let spec = KeySpec::root(SyncKey(|r: &Row| r.0), NaturalOrder, false)
            .then(SyncKey(|r: &Row| r.1), NaturalOrder, false);
        let cancel = CancellationToken::new();
        let first = spec
            .build_comparer()
            .extreme(&mut upstream(rows()), true, &cancel)
            .await
            .unwrap();
        assert_eq!(first, Some(("a", 1, 'q')));
    }

    #[tokio::test]
    async fn test_last_keeps_latest_of_ties() {
        let spec = KeySpec::root(SyncKey(|r: &Row| r.0), NaturalOrder, false)
            .then(SyncKey(|r: &Row| r.1), NaturalOrder, false);
        let cancel = CancellationToken::new();
        let last = spec
            .build_comparer()
            .extreme(&mut upstream(rows()), false, &cancel)
            .await
            .unwrap();
        assert_eq!(last, Some(("c", 0, 'u')));
    }

    #[tokio::test]
    async fn test_descending_secondary_level() {
        let spec = KeySpec::root(SyncKey(|r: &Row| r.0), NaturalOrder, false)
            .then(SyncKey(|r: &Row| r.1), NaturalOrder, true);
        let cancel = CancellationToken::new();
        let first = spec
            .build_comparer()
            .extreme(&mut upstream(rows()), true, &cancel)
            .await
            .unwrap();
        assert_eq!(first, Some(("a", 2, 'r')));
    }

    #[tokio::test]
    async fn test_empty_upstream_has_no_extreme() {
        let spec = KeySpec::root(SyncKey(|r: &Row| r.1), NaturalOrder, false);
        let first = spec
            .build_comparer()
            .extreme(&mut upstream(vec![]), true, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first, None);
    }

    #[tokio::test]
    async fn test_secondary_keys_only_computed_on_ties() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let spec = KeySpec::root(SyncKey(|x: &(u32, u32)| x.0), NaturalOrder, false).then(
            AsyncKey(move |x: &(u32, u32)| {
                counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                let key = x.1;
                async move { Ok(key) }
            }),
            NaturalOrder,
            false,
        );
        // Strictly decreasing primary keys: every element replaces the best, so the secondary
        // key is computed once for the initial best and once per replacement, never by a probe.
        let items: Vec<Result<(u32, u32)>> = (0..5u32).rev().map(|i| Ok((i, i))).collect();
        let first = spec
            .build_comparer()
            .extreme(&mut stream::iter(items).boxed(), true, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first, Some((0, 0)));
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 5);
    }
}
