//! Ordered sequences: a source plus a `KeySpec` chain.
//!
//! Declaring an ordering never pulls anything. Each terminal operation (or each opened cursor)
//! is an independent evaluation with its own buffer, key caches and permutation, all released
//! when it finishes.

use std::{future::Future, sync::Arc};

use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use tokio_util::sync::CancellationToken;

use crate::{
    bounded::{Bounds, BoundedView},
    cursor::{sorted_window, OrderedCursor, Plan},
    error::Result,
    keys::{AsyncKey, Comparer, KeyProducer, KeySpec, NaturalOrder, SyncKey},
    scope_print,
    seq::{buffer_source, count_source, Sequence},
};

/// Ordering entry points for every [`Sequence`].
pub trait SequenceExt: Sequence + Sized + 'static {
    /// Ascending by `key`. Ties keep their arrival order.
    fn order_by<K, F>(self, key: F) -> OrderedSequence<Self::Item>
    where
        K: Ord + Send + Sync + 'static,
        F: Fn(&Self::Item) -> K + Send + Sync + 'static,
    {
        self.order_by_with(SyncKey(key), NaturalOrder, false)
    }

    /// Descending by `key`. Ties keep their arrival order.
    fn order_by_descending<K, F>(self, key: F) -> OrderedSequence<Self::Item>
    where
        K: Ord + Send + Sync + 'static,
        F: Fn(&Self::Item) -> K + Send + Sync + 'static,
    {
        self.order_by_with(SyncKey(key), NaturalOrder, true)
    }

    /// Ascending by a key that has to be awaited.
    fn order_by_async<K, F, Fut>(self, key: F) -> OrderedSequence<Self::Item>
    where
        K: Ord + Send + Sync + 'static,
        F: Fn(&Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<K>> + Send,
    {
        self.order_by_with(AsyncKey(key), NaturalOrder, false)
    }

    /// Fully general form: any key producer, any comparer, either direction.
    fn order_by_with<P, C>(self, producer: P, comparer: C, descending: bool) -> OrderedSequence<Self::Item>
    where
        P: KeyProducer<Self::Item>,
        C: Comparer<P::Key>,
    {
        OrderedSequence {
            source: Arc::new(self),
            keys: KeySpec::root(producer, comparer, descending),
        }
    }
}

impl<S: Sequence + 'static> SequenceExt for S {}

/// A source ordered by a `KeySpec` chain. Cheap to clone; clones share the declaration only.
pub struct OrderedSequence<T> {
    source: Arc<dyn Sequence<Item = T>>,
    keys: Arc<KeySpec<T>>,
}

impl<T> Clone for OrderedSequence<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            keys: self.keys.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> OrderedSequence<T> {
    /// Breaks ties of this ordering ascending by `key`.
    pub fn then_by<K, F>(&self, key: F) -> Self
    where
        K: Ord + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.then_by_with(SyncKey(key), NaturalOrder, false)
    }

    /// Breaks ties of this ordering descending by `key`.
    pub fn then_by_descending<K, F>(&self, key: F) -> Self
    where
        K: Ord + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.then_by_with(SyncKey(key), NaturalOrder, true)
    }

    /// Breaks ties of this ordering ascending by a key that has to be awaited.
    pub fn then_by_async<K, F, Fut>(&self, key: F) -> Self
    where
        K: Ord + Send + Sync + 'static,
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<K>> + Send,
    {
        self.then_by_with(AsyncKey(key), NaturalOrder, false)
    }

    pub fn then_by_with<P, C>(&self, producer: P, comparer: C, descending: bool) -> Self
    where
        P: KeyProducer<T>,
        C: Comparer<P::Key>,
    {
        Self {
            source: self.source.clone(),
            keys: self.keys.then(producer, comparer, descending),
        }
    }

    pub fn key_spec(&self) -> &Arc<KeySpec<T>> {
        &self.keys
    }

    /// Opens an evaluation. Nothing is pulled until the cursor is first polled.
    pub fn cursor(&self, cancel: &CancellationToken) -> OrderedCursor<T> {
        self.plan(Some(Bounds::ALL), cancel)
    }

    pub(crate) fn plan(&self, bounds: Option<Bounds>, cancel: &CancellationToken) -> OrderedCursor<T> {
        OrderedCursor::new(Plan {
            source: self.source.clone(),
            keys: self.keys.clone(),
            bounds,
            cancel: cancel.clone(),
        })
    }

    /// Buffers, sorts and copies through the permutation.
    pub async fn to_vec(&self, cancel: &CancellationToken) -> Result<Vec<T>> {
        self.window_vec(Bounds::ALL, cancel).await
    }

    pub async fn to_array(&self, cancel: &CancellationToken) -> Result<Box<[T]>> {
        Ok(self.to_vec(cancel).await?.into_boxed_slice())
    }

    pub(crate) async fn window_vec(&self, bounds: Bounds, cancel: &CancellationToken) -> Result<Vec<T>> {
        scope_print!("materialize");
        let window = sorted_window(self.source.as_ref(), &self.keys, bounds, cancel).await?;
        Ok(window.into_vec())
    }

    /// Element count without sorting. With `only_if_cheap`, `Ok(None)` when the source cannot
    /// tell its length without being pulled; otherwise the source is pulled and counted.
    pub async fn count(&self, only_if_cheap: bool, cancel: &CancellationToken) -> Result<Option<usize>> {
        if let Some(count) = self.source.cheap_count() {
            return Ok(Some(count));
        }
        if only_if_cheap {
            return Ok(None);
        }
        Ok(Some(count_source(self.source.as_ref(), cancel).await?))
    }

    /// The element a full sort would put first, found in one pass without buffering.
    pub async fn first(&self, cancel: &CancellationToken) -> Result<Option<T>> {
        scope_print!("first");
        let mut upstream = self.source.open(cancel);
        self.keys
            .build_comparer()
            .extreme(&mut upstream, true, cancel)
            .await
    }

    /// The element a full sort would put last, found in one pass without buffering.
    pub async fn last(&self, cancel: &CancellationToken) -> Result<Option<T>> {
        scope_print!("last");
        let mut upstream = self.source.open(cancel);
        self.keys
            .build_comparer()
            .extreme(&mut upstream, false, cancel)
            .await
    }

    /// The element a full sort would put at `index`, or `Ok(None)` past the end.
    /// Index 0 streams; anything else buffers once and quickselects.
    pub async fn element_at(&self, index: usize, cancel: &CancellationToken) -> Result<Option<T>> {
        if index == 0 {
            return self.first(cancel).await;
        }

        scope_print!("element_at");
        let mut buffer = buffer_source(self.source.as_ref(), cancel).await?;
        if index >= buffer.len() {
            return Ok(None);
        }
        let selected = self
            .keys
            .build_sorter()
            .select_rank(&buffer, index, cancel)
            .await?;
        Ok(Some(buffer.swap_remove(selected)))
    }

    /// First element of the positions `bounds` selects.
    pub(crate) async fn first_in(&self, bounds: Bounds, cancel: &CancellationToken) -> Result<Option<T>> {
        if bounds.min == 0 {
            self.first(cancel).await
        } else {
            self.element_at(bounds.min, cancel).await
        }
    }

    /// Last element of the positions `bounds` selects.
    ///
    /// When the upper bound falls inside the buffer it is quickselected; otherwise the last
    /// element overall is found with one streaming pass over the buffer.
    pub(crate) async fn last_in(&self, bounds: Bounds, cancel: &CancellationToken) -> Result<Option<T>> {
        scope_print!("last_in");
        let mut buffer = buffer_source(self.source.as_ref(), cancel).await?;
        let count = buffer.len();
        if count <= bounds.min {
            return Ok(None);
        }

        if bounds.max < count - 1 {
            let selected = self
                .keys
                .build_sorter()
                .select_rank(&buffer, bounds.max, cancel)
                .await?;
            return Ok(Some(buffer.swap_remove(selected)));
        }

        let mut buffered = stream::iter(buffer.into_iter().map(Ok));
        self.keys
            .build_comparer()
            .extreme(&mut buffered, false, cancel)
            .await
    }

    /// Skips the first `count` ordered elements.
    pub fn skip(&self, count: usize) -> BoundedView<T> {
        BoundedView::new(
            self.clone(),
            Some(Bounds {
                min: count,
                max: usize::MAX,
            }),
        )
    }

    /// Keeps the first `count` ordered elements.
    pub fn take(&self, count: usize) -> BoundedView<T> {
        let bounds = match count {
            0 => None,
            n => Some(Bounds { min: 0, max: n - 1 }),
        };
        BoundedView::new(self.clone(), bounds)
    }
}

impl<T: Send + Sync + 'static> Sequence for OrderedSequence<T> {
    type Item = T;

    fn open(&self, cancel: &CancellationToken) -> BoxStream<'static, Result<T>> {
        self.cursor(cancel).boxed()
    }

    #[inline(always)]
    fn cheap_count(&self) -> Option<usize> {
        self.source.cheap_count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream;

    use super::*;
    use crate::{
        error::OrderError,
        keys::CancellableKey,
        seq::{from_fn, from_vec},
    };

    fn cancel() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_order_by_is_stable() {
        let items = vec![(5, 'a'), (3, 'b'), (3, 'c'), (1, 'd')];
        let ordered = from_vec(items).order_by(|x| x.0);
        assert_eq!(
            ordered.to_vec(&cancel()).await.unwrap(),
            vec![(1, 'd'), (3, 'b'), (3, 'c'), (5, 'a')]
        );
    }

    #[tokio::test]
    async fn test_then_by_breaks_ties() {
        let items = vec![("b", 2), ("a", 1), ("a", 2)];
        let ordered = from_vec(items).order_by(|x| x.0).then_by(|x| x.1);
        assert_eq!(
            ordered.to_vec(&cancel()).await.unwrap(),
            vec![("a", 1), ("a", 2), ("b", 2)]
        );
    }

    #[tokio::test]
    async fn test_then_by_leaves_parent_ordering_alone() {
        let items = vec![("b", 2), ("a", 2), ("a", 1)];
        let by_name = from_vec(items).order_by(|x| x.0);
        let by_name_then_num = by_name.then_by(|x| x.1);
        assert_eq!(by_name.key_spec().depth(), 1);
        assert_eq!(by_name_then_num.key_spec().depth(), 2);
        assert_eq!(
            by_name.to_vec(&cancel()).await.unwrap(),
            vec![("a", 2), ("a", 1), ("b", 2)]
        );
    }

    #[tokio::test]
    async fn test_descending_orderings() {
        let items = vec![(1, 'x'), (2, 'y'), (1, 'z'), (3, 'w')];
        let ordered = from_vec(items)
            .order_by_descending(|x| x.0)
            .then_by_descending(|x| x.1);
        assert_eq!(
            ordered.to_array(&cancel()).await.unwrap().into_vec(),
            vec![(3, 'w'), (2, 'y'), (1, 'z'), (1, 'x')]
        );
    }

    #[tokio::test]
    async fn test_custom_comparer_for_floats() {
        let items = vec![2.5f64, -1.0, 9.75, 0.0];
        let ordered = from_vec(items).order_by_with(SyncKey(|x: &f64| *x), f64::total_cmp, false);
        assert_eq!(ordered.to_vec(&cancel()).await.unwrap(), vec![-1.0, 0.0, 2.5, 9.75]);
    }

    #[tokio::test]
    async fn test_async_keys() {
        let ordered = from_vec(vec!["ccc", "a", "bb"]).order_by_async(|s| {
            let len = s.len();
            async move {
                tokio::task::yield_now().await;
                Ok(len)
            }
        });
        assert_eq!(ordered.to_vec(&cancel()).await.unwrap(), vec!["a", "bb", "ccc"]);
    }

    #[tokio::test]
    async fn test_first_last_and_element_at() {
        let ordered = from_vec(vec![9, 1, 8, 2, 7]).order_by(|x| *x);
        let cancel = cancel();
        assert_eq!(ordered.first(&cancel).await.unwrap(), Some(1));
        assert_eq!(ordered.last(&cancel).await.unwrap(), Some(9));
        assert_eq!(ordered.element_at(2, &cancel).await.unwrap(), Some(7));
        assert_eq!(ordered.element_at(4, &cancel).await.unwrap(), Some(9));
        assert_eq!(ordered.element_at(5, &cancel).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_source_has_no_elements() {
        let ordered = from_vec(Vec::<i32>::new()).order_by(|x| *x);
        let cancel = cancel();
        assert_eq!(ordered.first(&cancel).await.unwrap(), None);
        assert_eq!(ordered.last(&cancel).await.unwrap(), None);
        assert_eq!(ordered.element_at(0, &cancel).await.unwrap(), None);
        assert_eq!(ordered.element_at(3, &cancel).await.unwrap(), None);
        assert!(ordered.to_vec(&cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_never_sorts() {
        let keyed = Arc::new(AtomicUsize::new(0));
        let counter = keyed.clone();
        let ordered = from_fn(|_| stream::iter((0..4).map(Ok))).order_by(move |x: &i32| {
            counter.fetch_add(1, Ordering::Relaxed);
            *x
        });
        let cancel = cancel();
        assert_eq!(ordered.count(true, &cancel).await.unwrap(), None);
        assert_eq!(ordered.count(false, &cancel).await.unwrap(), Some(4));
        assert_eq!(keyed.load(Ordering::Relaxed), 0);

        let cheap = from_vec(vec![1, 2, 3]).order_by(|x| *x);
        assert_eq!(cheap.count(true, &cancel).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_each_evaluation_pulls_again() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        let ordered = from_fn(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
            stream::iter(vec![Ok(2), Ok(1)])
        })
        .order_by(|x: &i32| *x);
        let cancel = cancel();

        let first: Vec<i32> = ordered.cursor(&cancel).map(|r| r.unwrap()).collect().await;
        let second = ordered.to_vec(&cancel).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(opened.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_ordered_sequence_is_a_sequence() {
        let ordered = from_vec(vec![3, 1, 2]).order_by(|x| *x);
        let reordered = ordered.clone().order_by_descending(|x| *x);
        assert_eq!(reordered.to_vec(&cancel()).await.unwrap(), vec![3, 2, 1]);
        assert_eq!(Sequence::cheap_count(&ordered), Some(3));
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let ordered = from_fn(|_| {
            stream::iter(vec![Ok(1), Err(OrderError::from_source("lost connection"))])
        })
        .order_by(|x: &i32| *x);
        let cancel = cancel();
        assert!(matches!(ordered.to_vec(&cancel).await, Err(OrderError::Source(_))));
        assert!(matches!(ordered.first(&cancel).await, Err(OrderError::Source(_))));
        assert!(matches!(ordered.element_at(1, &cancel).await, Err(OrderError::Source(_))));
    }

    #[tokio::test]
    async fn test_cancellable_selector_cancels_evaluation() {
        let token = cancel();
        let ordered = from_vec(vec![4, 3, 2, 1]).order_by_with(
            CancellableKey(|x: &i32, cancel: CancellationToken| {
                let x = *x;
                async move {
                    if x == 2 {
                        cancel.cancel();
                        return Err(OrderError::Cancelled);
                    }
                    Ok(x)
                }
            }),
            NaturalOrder,
            false,
        );
        assert!(ordered.to_vec(&token).await.unwrap_err().is_cancelled());
        assert!(token.is_cancelled());
        assert!(ordered.first(&token).await.unwrap_err().is_cancelled());
    }
}
