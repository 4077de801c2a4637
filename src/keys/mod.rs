//! `KeySpec` chains: an immutable linked list of (key selector, comparer, direction) nodes.
//!
//! The first node is the primary ordering; every `then_by` appends a node that only breaks ties
//! left by the nodes before it. A chain never evaluates anything itself: it builds the
//! per-evaluation state (a [`KeyedSorter`] or a [`StreamingComparer`]) that does.

use std::{marker::PhantomData, sync::Arc};

use crate::sort::{
    streaming::{BestKey, StreamLevel, StreamingComparer},
    KeyCache, KeyedSorter, SortLevel,
};

pub mod comparer;
pub mod producer;

pub use comparer::{Comparer, NaturalOrder};
pub use producer::{AsyncKey, CancellableKey, KeyProducer, SyncKey};

/// One ordering level with its key type erased.
pub(crate) trait KeyLevel<T>: Send + Sync {
    fn descending(&self) -> bool;

    fn sort_level(&self) -> Box<dyn SortLevel<T> + Send + '_>;

    fn stream_level(&self) -> Box<dyn StreamLevel<T> + Send + '_>;
}

pub(crate) struct Level<T, P, C> {
    pub(crate) producer: P,
    pub(crate) comparer: C,
    pub(crate) descending: bool,
    _element: PhantomData<fn(&T)>,
}

impl<T, P, C> KeyLevel<T> for Level<T, P, C>
where
    T: Send + Sync + 'static,
    P: KeyProducer<T>,
    C: Comparer<P::Key>,
{
    #[inline(always)]
    fn descending(&self) -> bool {
        self.descending
    }

    fn sort_level(&self) -> Box<dyn SortLevel<T> + Send + '_> {
        Box::new(KeyCache::new(self))
    }

    fn stream_level(&self) -> Box<dyn StreamLevel<T> + Send + '_> {
        Box::new(BestKey::new(self))
    }
}

/// A node of the chain. `parent` holds every ordering declared before this one.
pub struct KeySpec<T> {
    level: Box<dyn KeyLevel<T>>,
    parent: Option<Arc<KeySpec<T>>>,
}

impl<T: Send + Sync + 'static> KeySpec<T> {
    /// A one-node chain.
    pub fn root<P, C>(producer: P, comparer: C, descending: bool) -> Arc<Self>
    where
        P: KeyProducer<T>,
        C: Comparer<P::Key>,
    {
        Arc::new(Self {
            level: Self::level(producer, comparer, descending),
            parent: None,
        })
    }

    /// A new chain that breaks this chain's ties with one more ordering.
    /// `self` is shared, not modified.
    pub fn then<P, C>(self: &Arc<Self>, producer: P, comparer: C, descending: bool) -> Arc<Self>
    where
        P: KeyProducer<T>,
        C: Comparer<P::Key>,
    {
        Arc::new(Self {
            level: Self::level(producer, comparer, descending),
            parent: Some(self.clone()),
        })
    }

    /// Fresh sorter state for one evaluation.
    pub fn build_sorter(&self) -> KeyedSorter<'_, T> {
        KeyedSorter::new(self.levels().into_iter().map(|l| l.sort_level()).collect())
    }

    /// Fresh streaming comparer state for one evaluation.
    pub fn build_comparer(&self) -> StreamingComparer<'_, T> {
        StreamingComparer::new(self.levels().into_iter().map(|l| l.stream_level()).collect())
    }

    fn level<P, C>(producer: P, comparer: C, descending: bool) -> Box<dyn KeyLevel<T>>
    where
        P: KeyProducer<T>,
        C: Comparer<P::Key>,
    {
        Box::new(Level {
            producer,
            comparer,
            descending,
            _element: PhantomData,
        })
    }
}

impl<T> KeySpec<T> {
    /// Number of orderings in the chain.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut node = self;
        while let Some(parent) = &node.parent {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// Whether the ordering at `level` (0 = primary) is descending.
    pub fn is_descending(&self, level: usize) -> Option<bool> {
        self.levels().get(level).map(|l| l.descending())
    }

    /// Levels in comparison order, primary first.
    fn levels(&self) -> Vec<&dyn KeyLevel<T>> {
        let mut levels = Vec::with_capacity(self.depth());
        let mut node = Some(self);
        while let Some(n) = node {
            levels.push(n.level.as_ref());
            node = n.parent.as_deref();
        }
        levels.reverse();
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_chain_depth_and_directions() {
        let root = KeySpec::<(u8, u8)>::root(SyncKey(|x: &(u8, u8)| x.0), NaturalOrder, false);
        let chain = root.then(SyncKey(|x: &(u8, u8)| x.1), NaturalOrder, true);

        assert_eq!(root.depth(), 1);
        assert_eq!(chain.depth(), 2);
        assert_eq!(chain.is_descending(0), Some(false));
        assert_eq!(chain.is_descending(1), Some(true));
        assert_eq!(chain.is_descending(2), None);
        // Extending a chain leaves the original untouched.
        assert_eq!(root.depth(), 1);
    }
}
