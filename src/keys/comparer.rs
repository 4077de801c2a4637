use std::cmp::Ordering;

/// Total order over keys.
pub trait Comparer<K>: Send + Sync + 'static {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// The key type's own `Ord`.
#[derive(Clone, Copy, Default, Debug)]
pub struct NaturalOrder;

impl<K: Ord> Comparer<K> for NaturalOrder {
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K, F> Comparer<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
{
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
