//! Quicksort family over a permutation map.
//!
//! The map holds indices into a buffer and `compare` orders two buffer indices. Every function
//! only ever swaps map entries, so the map stays a bijection over `0..len`. `compare` must be a
//! total order in which no two distinct indices compare equal (the keyed sorter guarantees this
//! by falling back to index order), which is what makes the unstable primitives below produce a
//! stable result.
//!
//! ## Characteristics
//!
//!  * in-place on the map
//!  * single-threaded
//!  * never suspends
//!
//! ## Performance
//!
//! `partial_sort_map` and `select_map` only descend into partitions that overlap the requested
//! positions, giving `O(n + k log k)` and expected `O(n)` respectively. After `2 log2 n` partition
//! rounds the remaining range is sorted directly, which bounds both the stack depth and the worst
//! case at `O(n log n)` for inputs that defeat the middle pivot.

use std::cmp::Ordering;

use partition::partition_index;

use crate::{config::small_sort_threshold, scope};

/// Full sort of the map.
#[inline]
pub fn sort_map<F>(map: &mut [usize], compare: &F)
where
    F: Fn(usize, usize) -> Ordering,
{
    scope!("sort_map");
    if map.len() < 2 {
        return;
    }

    map.sort_unstable_by(|&a, &b| compare(a, b));
}

/// Partitions `map[lo..=hi]` around its middle entry and returns the pivot's final position.
/// Entries before it order below the pivot, entries after it above.
#[inline]
fn partition_at_middle<F>(map: &mut [usize], lo: usize, hi: usize, compare: &F) -> usize
where
    F: Fn(usize, usize) -> Ordering,
{
    let mid = lo + (hi - lo) / 2;
    map.swap(mid, hi);
    let pivot = map[hi];
    let offs = partition_index(&mut map[lo..hi], |entry| {
        compare(*entry, pivot) == Ordering::Less
    });
    let split = lo + offs;
    map.swap(split, hi);
    split
}

/// Partition rounds allowed before a range is handed to `sort_unstable_by` instead.
#[inline(always)]
fn depth_budget(len: usize) -> u32 {
    2 * (usize::BITS - len.leading_zeros())
}

/// Orders the map so that positions `min..=max` hold exactly what a full sort would put there.
/// Everything else is only partitioned around them.
#[inline]
pub fn partial_sort_map<F>(map: &mut [usize], min: usize, max: usize, compare: &F)
where
    F: Fn(usize, usize) -> Ordering,
{
    scope!("partial_sort_map");
    if map.len() < 2 || min > max || min >= map.len() {
        return;
    }

    let max = max.min(map.len() - 1);
    let budget = depth_budget(map.len());
    partial_quicksort(map, 0, map.len() - 1, min, max, compare, small_sort_threshold(), budget);
}

/// Recurses only into the smaller side that overlaps `min..=max` and loops on the other,
/// so the stack stays `O(log n)` deep.
#[allow(clippy::too_many_arguments)]
fn partial_quicksort<F>(
    map: &mut [usize],
    mut lo: usize,
    mut hi: usize,
    min: usize,
    max: usize,
    compare: &F,
    threshold: usize,
    mut budget: u32,
) where
    F: Fn(usize, usize) -> Ordering,
{
    while lo < hi {
        if hi - lo < threshold || budget == 0 {
            map[lo..=hi].sort_unstable_by(|&a, &b| compare(a, b));
            return;
        }
        budget -= 1;

        let split = partition_at_middle(map, lo, hi, compare);
        let left = split > lo && split > min;
        let right = split < hi && split < max;

        match (left, right) {
            (true, true) => {
                if split - lo < hi - split {
                    partial_quicksort(map, lo, split - 1, min, max, compare, threshold, budget);
                    lo = split + 1;
                } else {
                    partial_quicksort(map, split + 1, hi, min, max, compare, threshold, budget);
                    hi = split - 1;
                }
            }
            (true, false) => hi = split - 1,
            (false, true) => lo = split + 1,
            (false, false) => return,
        }
    }
}

/// Quickselect: returns the buffer index a full sort would place at position `rank`.
/// The map is left partitioned around `rank`.
#[inline]
pub fn select_map<F>(map: &mut [usize], rank: usize, compare: &F) -> usize
where
    F: Fn(usize, usize) -> Ordering,
{
    scope!("select_map");
    assert!(rank < map.len(), "rank {rank} out of range for {} entries", map.len());

    let mut lo = 0;
    let mut hi = map.len() - 1;
    let mut budget = depth_budget(map.len());
    while lo < hi {
        if budget == 0 {
            map[lo..=hi].sort_unstable_by(|&a, &b| compare(a, b));
            break;
        }
        budget -= 1;

        let split = partition_at_middle(map, lo, hi, compare);
        match rank.cmp(&split) {
            Ordering::Equal => return map[split],
            Ordering::Less => hi = split - 1,
            Ordering::Greater => lo = split + 1,
        }
    }

    map[rank]
}

/// Reorders `items` in place so that `items[i]` becomes the old `items[map[i]]`.
/// `map` must be a permutation of `0..items.len()`; it is consumed as the visited marker.
pub fn apply_map<T>(items: &mut [T], map: &mut [usize]) {
    scope!("apply_map");
    const DONE: usize = usize::MAX;
    for start in 0..map.len() {
        if map[start] == DONE {
            continue;
        }
        let mut pos = start;
        loop {
            let from = map[pos];
            map[pos] = DONE;
            if from == start {
                break;
            }
            items.swap(pos, from);
            pos = from;
        }
    }
}
