//! Bounded top-K selection.
//!
//! Candidates are scored lazily and fed through a K-sized binary heap, so
//! selecting the best K of N candidates costs O(N log K) time and O(K) space.
//! NaN scores mean "no opinion" and are skipped; equal scores keep the
//! first-encountered candidate, so results are stable for a given candidate
//! order.

use crate::error::Result;
use crate::model::{ItemId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// An item paired with its estimated preference value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendedItem {
    /// The recommended item.
    pub item: ItemId,
    /// Estimated preference for the item.
    pub value: f64,
}

/// Filters and adjusts candidate scores during selection.
pub trait Rescorer<T> {
    /// Candidates for which this returns `true` are dropped entirely.
    fn is_filtered(&self, thing: &T) -> bool;

    /// Adjust a candidate's score. Returning NaN drops the candidate.
    fn rescore(&self, thing: &T, original: f64) -> f64;
}

/// A [`Rescorer`] that filters nothing and changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRescorer;

impl<T> Rescorer<T> for NullRescorer {
    fn is_filtered(&self, _thing: &T) -> bool {
        false
    }

    fn rescore(&self, _thing: &T, original: f64) -> f64 {
        original
    }
}

// Heap entry. `value` is never NaN; among equal values the earlier candidate
// ranks higher, so the heap evicts later-encountered ties first.
struct Scored<T> {
    value: f64,
    seq: usize,
    thing: T,
}

impl<T> PartialEq for Scored<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Scored<T> {}

impl<T> PartialOrd for Scored<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scored<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .partial_cmp(&other.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Select the `how_many` best-scoring candidates, best first.
///
/// `estimate` may return NaN to exclude a candidate. Ties keep the candidate
/// encountered first.
pub fn top_scored<T, F>(
    how_many: usize,
    candidates: impl IntoIterator<Item = T>,
    rescorer: &dyn Rescorer<T>,
    mut estimate: F,
) -> Result<Vec<(T, f64)>>
where
    F: FnMut(&T) -> Result<f64>,
{
    if how_many == 0 {
        return Ok(Vec::new());
    }
    let mut heap: BinaryHeap<Reverse<Scored<T>>> = BinaryHeap::with_capacity(how_many + 1);
    for (seq, thing) in candidates.into_iter().enumerate() {
        if rescorer.is_filtered(&thing) {
            continue;
        }
        let raw = estimate(&thing)?;
        if raw.is_nan() {
            continue;
        }
        let value = rescorer.rescore(&thing, raw);
        if value.is_nan() {
            continue;
        }
        let candidate = Scored { value, seq, thing };
        if heap.len() < how_many {
            heap.push(Reverse(candidate));
        } else if heap
            .peek()
            .is_some_and(|Reverse(worst)| candidate > *worst)
        {
            heap.pop();
            heap.push(Reverse(candidate));
        }
    }
    let mut selected: Vec<Scored<T>> = heap.into_iter().map(|Reverse(s)| s).collect();
    selected.sort_by(|a, b| b.cmp(a));
    Ok(selected.into_iter().map(|s| (s.thing, s.value)).collect())
}

/// Top-K items as [`RecommendedItem`]s.
pub fn top_items<F>(
    how_many: usize,
    candidates: impl IntoIterator<Item = ItemId>,
    rescorer: &dyn Rescorer<ItemId>,
    estimate: F,
) -> Result<Vec<RecommendedItem>>
where
    F: FnMut(&ItemId) -> Result<f64>,
{
    Ok(top_scored(how_many, candidates, rescorer, estimate)?
        .into_iter()
        .map(|(item, value)| RecommendedItem { item, value })
        .collect())
}

/// Top-K users with their scores.
pub fn top_users<F>(
    how_many: usize,
    candidates: impl IntoIterator<Item = UserId>,
    rescorer: &dyn Rescorer<UserId>,
    estimate: F,
) -> Result<Vec<(UserId, f64)>>
where
    F: FnMut(&UserId) -> Result<f64>,
{
    top_scored(how_many, candidates, rescorer, estimate)
}
