//! Rating similarity metrics.
//!
//! A similarity maps two users (or two items) to a score in `[-1.0, 1.0]`,
//! where 1.0 is perfect agreement and -1.0 perfect disagreement. NaN means
//! the similarity is undefined for the pair, typically because the entities
//! share too few ratings; callers skip NaN rather than treat it as an error.
//!
//! # Metrics
//!
//! - [`PearsonCorrelationSimilarity`]: centered linear correlation
//! - [`EuclideanDistanceSimilarity`]: distance-based, `1 / (1 + d)` family
//! - [`SpearmanCorrelationSimilarity`]: Pearson over preference ranks
//! - [`TanimotoCoefficientSimilarity`]: set overlap with optional weights
//!
//! Pearson and Euclidean optionally apply *significance weighting*
//! ([`Weighting::Weighted`]), which pushes scores backed by a large rating
//! overlap toward full agreement (or disagreement) and leaves thinly
//! supported scores nearly unchanged.

pub mod euclidean;
pub mod pearson;
pub mod spearman;
pub mod tanimoto;

pub use euclidean::EuclideanDistanceSimilarity;
pub use pearson::PearsonCorrelationSimilarity;
pub use spearman::SpearmanCorrelationSimilarity;
pub use tanimoto::TanimotoCoefficientSimilarity;

use crate::error::Result;
use crate::model::{ItemId, User};
use crate::refresh::Refreshable;
use serde::{Deserialize, Serialize};

/// Similarity between two users, based on their rating vectors.
pub trait UserSimilarity: Refreshable + Send + Sync {
    /// Similarity in `[-1.0, 1.0]`, or NaN when undefined.
    fn user_similarity(&self, a: &User, b: &User) -> Result<f64>;
}

/// Similarity between two items, based on the ratings users gave them.
pub trait ItemSimilarity: Refreshable + Send + Sync {
    /// Similarity in `[-1.0, 1.0]`, or NaN when undefined.
    fn item_similarity(&self, a: ItemId, b: ItemId) -> Result<f64>;
}

/// Whether a metric applies significance weighting to its raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    /// Use the raw score.
    Unweighted,
    /// Push scores backed by a large rating overlap toward full agreement.
    Weighted,
}

/// Accumulated sums over the co-rated portion of two rating vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct OverlapSums {
    pub n: usize,
    pub sum_x: f64,
    pub sum_y: f64,
    pub sum_x2: f64,
    pub sum_y2: f64,
    pub sum_xy: f64,
    pub sum_diff2: f64,
}

/// Merge-join two key-sorted rating streams and accumulate sums over the
/// keys present in both.
pub(crate) fn overlap_sums(
    xs: impl IntoIterator<Item = (u64, f64)>,
    ys: impl IntoIterator<Item = (u64, f64)>,
) -> OverlapSums {
    let mut sums = OverlapSums::default();
    let mut xs = xs.into_iter().peekable();
    let mut ys = ys.into_iter().peekable();
    while let (Some(&(kx, x)), Some(&(ky, y))) = (xs.peek(), ys.peek()) {
        match kx.cmp(&ky) {
            std::cmp::Ordering::Less => {
                xs.next();
            }
            std::cmp::Ordering::Greater => {
                ys.next();
            }
            std::cmp::Ordering::Equal => {
                sums.n += 1;
                sums.sum_x += x;
                sums.sum_y += y;
                sums.sum_x2 += x * x;
                sums.sum_y2 += y * y;
                sums.sum_xy += x * y;
                sums.sum_diff2 += (x - y) * (x - y);
                xs.next();
                ys.next();
            }
        }
    }
    sums
}

/// Significance weighting: move a raw score toward full agreement (1.0, or
/// -1.0 for negative scores) in proportion to how large the rating overlap
/// `count` is relative to the population size `num`.
pub(crate) fn weight_result(result: f64, count: usize, num: usize) -> f64 {
    if result.is_nan() {
        return f64::NAN;
    }
    let scale = 1.0 - count as f64 / (num as f64 + 1.0);
    let weighted = if result < 0.0 {
        -1.0 + scale * (1.0 + result)
    } else {
        1.0 - scale * (1.0 - result)
    };
    weighted.clamp(-1.0, 1.0)
}

/// Clamp a finite score into `[-1.0, 1.0]`, passing NaN through.
pub(crate) fn clamp_similarity(result: f64) -> f64 {
    if result.is_nan() {
        f64::NAN
    } else {
        result.clamp(-1.0, 1.0)
    }
}

pub(crate) fn user_pairs(user: &User) -> impl Iterator<Item = (u64, f64)> + '_ {
    user.pairs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_sums_full_overlap() {
        let sums = overlap_sums(
            vec![(1, 1.0), (2, 2.0), (3, 3.0)],
            vec![(1, 2.0), (2, 5.0), (3, 6.0)],
        );
        assert_eq!(sums.n, 3);
        assert!((sums.sum_x - 6.0).abs() < 1e-12);
        assert!((sums.sum_y - 13.0).abs() < 1e-12);
        assert!((sums.sum_xy - 30.0).abs() < 1e-12);
        assert!((sums.sum_diff2 - 19.0).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_sums_partial_overlap() {
        let sums = overlap_sums(vec![(1, 1.0), (3, 3.0)], vec![(2, 2.0), (3, 5.0)]);
        assert_eq!(sums.n, 1);
        assert!((sums.sum_diff2 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_sums_no_overlap() {
        let sums = overlap_sums(vec![(1, 1.0)], vec![(2, 2.0)]);
        assert_eq!(sums.n, 0);
    }

    #[test]
    fn test_weight_result_tracks_overlap_size() {
        // An overlap of 2 items out of 100 barely moves the score.
        let raw = 0.5;
        let thin = weight_result(raw, 2, 100);
        assert!((thin - raw).abs() < 0.02);
        // Full overlap pushes the score most of the way to 1.
        let full = weight_result(raw, 100, 100);
        assert!(full > 0.99);
    }

    #[test]
    fn test_weight_result_negative_branch_mirrors() {
        let pos = weight_result(0.4, 3, 10);
        let neg = weight_result(-0.4, 3, 10);
        assert!((pos + neg).abs() < 1e-12);
    }

    #[test]
    fn test_weight_result_nan_passthrough() {
        assert!(weight_result(f64::NAN, 3, 10).is_nan());
    }

    #[test]
    fn test_weight_result_clamped() {
        // Overlap larger than the population flips the scale factor negative;
        // the result must stay in range.
        let w = weight_result(0.5, 20, 10);
        assert!((-1.0..=1.0).contains(&w));
    }

    #[test]
    fn test_clamp_similarity() {
        assert_eq!(clamp_similarity(1.5), 1.0);
        assert_eq!(clamp_similarity(-1.5), -1.0);
        assert_eq!(clamp_similarity(0.3), 0.3);
        assert!(clamp_similarity(f64::NAN).is_nan());
    }
}
