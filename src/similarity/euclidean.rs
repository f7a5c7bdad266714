//! Euclidean distance similarity.

use super::{
    clamp_similarity, overlap_sums, user_pairs, weight_result, ItemSimilarity, OverlapSums,
    UserSimilarity, Weighting,
};
use crate::error::Result;
use crate::model::{DataModel, ItemId, User};
use crate::refresh::{RefreshSet, Refreshable};
use std::sync::Arc;

/// Similarity derived from the Euclidean distance between two rating vectors
/// over their co-rated entries.
///
/// With `s = sum of squared rating differences` over an overlap of `n` items
/// and `vx`, `vy` the centered sums of squares of each side, the score is
/// `1 / (1 + sqrt(s / (sqrt(vx) + sqrt(vy))) / n)`. Scaling the distance by
/// the rating spread and the overlap size keeps a large overlap of mild
/// disagreements from scoring worse than a single shared rating.
///
/// Undefined (NaN) when there is no overlap, or when both vectors are flat
/// over the overlap *and* identical: agreeing on a flat vector carries no
/// signal. Flat vectors that disagree score 0.0; identical non-flat vectors
/// score 1.0.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sugerir::model::{DataModel, InMemoryDataModel};
/// use sugerir::similarity::{EuclideanDistanceSimilarity, UserSimilarity};
///
/// let model = Arc::new(InMemoryDataModel::from_triples(vec![
///     (1, 0, 3.0), (1, 1, -2.0),
///     (2, 0, 3.0), (2, 1, -2.0),
/// ]).unwrap());
/// let similarity = EuclideanDistanceSimilarity::new(model.clone());
///
/// let a = model.user(1).unwrap();
/// let b = model.user(2).unwrap();
/// assert!((similarity.user_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
/// ```
pub struct EuclideanDistanceSimilarity {
    model: Arc<dyn DataModel>,
    weighting: Weighting,
}

impl EuclideanDistanceSimilarity {
    /// Unweighted Euclidean similarity.
    #[must_use]
    pub fn new(model: Arc<dyn DataModel>) -> Self {
        Self::with_weighting(model, Weighting::Unweighted)
    }

    /// Euclidean similarity with the given weighting mode.
    #[must_use]
    pub fn with_weighting(model: Arc<dyn DataModel>, weighting: Weighting) -> Self {
        Self { model, weighting }
    }

    fn similarity(sums: &OverlapSums) -> f64 {
        if sums.n == 0 {
            return f64::NAN;
        }
        let n = sums.n as f64;
        let centered_xx = sums.sum_x2 - sums.sum_x * sums.sum_x / n;
        let centered_yy = sums.sum_y2 - sums.sum_y * sums.sum_y / n;
        let spread = centered_xx.sqrt() + centered_yy.sqrt();
        // Two flat vectors leave spread 0: 0/0 is NaN when they agree, and
        // an infinite distance (score 0.0) when they disagree.
        1.0 / (1.0 + (sums.sum_diff2 / spread).sqrt() / n)
    }

    fn finish(&self, result: f64, count: usize, num: usize) -> f64 {
        match self.weighting {
            Weighting::Unweighted => clamp_similarity(result),
            Weighting::Weighted => weight_result(result, count, num),
        }
    }
}

impl UserSimilarity for EuclideanDistanceSimilarity {
    fn user_similarity(&self, a: &User, b: &User) -> Result<f64> {
        let sums = overlap_sums(user_pairs(a), user_pairs(b));
        let result = Self::similarity(&sums);
        Ok(self.finish(result, sums.n, self.model.num_items()))
    }
}

impl ItemSimilarity for EuclideanDistanceSimilarity {
    fn item_similarity(&self, a: ItemId, b: ItemId) -> Result<f64> {
        let xs = self.model.preferences_for_item(a)?;
        let ys = self.model.preferences_for_item(b)?;
        let sums = overlap_sums(xs, ys);
        let result = Self::similarity(&sums);
        Ok(self.finish(result, sums.n, self.model.num_users()))
    }
}

impl Refreshable for EuclideanDistanceSimilarity {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.model.refresh(already_refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryDataModel;

    fn two_user_model(a: &[f64], b: &[f64]) -> Arc<InMemoryDataModel> {
        let mut triples = Vec::new();
        for (i, &v) in a.iter().enumerate() {
            triples.push((1, i as u64, v));
        }
        for (i, &v) in b.iter().enumerate() {
            triples.push((2, i as u64, v));
        }
        Arc::new(InMemoryDataModel::from_triples(triples).unwrap())
    }

    fn user_sim(model: &Arc<InMemoryDataModel>, weighting: Weighting) -> f64 {
        let similarity = EuclideanDistanceSimilarity::with_weighting(
            Arc::clone(model) as Arc<dyn DataModel>,
            weighting,
        );
        let a = model.user(1).unwrap();
        let b = model.user(2).unwrap();
        similarity.user_similarity(&a, &b).unwrap()
    }

    #[test]
    fn test_identical_vectors_score_one() {
        let model = two_user_model(&[3.0, -2.0], &[3.0, -2.0]);
        assert!((user_sim(&model, Weighting::Unweighted) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_identical_constant_vectors_undefined() {
        let model = two_user_model(&[3.0, 3.0], &[3.0, 3.0]);
        assert!(user_sim(&model, Weighting::Unweighted).is_nan());
    }

    #[test]
    fn test_opposite_vectors_value() {
        // s = 36 + 16 = 52, both centered sums 12.5, n = 2.
        let model = two_user_model(&[3.0, -2.0], &[-3.0, 2.0]);
        let r = user_sim(&model, Weighting::Unweighted);
        assert!((r - 0.424_465_381_883_345).abs() < 1e-13);
    }

    #[test]
    fn test_weighted_opposite_vectors_value() {
        let model = two_user_model(&[3.0, -2.0], &[-3.0, 2.0]);
        let r = user_sim(&model, Weighting::Weighted);
        assert!((r - 0.808_155_127_294_448_3).abs() < 1e-13);
    }

    #[test]
    fn test_reversed_vectors_value() {
        let model = two_user_model(&[90.0, 80.0, 70.0], &[70.0, 80.0, 90.0]);
        let r = user_sim(&model, Weighting::Unweighted);
        assert!((r - 0.360_650_791_600_451_7).abs() < 1e-13);
    }

    #[test]
    fn test_partial_agreement_value() {
        // s = 1 + 9 + 9 = 19, centered sums 2 and 26/3, n = 3.
        let model = two_user_model(&[1.0, 2.0, 3.0], &[2.0, 5.0, 6.0]);
        let r = user_sim(&model, Weighting::Unweighted);
        assert!((r - 0.589_624_856_821_732_8).abs() < 1e-13);
    }

    #[test]
    fn test_weighted_partial_agreement_value() {
        let model = two_user_model(&[1.0, 2.0, 3.0], &[2.0, 5.0, 6.0]);
        let r = user_sim(&model, Weighting::Weighted);
        assert!((r - 0.897_406_214_205_433_2).abs() < 1e-13);
    }

    #[test]
    fn test_weighted_never_below_unweighted_here() {
        // Positive scores can only move toward 1.0 under weighting.
        let model = two_user_model(&[1.0, 2.0, 3.0], &[2.0, 5.0, 6.0]);
        assert!(user_sim(&model, Weighting::Weighted) >= user_sim(&model, Weighting::Unweighted));
    }

    #[test]
    fn test_no_overlap_undefined() {
        let model = Arc::new(
            InMemoryDataModel::from_triples(vec![(1, 0, 1.0), (2, 1, 2.0)]).unwrap(),
        );
        assert!(user_sim(&model, Weighting::Unweighted).is_nan());
    }

    #[test]
    fn test_score_in_unit_interval() {
        let model = two_user_model(&[1.0, 5.0, 2.5], &[4.5, 1.0, 5.0]);
        let r = user_sim(&model, Weighting::Unweighted);
        assert!(r > 0.0 && r <= 1.0);
    }

    #[test]
    fn test_flat_disagreement_scores_zero() {
        // No spread on either side but a real distance between them.
        let model = two_user_model(&[3.0, 3.0], &[5.0, 5.0]);
        assert_eq!(user_sim(&model, Weighting::Unweighted), 0.0);
    }

    #[test]
    fn test_wider_overlap_scores_closer() {
        // The same doubling disagreement over more co-rated items.
        let narrow = two_user_model(&[1.0, 2.0], &[2.0, 4.0]);
        let wide = two_user_model(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(
            user_sim(&wide, Weighting::Unweighted) > user_sim(&narrow, Weighting::Unweighted)
        );
    }

    #[test]
    fn test_item_similarity_identical_columns() {
        let model = Arc::new(
            InMemoryDataModel::from_triples(vec![
                (1, 0, 3.0),
                (1, 1, 3.0),
                (2, 0, -2.0),
                (2, 1, -2.0),
            ])
            .unwrap(),
        );
        let similarity =
            EuclideanDistanceSimilarity::new(Arc::clone(&model) as Arc<dyn DataModel>);
        assert!((similarity.item_similarity(0, 1).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_refresh_propagates_without_error() {
        let model = two_user_model(&[1.0, 2.0], &[2.0, 1.0]);
        let similarity =
            EuclideanDistanceSimilarity::new(Arc::clone(&model) as Arc<dyn DataModel>);
        crate::refresh::refresh_all(&similarity).unwrap();
    }
}
