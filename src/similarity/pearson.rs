//! Pearson correlation similarity.

use super::{
    clamp_similarity, overlap_sums, user_pairs, weight_result, ItemSimilarity, OverlapSums,
    UserSimilarity, Weighting,
};
use crate::error::Result;
use crate::model::{DataModel, ItemId, User};
use crate::refresh::{RefreshSet, Refreshable};
use std::sync::Arc;

/// Linear correlation of two rating vectors over their co-rated entries.
///
/// Undefined (NaN) when the overlap is empty or either side has zero
/// variance over the overlap; in particular any overlap of a single rating
/// is undefined.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sugerir::model::{DataModel, InMemoryDataModel};
/// use sugerir::similarity::{PearsonCorrelationSimilarity, UserSimilarity};
///
/// let model = Arc::new(InMemoryDataModel::from_triples(vec![
///     (1, 0, 3.0), (1, 1, -2.0),
///     (2, 0, 3.0), (2, 1, -2.0),
/// ]).unwrap());
/// let similarity = PearsonCorrelationSimilarity::new(model.clone());
///
/// let a = model.user(1).unwrap();
/// let b = model.user(2).unwrap();
/// assert!((similarity.user_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
/// ```
pub struct PearsonCorrelationSimilarity {
    model: Arc<dyn DataModel>,
    weighting: Weighting,
}

impl PearsonCorrelationSimilarity {
    /// Unweighted Pearson correlation.
    #[must_use]
    pub fn new(model: Arc<dyn DataModel>) -> Self {
        Self::with_weighting(model, Weighting::Unweighted)
    }

    /// Pearson correlation with the given weighting mode.
    #[must_use]
    pub fn with_weighting(model: Arc<dyn DataModel>, weighting: Weighting) -> Self {
        Self { model, weighting }
    }

    fn correlation(sums: &OverlapSums) -> f64 {
        if sums.n == 0 {
            return f64::NAN;
        }
        let n = sums.n as f64;
        let centered_xx = sums.sum_x2 - sums.sum_x * sums.sum_x / n;
        let centered_yy = sums.sum_y2 - sums.sum_y * sums.sum_y / n;
        let centered_xy = sums.sum_xy - sums.sum_x * sums.sum_y / n;
        let denominator = centered_xx.sqrt() * centered_yy.sqrt();
        if denominator == 0.0 {
            return f64::NAN;
        }
        centered_xy / denominator
    }

    fn finish(&self, result: f64, count: usize, num: usize) -> f64 {
        match self.weighting {
            Weighting::Unweighted => clamp_similarity(result),
            Weighting::Weighted => weight_result(result, count, num),
        }
    }
}

impl UserSimilarity for PearsonCorrelationSimilarity {
    fn user_similarity(&self, a: &User, b: &User) -> Result<f64> {
        let sums = overlap_sums(user_pairs(a), user_pairs(b));
        let result = Self::correlation(&sums);
        Ok(self.finish(result, sums.n, self.model.num_items()))
    }
}

impl ItemSimilarity for PearsonCorrelationSimilarity {
    fn item_similarity(&self, a: ItemId, b: ItemId) -> Result<f64> {
        let xs = self.model.preferences_for_item(a)?;
        let ys = self.model.preferences_for_item(b)?;
        let sums = overlap_sums(xs, ys);
        let result = Self::correlation(&sums);
        Ok(self.finish(result, sums.n, self.model.num_users()))
    }
}

impl Refreshable for PearsonCorrelationSimilarity {
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
        let similarity = PearsonCorrelationSimilarity::with_weighting(
            Arc::clone(model) as Arc<dyn DataModel>,
            weighting,
        );
        let a = model.user(1).unwrap();
        let b = model.user(2).unwrap();
        similarity.user_similarity(&a, &b).unwrap()
    }

    #[test]
    fn test_identical_vectors_fully_correlated() {
        let model = two_user_model(&[3.0, -2.0], &[3.0, -2.0]);
        assert!((user_sim(&model, Weighting::Unweighted) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_vectors_undefined() {
        // Zero variance on both sides carries no correlation signal.
        let model = two_user_model(&[3.0, 3.0], &[3.0, 3.0]);
        assert!(user_sim(&model, Weighting::Unweighted).is_nan());
    }

    #[test]
    fn test_opposite_vectors_anticorrelated() {
        let model = two_user_model(&[3.0, -2.0], &[-3.0, 2.0]);
        assert!((user_sim(&model, Weighting::Unweighted) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_simple_correlation_value() {
        let model = two_user_model(&[1.0, 2.0, 3.0], &[2.0, 5.0, 6.0]);
        let r = user_sim(&model, Weighting::Unweighted);
        assert!((r - 0.960_768_922_830_522_8).abs() < 1e-10);
    }

    #[test]
    fn test_weighted_correlation_value() {
        let model = two_user_model(&[1.0, 2.0, 3.0], &[2.0, 5.0, 6.0]);
        let r = user_sim(&model, Weighting::Weighted);
        assert!((r - 0.990_192_230_707_630_7).abs() < 1e-10);
    }

    #[test]
    fn test_no_overlap_undefined() {
        let model = Arc::new(
            InMemoryDataModel::from_triples(vec![(1, 0, 1.0), (2, 1, 2.0)]).unwrap(),
        );
        assert!(user_sim(&model, Weighting::Unweighted).is_nan());
    }

    #[test]
    fn test_single_shared_rating_undefined() {
        let model = Arc::new(
            InMemoryDataModel::from_triples(vec![
                (1, 0, 1.0),
                (1, 1, 2.0),
                (2, 0, 1.5),
                (2, 2, 4.0),
            ])
            .unwrap(),
        );
        assert!(user_sim(&model, Weighting::Unweighted).is_nan());
    }

    #[test]
    fn test_item_similarity_mirrors_user_case() {
        // Items 0 and 1 rated identically by both users.
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
            PearsonCorrelationSimilarity::new(Arc::clone(&model) as Arc<dyn DataModel>);
        let r = similarity.item_similarity(0, 1).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_item_similarity_unknown_item_errors() {
        let model = Arc::new(InMemoryDataModel::from_triples(vec![(1, 0, 1.0)]).unwrap());
        let similarity =
            PearsonCorrelationSimilarity::new(Arc::clone(&model) as Arc<dyn DataModel>);
        assert!(similarity.item_similarity(0, 99).is_err());
    }

    #[test]
    fn test_refresh_propagates_without_error() {
        let model = two_user_model(&[1.0, 2.0], &[2.0, 1.0]);
        let similarity =
            PearsonCorrelationSimilarity::new(Arc::clone(&model) as Arc<dyn DataModel>);
        crate::refresh::refresh_all(&similarity).unwrap();
    }
}
