//! Spearman rank correlation similarity.

use super::{PearsonCorrelationSimilarity, UserSimilarity};
use crate::error::Result;
use crate::model::{DataModel, Preference, User};
use crate::refresh::{RefreshSet, Refreshable};
use std::cmp::Ordering;
use std::sync::Arc;

/// Pearson correlation over preference *ranks* instead of raw values.
///
/// Each user's ratings are replaced by their rank, 1 for the least preferred
/// item upward, and the ranked snapshots are compared with
/// [`PearsonCorrelationSimilarity`]. Two users who order items the same way
/// score 1.0 regardless of their rating scales. Ties keep item-id order, the
/// order ratings are stored in.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sugerir::model::{DataModel, InMemoryDataModel};
/// use sugerir::similarity::{SpearmanCorrelationSimilarity, UserSimilarity};
///
/// // Same ordering, different scales.
/// let model = Arc::new(InMemoryDataModel::from_triples(vec![
///     (1, 0, 1.0), (1, 1, 2.0), (1, 2, 3.0),
///     (2, 0, 2.0), (2, 1, 5.0), (2, 2, 6.0),
/// ]).unwrap());
/// let similarity = SpearmanCorrelationSimilarity::new(model.clone());
///
/// let a = model.user(1).unwrap();
/// let b = model.user(2).unwrap();
/// assert!((similarity.user_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
/// ```
pub struct SpearmanCorrelationSimilarity {
    ranking: PearsonCorrelationSimilarity,
}

impl SpearmanCorrelationSimilarity {
    /// Spearman correlation backed by an unweighted Pearson on ranks.
    #[must_use]
    pub fn new(model: Arc<dyn DataModel>) -> Self {
        Self {
            ranking: PearsonCorrelationSimilarity::new(model),
        }
    }

    /// Replace a user's rating values with ranks, 1 = least preferred.
    fn rank_transform(user: &User) -> User {
        let mut by_value: Vec<Preference> = user.preferences().to_vec();
        by_value.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));
        let ranked = by_value
            .into_iter()
            .enumerate()
            .map(|(i, p)| Preference::new(p.item, (i + 1) as f64))
            .collect();
        User::new(user.id(), ranked)
    }
}

impl UserSimilarity for SpearmanCorrelationSimilarity {
    fn user_similarity(&self, a: &User, b: &User) -> Result<f64> {
        self.ranking
            .user_similarity(&Self::rank_transform(a), &Self::rank_transform(b))
    }
}

impl Refreshable for SpearmanCorrelationSimilarity {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.ranking.refresh(already_refreshed)
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

    fn user_sim(model: &Arc<InMemoryDataModel>) -> f64 {
        let similarity =
            SpearmanCorrelationSimilarity::new(Arc::clone(model) as Arc<dyn DataModel>);
        let a = model.user(1).unwrap();
        let b = model.user(2).unwrap();
        similarity.user_similarity(&a, &b).unwrap()
    }

    #[test]
    fn test_rank_transform_orders_by_value() {
        let user = User::new(
            1,
            vec![
                Preference::new(10, 5.0),
                Preference::new(20, 1.0),
                Preference::new(30, 3.0),
            ],
        );
        let ranked = SpearmanCorrelationSimilarity::rank_transform(&user);
        assert_eq!(ranked.preference_for(20), Some(1.0));
        assert_eq!(ranked.preference_for(30), Some(2.0));
        assert_eq!(ranked.preference_for(10), Some(3.0));
    }

    #[test]
    fn test_same_ordering_different_scale_is_one() {
        let model = two_user_model(&[1.0, 2.0, 3.0], &[10.0, 40.0, 90.0]);
        assert!((user_sim(&model) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reversed_ordering_is_minus_one() {
        let model = two_user_model(&[1.0, 2.0, 3.0], &[9.0, 5.0, 2.0]);
        assert!((user_sim(&model) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_swapped_pair_value() {
        // Ranks 1,2,3,4 vs 1,3,2,4: Spearman rho = 1 - 6*2/(4*15) = 0.8.
        let model = two_user_model(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0]);
        assert!((user_sim(&model) - 0.8).abs() < 1e-10);
    }

    #[test]
    fn test_no_overlap_undefined() {
        let model = Arc::new(
            InMemoryDataModel::from_triples(vec![(1, 0, 1.0), (2, 1, 2.0)]).unwrap(),
        );
        assert!(user_sim(&model).is_nan());
    }

    #[test]
    fn test_refresh_propagates_without_error() {
        let model = two_user_model(&[1.0, 2.0], &[2.0, 1.0]);
        let similarity =
            SpearmanCorrelationSimilarity::new(Arc::clone(&model) as Arc<dyn DataModel>);
        crate::refresh::refresh_all(&similarity).unwrap();
    }
}
