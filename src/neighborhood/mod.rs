//! User neighborhoods.
//!
//! A neighborhood selects the users whose ratings inform predictions for a
//! given user: either the N most similar users or everyone above a
//! similarity threshold.

use crate::error::{Result, SugerirError};
use crate::model::{DataModel, UserId};
use crate::refresh::{RefreshSet, Refreshable};
use crate::similarity::UserSimilarity;
use crate::topk::{self, NullRescorer};
use std::sync::Arc;

/// Selects the neighborhood of users around a given user.
pub trait UserNeighborhood: Refreshable + Send + Sync {
    /// User ids in the neighborhood, best match first where ordered. The
    /// user themselves is never included.
    fn user_neighborhood(&self, user_id: UserId) -> Result<Vec<UserId>>;
}

/// The `n` users most similar to a given user.
///
/// Users whose similarity is undefined (NaN) or below the optional minimum
/// are excluded, so the neighborhood may be smaller than `n`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sugerir::model::InMemoryDataModel;
/// use sugerir::neighborhood::{NearestNUserNeighborhood, UserNeighborhood};
/// use sugerir::similarity::PearsonCorrelationSimilarity;
///
/// let model = Arc::new(InMemoryDataModel::from_triples(vec![
///     (1, 0, 1.0), (1, 1, 2.0), (1, 2, 3.0),
///     (2, 0, 1.0), (2, 1, 2.0), (2, 2, 3.0),
///     (3, 0, 3.0), (3, 1, 2.0), (3, 2, 1.0),
/// ]).unwrap());
/// let similarity = Arc::new(PearsonCorrelationSimilarity::new(model.clone()));
/// let neighborhood = NearestNUserNeighborhood::new(1, similarity, model).unwrap();
///
/// assert_eq!(neighborhood.user_neighborhood(1).unwrap(), vec![2]);
/// ```
pub struct NearestNUserNeighborhood {
    n: usize,
    min_similarity: f64,
    similarity: Arc<dyn UserSimilarity>,
    model: Arc<dyn DataModel>,
}

impl NearestNUserNeighborhood {
    /// Neighborhood of the `n` most similar users. `n` must be at least 1.
    pub fn new(
        n: usize,
        similarity: Arc<dyn UserSimilarity>,
        model: Arc<dyn DataModel>,
    ) -> Result<Self> {
        if n < 1 {
            return Err(SugerirError::invalid_argument("n", n, ">= 1"));
        }
        Ok(Self {
            n,
            min_similarity: f64::NEG_INFINITY,
            similarity,
            model,
        })
    }

    /// Additionally require a minimum similarity. The minimum must not be
    /// NaN.
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Result<Self> {
        if min_similarity.is_nan() {
            return Err(SugerirError::invalid_argument(
                "min_similarity",
                min_similarity,
                "a non-NaN similarity",
            ));
        }
        self.min_similarity = min_similarity;
        Ok(self)
    }
}

impl UserNeighborhood for NearestNUserNeighborhood {
    fn user_neighborhood(&self, user_id: UserId) -> Result<Vec<UserId>> {
        let the_user = self.model.user(user_id)?;
        let candidates = self
            .model
            .user_ids()
            .into_iter()
            .filter(|&id| id != user_id);
        let top = topk::top_users(self.n, candidates, &NullRescorer, |other_id| {
            let other = self.model.user(*other_id)?;
            let sim = self.similarity.user_similarity(&the_user, &other)?;
            Ok(if sim < self.min_similarity {
                // NaN also fails this comparison and is excluded.
                f64::NAN
            } else {
                sim
            })
        })?;
        Ok(top.into_iter().map(|(id, _)| id).collect())
    }
}

impl Refreshable for NearestNUserNeighborhood {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.similarity.refresh(already_refreshed)?;
        self.model.refresh(already_refreshed)
    }
}

/// All users whose similarity to a given user is at least a threshold.
pub struct ThresholdUserNeighborhood {
    threshold: f64,
    similarity: Arc<dyn UserSimilarity>,
    model: Arc<dyn DataModel>,
}

impl ThresholdUserNeighborhood {
    /// Neighborhood of users at or above `threshold`. The threshold must not
    /// be NaN.
    pub fn new(
        threshold: f64,
        similarity: Arc<dyn UserSimilarity>,
        model: Arc<dyn DataModel>,
    ) -> Result<Self> {
        if threshold.is_nan() {
            return Err(SugerirError::invalid_argument(
                "threshold",
                threshold,
                "a non-NaN similarity",
            ));
        }
        Ok(Self {
            threshold,
            similarity,
            model,
        })
    }
}

impl UserNeighborhood for ThresholdUserNeighborhood {
    fn user_neighborhood(&self, user_id: UserId) -> Result<Vec<UserId>> {
        let the_user = self.model.user(user_id)?;
        let mut neighbors = Vec::new();
        for other_id in self.model.user_ids() {
            if other_id == user_id {
                continue;
            }
            let other = self.model.user(other_id)?;
            let sim = self.similarity.user_similarity(&the_user, &other)?;
            if sim >= self.threshold {
                neighbors.push(other_id);
            }
        }
        Ok(neighbors)
    }
}

impl Refreshable for ThresholdUserNeighborhood {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.similarity.refresh(already_refreshed)?;
        self.model.refresh(already_refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryDataModel;
    use crate::similarity::PearsonCorrelationSimilarity;

    // Four users: 2 agrees with 1 exactly, 3 partially, 4 is opposite.
    fn fixture() -> (Arc<InMemoryDataModel>, Arc<dyn UserSimilarity>) {
        let model = Arc::new(
            InMemoryDataModel::from_triples(vec![
                (1, 0, 1.0),
                (1, 1, 2.0),
                (1, 2, 3.0),
                (2, 0, 1.0),
                (2, 1, 2.0),
                (2, 2, 3.0),
                (3, 0, 1.0),
                (3, 1, 3.0),
                (3, 2, 2.0),
                (4, 0, 3.0),
                (4, 1, 2.0),
                (4, 2, 1.0),
            ])
            .unwrap(),
        );
        let similarity: Arc<dyn UserSimilarity> = Arc::new(PearsonCorrelationSimilarity::new(
            Arc::clone(&model) as Arc<dyn DataModel>,
        ));
        (model, similarity)
    }

    #[test]
    fn test_nearest_n_orders_by_similarity() {
        let (model, similarity) = fixture();
        let hood = NearestNUserNeighborhood::new(2, similarity, model).unwrap();
        assert_eq!(hood.user_neighborhood(1).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_nearest_n_excludes_self() {
        let (model, similarity) = fixture();
        let hood = NearestNUserNeighborhood::new(10, similarity, model).unwrap();
        let neighbors = hood.user_neighborhood(1).unwrap();
        assert!(!neighbors.contains(&1));
        assert_eq!(neighbors.len(), 3);
    }

    #[test]
    fn test_nearest_n_rejects_zero() {
        let (model, similarity) = fixture();
        assert!(matches!(
            NearestNUserNeighborhood::new(0, similarity, model),
            Err(SugerirError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_nearest_n_min_similarity_filters() {
        let (model, similarity) = fixture();
        let hood = NearestNUserNeighborhood::new(10, similarity, model)
            .unwrap()
            .with_min_similarity(0.0)
            .unwrap();
        // User 4 correlates negatively with user 1.
        assert_eq!(hood.user_neighborhood(1).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_min_similarity_rejects_nan() {
        let (model, similarity) = fixture();
        let hood = NearestNUserNeighborhood::new(2, similarity, model).unwrap();
        assert!(hood.with_min_similarity(f64::NAN).is_err());
    }

    #[test]
    fn test_nearest_n_unknown_user_errors() {
        let (model, similarity) = fixture();
        let hood = NearestNUserNeighborhood::new(2, similarity, model).unwrap();
        assert!(matches!(
            hood.user_neighborhood(99),
            Err(SugerirError::NoSuchUser { user_id: 99 })
        ));
    }

    #[test]
    fn test_threshold_includes_only_close_users() {
        let (model, similarity) = fixture();
        let hood = ThresholdUserNeighborhood::new(0.9, similarity, model).unwrap();
        assert_eq!(hood.user_neighborhood(1).unwrap(), vec![2]);
    }

    #[test]
    fn test_threshold_rejects_nan() {
        let (model, similarity) = fixture();
        assert!(matches!(
            ThresholdUserNeighborhood::new(f64::NAN, similarity, model),
            Err(SugerirError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_threshold_can_be_empty() {
        let (model, similarity) = fixture();
        let hood = ThresholdUserNeighborhood::new(1.1, similarity, model).unwrap();
        assert!(hood.user_neighborhood(1).unwrap().is_empty());
    }

    #[test]
    fn test_refresh_propagates_without_error() {
        let (model, similarity) = fixture();
        let hood = NearestNUserNeighborhood::new(2, similarity, model).unwrap();
        crate::refresh::refresh_all(&hood).unwrap();
    }
}
