//! Recommenders.
//!
//! A recommender ties a data model to an estimation strategy and answers
//! "which items should this user see next". [`GenericUserBasedRecommender`]
//! estimates from a neighborhood of similar users; the slope-one recommender
//! in [`crate::slopeone`] estimates from item-item rating diffs.

use crate::error::{Result, SugerirError};
use crate::model::{DataModel, ItemId, User, UserId};
use crate::neighborhood::UserNeighborhood;
use crate::refresh::{RefreshSet, Refreshable};
use crate::similarity::UserSimilarity;
use crate::topk::{self, NullRescorer, RecommendedItem, Rescorer};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Produces recommendations and preference estimates for users.
pub trait Recommender: Refreshable + Send + Sync {
    /// The `how_many` best items for a user, best first. `how_many` must be
    /// at least 1; an empty result is normal when nothing can be estimated.
    fn recommend(&self, user_id: UserId, how_many: usize) -> Result<Vec<RecommendedItem>> {
        self.recommend_rescored(user_id, how_many, &NullRescorer)
    }

    /// Like [`Recommender::recommend`], with a rescorer filtering and
    /// adjusting candidate scores.
    fn recommend_rescored(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: &dyn Rescorer<ItemId>,
    ) -> Result<Vec<RecommendedItem>>;

    /// Estimated preference of a user for an item. An existing rating is
    /// returned as-is; NaN means no estimate is possible.
    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f64>;

    /// Record a rating, keeping any derived state consistent.
    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f64) -> Result<()>;

    /// Remove a rating, keeping any derived state consistent.
    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()>;
}

pub(crate) fn check_how_many(how_many: usize) -> Result<()> {
    if how_many < 1 {
        return Err(SugerirError::invalid_argument("how_many", how_many, ">= 1"));
    }
    Ok(())
}

/// Recommends items by averaging the ratings of a user's neighborhood,
/// weighted by similarity.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sugerir::model::InMemoryDataModel;
/// use sugerir::neighborhood::NearestNUserNeighborhood;
/// use sugerir::recommender::{GenericUserBasedRecommender, Recommender};
/// use sugerir::similarity::PearsonCorrelationSimilarity;
///
/// let model = Arc::new(InMemoryDataModel::from_triples(vec![
///     (1, 0, 1.0), (1, 1, 2.0), (1, 2, 3.0),
///     (2, 0, 1.0), (2, 1, 2.0), (2, 2, 3.0), (2, 3, 5.0),
///     (3, 0, 1.0), (3, 1, 2.0), (3, 2, 3.0),
/// ]).unwrap());
/// let similarity = Arc::new(PearsonCorrelationSimilarity::new(model.clone()));
/// let neighborhood = Arc::new(
///     NearestNUserNeighborhood::new(2, similarity.clone(), model.clone()).unwrap(),
/// );
/// let recommender =
///     GenericUserBasedRecommender::new(model, neighborhood, similarity);
///
/// let top = recommender.recommend(1, 1).unwrap();
/// assert_eq!(top[0].item, 3);
/// ```
pub struct GenericUserBasedRecommender {
    model: Arc<dyn DataModel>,
    neighborhood: Arc<dyn UserNeighborhood>,
    similarity: Arc<dyn UserSimilarity>,
}

impl GenericUserBasedRecommender {
    /// Build a recommender over a model, neighborhood and similarity.
    #[must_use]
    pub fn new(
        model: Arc<dyn DataModel>,
        neighborhood: Arc<dyn UserNeighborhood>,
        similarity: Arc<dyn UserSimilarity>,
    ) -> Self {
        Self {
            model,
            neighborhood,
            similarity,
        }
    }

    /// The `how_many` users most similar to a user, best first. The user
    /// themselves is excluded.
    pub fn most_similar_users(&self, user_id: UserId, how_many: usize) -> Result<Vec<UserId>> {
        self.most_similar_users_rescored(user_id, how_many, &NullRescorer)
    }

    /// [`most_similar_users`](Self::most_similar_users) with a rescorer
    /// filtering or reweighting the candidate users.
    pub fn most_similar_users_rescored(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: &dyn Rescorer<UserId>,
    ) -> Result<Vec<UserId>> {
        check_how_many(how_many)?;
        let to_user = self.model.user(user_id)?;
        let top = topk::top_users(how_many, self.model.user_ids(), rescorer, |other_id| {
            if *other_id == user_id {
                return Ok(f64::NAN);
            }
            let other = self.model.user(*other_id)?;
            self.similarity.user_similarity(&to_user, &other)
        })?;
        Ok(top.into_iter().map(|(id, _)| id).collect())
    }

    fn neighbors(&self, user_id: UserId) -> Result<Vec<User>> {
        self.neighborhood
            .user_neighborhood(user_id)?
            .into_iter()
            .filter(|&id| id != user_id)
            .map(|id| self.model.user(id))
            .collect()
    }

    // Similarity-weighted average of the neighbors' ratings for an item.
    // Similarities are shifted by +1 so that mild disagreement still
    // contributes a small positive weight.
    fn estimate_from_neighbors(
        &self,
        the_user: &User,
        neighbors: &[User],
        item_id: ItemId,
    ) -> Result<f64> {
        let mut preference = 0.0;
        let mut total_similarity = 0.0;
        for neighbor in neighbors {
            let Some(value) = neighbor.preference_for(item_id) else {
                continue;
            };
            let weight = self.similarity.user_similarity(the_user, neighbor)? + 1.0;
            if weight.is_nan() {
                continue;
            }
            preference += weight * value;
            total_similarity += weight;
        }
        if total_similarity == 0.0 {
            Ok(f64::NAN)
        } else {
            Ok(preference / total_similarity)
        }
    }

    fn candidate_items(the_user: &User, neighbors: &[User]) -> BTreeSet<ItemId> {
        let mut items = BTreeSet::new();
        for neighbor in neighbors {
            for pref in neighbor.preferences() {
                if the_user.preference_for(pref.item).is_none() {
                    items.insert(pref.item);
                }
            }
        }
        items
    }
}

impl Recommender for GenericUserBasedRecommender {
    fn recommend_rescored(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: &dyn Rescorer<ItemId>,
    ) -> Result<Vec<RecommendedItem>> {
        check_how_many(how_many)?;
        let the_user = self.model.user(user_id)?;
        let neighbors = self.neighbors(user_id)?;
        if neighbors.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = Self::candidate_items(&the_user, &neighbors);
        topk::top_items(how_many, candidates, rescorer, |item_id| {
            self.estimate_from_neighbors(&the_user, &neighbors, *item_id)
        })
    }

    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f64> {
        let the_user = self.model.user(user_id)?;
        if let Some(actual) = the_user.preference_for(item_id) {
            return Ok(actual);
        }
        let neighbors = self.neighbors(user_id)?;
        if neighbors.is_empty() {
            return Ok(f64::NAN);
        }
        self.estimate_from_neighbors(&the_user, &neighbors, item_id)
    }

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f64) -> Result<()> {
        self.model.set_preference(user_id, item_id, value)
    }

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        self.model.remove_preference(user_id, item_id)
    }
}

impl Refreshable for GenericUserBasedRecommender {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.model.refresh(already_refreshed)?;
        self.similarity.refresh(already_refreshed)?;
        self.neighborhood.refresh(already_refreshed)
    }
}
