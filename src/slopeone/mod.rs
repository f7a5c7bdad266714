//! Slope-one collaborative filtering.
//!
//! Slope-one predicts a user's rating for an item from the average rating
//! *differences* between that item and the items the user has rated: if item
//! B averages one star above item A across users who rated both, a user who
//! gave A three stars is predicted to give B four. The diffs live in
//! [`MemoryDiffStorage`], built in one scan and adjusted incrementally as
//! ratings change.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use sugerir::model::InMemoryDataModel;
//! use sugerir::recommender::Recommender;
//! use sugerir::slopeone::SlopeOneRecommender;
//!
//! let model = Arc::new(InMemoryDataModel::from_triples(vec![
//!     (1, 10, 1.0), (1, 20, 2.0), (1, 30, 3.0),
//!     (2, 10, 2.0), (2, 20, 3.0), (2, 30, 4.0),
//!     (3, 10, 3.0), (3, 20, 4.0),
//! ]).unwrap());
//!
//! let recommender = SlopeOneRecommender::new(model).unwrap();
//! let top = recommender.recommend(3, 1).unwrap();
//!
//! assert_eq!(top[0].item, 30);
//! assert!((top[0].value - 5.0).abs() < 1e-10);
//! ```

pub mod diff_storage;

pub use diff_storage::{DiffView, MemoryDiffStorage};

use crate::error::Result;
use crate::model::{DataModel, ItemId, User, UserId};
use crate::recommender::{check_how_many, Recommender};
use crate::refresh::{RefreshSet, Refreshable};
use crate::topk::{self, RecommendedItem, Rescorer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How slope-one combines the per-item diff estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    /// Every contributing diff counts equally.
    Unweighted,
    /// Diffs backed by more co-ratings count more.
    Weighted,
    /// Count-weighted, additionally discounting diffs with a large spread.
    /// Implies tracking spread in the diff storage, which forbids
    /// incremental point updates.
    StdDevWeighted,
}

/// Recommender based on average item-item rating differences.
///
/// The estimate for an unrated item is the (optionally weighted) average of
/// `user's rating + diff` over every rated item with a known diff to the
/// target. When no diff applies, the item's global average rating is the
/// fallback, and NaN when even that is unknown.
pub struct SlopeOneRecommender {
    model: Arc<dyn DataModel>,
    storage: Arc<MemoryDiffStorage>,
    weighting: Weighting,
}

impl SlopeOneRecommender {
    /// Count-weighted slope-one with unbounded diff storage.
    pub fn new(model: Arc<dyn DataModel>) -> Result<Self> {
        Self::with_weighting(model, Weighting::Weighted, u64::MAX)
    }

    /// Slope-one with an explicit weighting mode and diff entry cap.
    pub fn with_weighting(
        model: Arc<dyn DataModel>,
        weighting: Weighting,
        max_entries: u64,
    ) -> Result<Self> {
        let track_spread = weighting == Weighting::StdDevWeighted;
        let storage = Arc::new(MemoryDiffStorage::new(
            Arc::clone(&model),
            track_spread,
            max_entries,
        )?);
        Ok(Self {
            model,
            storage,
            weighting,
        })
    }

    /// The diff storage backing this recommender.
    #[must_use]
    pub fn diff_storage(&self) -> &Arc<MemoryDiffStorage> {
        &self.storage
    }

    fn do_estimate(&self, user: &User, item_id: ItemId) -> Result<f64> {
        let views = self.storage.diffs(item_id, user.preferences());
        let mut total_preference = 0.0;
        let mut total_weight = 0.0;
        for (pref, view) in user.preferences().iter().zip(views) {
            let Some(view) = view else { continue };
            let estimate = pref.value + view.mean;
            match self.weighting {
                Weighting::Unweighted => {
                    total_preference += estimate;
                    total_weight += 1.0;
                }
                Weighting::Weighted => {
                    let weight = view.count as f64;
                    total_preference += weight * estimate;
                    total_weight += weight;
                }
                Weighting::StdDevWeighted => {
                    let mut weight = view.count as f64;
                    if let Some(stddev) = view.stddev {
                        // A single co-rating reports NaN spread; its low
                        // count already keeps the weight small.
                        if !stddev.is_nan() {
                            weight /= 1.0 + stddev;
                        }
                    }
                    total_preference += weight * estimate;
                    total_weight += weight;
                }
            }
        }
        if total_weight <= 0.0 {
            Ok(self
                .storage
                .average_item_pref(item_id)
                .map_or(f64::NAN, |avg| avg.mean()))
        } else {
            Ok(total_preference / total_weight)
        }
    }
}

impl Recommender for SlopeOneRecommender {
    fn recommend_rescored(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: &dyn Rescorer<ItemId>,
    ) -> Result<Vec<RecommendedItem>> {
        check_how_many(how_many)?;
        let user = self.model.user(user_id)?;
        let candidates = self.storage.recommendable_items(user_id)?;
        topk::top_items(how_many, candidates, rescorer, |item_id| {
            self.do_estimate(&user, *item_id)
        })
    }

    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f64> {
        let user = self.model.user(user_id)?;
        if let Some(actual) = user.preference_for(item_id) {
            return Ok(actual);
        }
        self.do_estimate(&user, item_id)
    }

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f64) -> Result<()> {
        let old_value = self.model.preference_value(user_id, item_id)?;
        self.model.set_preference(user_id, item_id, value)?;
        let pref_delta = match old_value {
            Some(old) => value - old,
            None => value,
        };
        self.storage.update_item_pref(item_id, pref_delta, false)
    }

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        let old_value = self.model.preference_value(user_id, item_id)?;
        self.model.remove_preference(user_id, item_id)?;
        if let Some(old) = old_value {
            self.storage.update_item_pref(item_id, old, true)?;
        }
        Ok(())
    }
}

impl Refreshable for SlopeOneRecommender {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.model.refresh(already_refreshed)?;
        self.storage.refresh(already_refreshed)
    }
}
