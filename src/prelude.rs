//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use sugerir::prelude::*;
//! ```

pub use crate::error::{Result, SugerirError};
pub use crate::model::{DataModel, InMemoryDataModel, ItemId, Preference, User, UserId};
pub use crate::neighborhood::{
    NearestNUserNeighborhood, ThresholdUserNeighborhood, UserNeighborhood,
};
pub use crate::recommender::{GenericUserBasedRecommender, Recommender};
pub use crate::refresh::{refresh_all, RefreshSet, Refreshable};
pub use crate::similarity::{
    EuclideanDistanceSimilarity, ItemSimilarity, PearsonCorrelationSimilarity,
    SpearmanCorrelationSimilarity, TanimotoCoefficientSimilarity, UserSimilarity, Weighting,
};
pub use crate::slopeone::{SlopeOneRecommender, Weighting as SlopeOneWeighting};
pub use crate::topk::{NullRescorer, RecommendedItem, Rescorer};
