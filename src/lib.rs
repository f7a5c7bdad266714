//! Sugerir: in-memory collaborative-filtering recommendation engine.
//!
//! Sugerir predicts how a user would rate items they have not seen, based on
//! the ratings of the whole user base, and turns those predictions into
//! ranked recommendation lists. Two families of recommenders are provided:
//! slope-one, which precomputes average item-item rating differences, and
//! user-based, which scores candidates through a neighborhood of similar
//! users.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use sugerir::prelude::*;
//!
//! let model = Arc::new(InMemoryDataModel::from_triples(vec![
//!     (1, 1, 1.0), (1, 2, 2.0),
//!     (2, 1, 2.0), (2, 2, 3.0), (2, 3, 4.0),
//!     (3, 1, 2.5), (3, 2, 3.5),
//!     (4, 1, 3.0),
//! ]).unwrap());
//!
//! let recommender = SlopeOneRecommender::new(model).unwrap();
//! let top = recommender.recommend(4, 2).unwrap();
//!
//! assert_eq!(top.len(), 1);
//! assert_eq!(top[0].item, 2);
//! assert!((top[0].value - 4.0).abs() < 1e-10);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Users, preferences, and the in-memory rating store
//! - [`stats`]: Running averages with optional standard deviation
//! - [`similarity`]: Pearson, Euclidean, Spearman, and Tanimoto measures
//! - [`neighborhood`]: Nearest-N and threshold user neighborhoods
//! - [`recommender`]: The `Recommender` trait and user-based recommender
//! - [`slopeone`]: Slope-one recommender and its diff storage
//! - [`topk`]: Bounded top-K selection and rescoring hooks
//! - [`refresh`]: Cycle-safe recomputation across component graphs
//! - [`error`]: The crate-wide error type

pub mod error;
pub mod model;
pub mod neighborhood;
pub mod prelude;
pub mod recommender;
pub mod refresh;
pub mod similarity;
pub mod slopeone;
pub mod stats;
pub mod topk;

pub use error::{Result, SugerirError};
pub use model::{DataModel, InMemoryDataModel, ItemId, Preference, User, UserId};
pub use recommender::Recommender;
pub use refresh::{refresh_all, Refreshable};
