//! Tanimoto coefficient similarity.

use super::{ItemSimilarity, UserSimilarity};
use crate::error::Result;
use crate::model::{DataModel, ItemId, User};
use crate::refresh::{RefreshSet, Refreshable};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Set-overlap similarity with optional per-feature weights.
///
/// Over the union of both vectors' features, accumulate `a²` and `b²` (each
/// scaled by the feature's weight, shared features contributing once per
/// side) and the dot product `ab` over the shared features, then form the
/// distance `((a² + b² − ab) / ab) − 1`, which is 0 for a perfect match. The
/// score is `1 / (1 + distance)`.
///
/// Undefined (NaN) when the weighted dot product is zero, in particular
/// when no feature is shared, or when negative weights push the distance
/// below zero.
///
/// Features are items when comparing users and users when comparing items;
/// the weight map is keyed by feature id either way.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sugerir::model::{DataModel, InMemoryDataModel};
/// use sugerir::similarity::{TanimotoCoefficientSimilarity, UserSimilarity};
///
/// let model = Arc::new(InMemoryDataModel::from_triples(vec![
///     (1, 0, 1.0), (1, 1, 2.0), (1, 2, 3.0),
///     (2, 0, 1.0), (2, 1, 2.0), (2, 2, 3.0),
/// ]).unwrap());
/// let similarity = TanimotoCoefficientSimilarity::new(model.clone());
///
/// let a = model.user(1).unwrap();
/// let b = model.user(2).unwrap();
/// assert!((similarity.user_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
/// ```
pub struct TanimotoCoefficientSimilarity {
    model: Arc<dyn DataModel>,
    weights: Option<BTreeMap<u64, f64>>,
}

impl TanimotoCoefficientSimilarity {
    /// Unweighted Tanimoto coefficient.
    #[must_use]
    pub fn new(model: Arc<dyn DataModel>) -> Self {
        Self {
            model,
            weights: None,
        }
    }

    /// Tanimoto coefficient with per-feature weights. Features missing from
    /// the map weigh 1.0.
    #[must_use]
    pub fn with_weights(model: Arc<dyn DataModel>, weights: BTreeMap<u64, f64>) -> Self {
        Self {
            model,
            weights: Some(weights),
        }
    }

    fn weight(&self, feature: u64) -> f64 {
        self.weights
            .as_ref()
            .and_then(|w| w.get(&feature))
            .copied()
            .unwrap_or(1.0)
    }

    fn coefficient(
        &self,
        xs: impl IntoIterator<Item = (u64, f64)>,
        ys: impl IntoIterator<Item = (u64, f64)>,
    ) -> f64 {
        let mut ab = 0.0;
        let mut a2 = 0.0;
        let mut b2 = 0.0;
        let mut xs = xs.into_iter().peekable();
        let mut ys = ys.into_iter().peekable();
        while let (Some(&(kx, a)), Some(&(ky, b))) = (xs.peek(), ys.peek()) {
            match kx.cmp(&ky) {
                std::cmp::Ordering::Less => {
                    a2 += a * a * self.weight(kx);
                    xs.next();
                }
                std::cmp::Ordering::Greater => {
                    b2 += b * b * self.weight(ky);
                    ys.next();
                }
                std::cmp::Ordering::Equal => {
                    let weight = self.weight(kx);
                    ab += a * b * weight;
                    a2 += a * a * weight;
                    b2 += b * b * weight;
                    xs.next();
                    ys.next();
                }
            }
        }
        for (k, a) in xs {
            a2 += a * a * self.weight(k);
        }
        for (k, b) in ys {
            b2 += b * b * self.weight(k);
        }
        if ab == 0.0 {
            return f64::NAN;
        }
        let distance = (a2 + b2 - ab) / ab - 1.0;
        if distance < 0.0 {
            // Negative weights (or a negative dot product) leave the measure
            // without a meaningful sign.
            return f64::NAN;
        }
        1.0 / (1.0 + distance)
    }
}

impl UserSimilarity for TanimotoCoefficientSimilarity {
    fn user_similarity(&self, a: &User, b: &User) -> Result<f64> {
        Ok(self.coefficient(a.pairs(), b.pairs()))
    }
}

impl ItemSimilarity for TanimotoCoefficientSimilarity {
    fn item_similarity(&self, a: ItemId, b: ItemId) -> Result<f64> {
        let xs = self.model.preferences_for_item(a)?;
        let ys = self.model.preferences_for_item(b)?;
        Ok(self.coefficient(xs, ys))
    }
}

impl Refreshable for TanimotoCoefficientSimilarity {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.model.refresh(already_refreshed)
    }
}
