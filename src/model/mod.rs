//! Preference data model.
//!
//! Users express preferences (ratings) for items. The [`DataModel`] trait is
//! the seam every recommender component reads through; [`InMemoryDataModel`]
//! is the bundled implementation backed by ordered maps, so iteration order
//! and therefore recommendation tie-breaks are deterministic.
//!
//! # Examples
//!
//! ```
//! use sugerir::model::InMemoryDataModel;
//! use sugerir::model::DataModel;
//!
//! let model = InMemoryDataModel::from_triples(vec![
//!     (1, 100, 3.0),
//!     (1, 101, 4.0),
//!     (2, 100, 2.0),
//! ]).unwrap();
//!
//! assert_eq!(model.num_users(), 2);
//! assert_eq!(model.num_items(), 2);
//! assert_eq!(model.user(1).unwrap().preference_for(101), Some(4.0));
//! ```

use crate::error::{Result, SugerirError};
use crate::refresh::{RefreshSet, Refreshable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// User identifier.
pub type UserId = u64;

/// Item identifier.
pub type ItemId = u64;

/// A single user-item preference. The value is always finite; NaN is the
/// "no opinion" sentinel and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    /// The rated item.
    pub item: ItemId,
    /// The rating value.
    pub value: f64,
}

impl Preference {
    /// Create a preference for an item.
    #[must_use]
    pub fn new(item: ItemId, value: f64) -> Self {
        Self { item, value }
    }
}

/// An immutable snapshot of one user and their preferences, sorted by item id
/// for binary-searchable lookup and mergeable iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    preferences: Vec<Preference>,
}

impl User {
    /// Build a user from unordered preferences. Duplicate items keep the last
    /// value given.
    #[must_use]
    pub fn new(id: UserId, preferences: Vec<Preference>) -> Self {
        let map: BTreeMap<ItemId, f64> = preferences
            .into_iter()
            .map(|p| (p.item, p.value))
            .collect();
        Self {
            id,
            preferences: map
                .into_iter()
                .map(|(item, value)| Preference { item, value })
                .collect(),
        }
    }

    /// The user's id.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// The rating this user gave an item, if any.
    #[must_use]
    pub fn preference_for(&self, item: ItemId) -> Option<f64> {
        self.preferences
            .binary_search_by_key(&item, |p| p.item)
            .ok()
            .map(|i| self.preferences[i].value)
    }

    /// All preferences, ordered by item id.
    #[must_use]
    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    /// Number of items this user rated.
    #[must_use]
    pub fn num_preferences(&self) -> usize {
        self.preferences.len()
    }

    /// Preferences as `(item, value)` pairs, ordered by item id.
    pub(crate) fn pairs(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.preferences.iter().map(|p| (p.item, p.value))
    }

    fn upsert(&mut self, item: ItemId, value: f64) {
        match self.preferences.binary_search_by_key(&item, |p| p.item) {
            Ok(i) => self.preferences[i].value = value,
            Err(i) => self.preferences.insert(i, Preference { item, value }),
        }
    }

    fn remove(&mut self, item: ItemId) -> Option<f64> {
        self.preferences
            .binary_search_by_key(&item, |p| p.item)
            .ok()
            .map(|i| self.preferences.remove(i).value)
    }
}

/// Read/write access to preference data.
///
/// Lookups return owned snapshots so implementations are free to use interior
/// locking; every mutation keeps the user-major and item-major views
/// consistent.
pub trait DataModel: Refreshable + Send + Sync {
    /// All user ids, ascending.
    fn user_ids(&self) -> Vec<UserId>;

    /// Snapshot of one user.
    fn user(&self, user_id: UserId) -> Result<User>;

    /// All item ids with at least one preference, ascending.
    fn item_ids(&self) -> Vec<ItemId>;

    /// Number of users.
    fn num_users(&self) -> usize;

    /// Number of distinct rated items.
    fn num_items(&self) -> usize;

    /// `(user, value)` pairs for an item, ordered by user id.
    fn preferences_for_item(&self, item_id: ItemId) -> Result<Vec<(UserId, f64)>>;

    /// How many users rated an item.
    fn num_users_with_preference_for(&self, item_id: ItemId) -> usize;

    /// The rating a user gave an item, if any.
    fn preference_value(&self, user_id: UserId, item_id: ItemId) -> Result<Option<f64>>;

    /// Set or overwrite a rating. The value must be finite.
    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f64) -> Result<()>;

    /// Remove a rating.
    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()>;
}

#[derive(Debug, Default)]
struct ModelInner {
    users: BTreeMap<UserId, User>,
    // Item-major mirror of the same ratings.
    item_index: BTreeMap<ItemId, BTreeMap<UserId, f64>>,
}

/// In-memory [`DataModel`] backed by ordered maps.
///
/// Mutations go through an internal `RwLock`, so the model can be shared
/// behind an `Arc` across recommender components.
#[derive(Debug, Default)]
pub struct InMemoryDataModel {
    inner: RwLock<ModelInner>,
}

impl InMemoryDataModel {
    /// Build a model from `(user, item, value)` triples.
    ///
    /// Returns an error if any value is not finite. Duplicate (user, item)
    /// pairs keep the last value given.
    pub fn from_triples(
        triples: impl IntoIterator<Item = (UserId, ItemId, f64)>,
    ) -> Result<Self> {
        let mut inner = ModelInner::default();
        for (user_id, item_id, value) in triples {
            check_finite(value)?;
            inner
                .users
                .entry(user_id)
                .or_insert_with(|| User::new(user_id, Vec::new()))
                .upsert(item_id, value);
            inner
                .item_index
                .entry(item_id)
                .or_default()
                .insert(user_id, value);
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Build a model from prepared user snapshots.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Result<Self> {
        Self::from_triples(users.into_iter().flat_map(|u| {
            let id = u.id();
            u.preferences()
                .iter()
                .map(|p| (id, p.item, p.value))
                .collect::<Vec<_>>()
        }))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ModelInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ModelInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_finite(value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SugerirError::invalid_argument(
            "value",
            value,
            "a finite rating",
        ))
    }
}

impl DataModel for InMemoryDataModel {
    fn user_ids(&self) -> Vec<UserId> {
        self.read().users.keys().copied().collect()
    }

    fn user(&self, user_id: UserId) -> Result<User> {
        self.read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(SugerirError::NoSuchUser { user_id })
    }

    fn item_ids(&self) -> Vec<ItemId> {
        self.read().item_index.keys().copied().collect()
    }

    fn num_users(&self) -> usize {
        self.read().users.len()
    }

    fn num_items(&self) -> usize {
        self.read().item_index.len()
    }

    fn preferences_for_item(&self, item_id: ItemId) -> Result<Vec<(UserId, f64)>> {
        self.read()
            .item_index
            .get(&item_id)
            .map(|m| m.iter().map(|(&u, &v)| (u, v)).collect())
            .ok_or(SugerirError::NoSuchItem { item_id })
    }

    fn num_users_with_preference_for(&self, item_id: ItemId) -> usize {
        self.read()
            .item_index
            .get(&item_id)
            .map_or(0, BTreeMap::len)
    }

    fn preference_value(&self, user_id: UserId, item_id: ItemId) -> Result<Option<f64>> {
        let inner = self.read();
        let user = inner
            .users
            .get(&user_id)
            .ok_or(SugerirError::NoSuchUser { user_id })?;
        Ok(user.preference_for(item_id))
    }

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f64) -> Result<()> {
        check_finite(value)?;
        let mut inner = self.write();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(SugerirError::NoSuchUser { user_id })?;
        user.upsert(item_id, value);
        inner
            .item_index
            .entry(item_id)
            .or_default()
            .insert(user_id, value);
        Ok(())
    }

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        let mut inner = self.write();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(SugerirError::NoSuchUser { user_id })?;
        if user.remove(item_id).is_none() {
            return Err(SugerirError::NoSuchItem { item_id });
        }
        if let Some(by_user) = inner.item_index.get_mut(&item_id) {
            by_user.remove(&user_id);
            if by_user.is_empty() {
                inner.item_index.remove(&item_id);
            }
        }
        Ok(())
    }
}

impl Refreshable for InMemoryDataModel {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        // The model is the source of truth; nothing to reload.
        already_refreshed.mark(self);
        Ok(())
    }
}
