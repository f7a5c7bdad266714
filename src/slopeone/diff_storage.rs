//! In-memory item-item diff storage.

use crate::error::{Result, SugerirError};
use crate::model::{DataModel, ItemId, Preference, User, UserId};
use crate::refresh::{RefreshSet, Refreshable};
use crate::stats::{RunningAverage, RunningAverageAndStdDev};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError, RwLock};

/// Read-only snapshot of one item-item diff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffView {
    /// How many users co-rated the pair.
    pub count: u64,
    /// Average rating difference, second item minus first.
    pub mean: f64,
    /// Sample standard deviation of the differences, when tracked. NaN
    /// when tracked but backed by fewer than two data points.
    pub stddev: Option<f64>,
}

impl DiffView {
    /// The same diff read in the opposite direction.
    #[must_use]
    pub fn inverted(self) -> Self {
        Self {
            mean: -self.mean,
            ..self
        }
    }
}

// One diff statistic; the variant is fixed at storage construction.
#[derive(Debug)]
enum DiffStat {
    Mean(RunningAverage),
    Spread(RunningAverageAndStdDev),
}

impl DiffStat {
    fn new(track_spread: bool) -> Self {
        if track_spread {
            Self::Spread(RunningAverageAndStdDev::new())
        } else {
            Self::Mean(RunningAverage::new())
        }
    }

    fn add(&mut self, datum: f64) {
        match self {
            Self::Mean(avg) => avg.add(datum),
            Self::Spread(stat) => stat.add(datum),
        }
    }

    fn remove(&mut self, datum: f64) -> Result<()> {
        match self {
            Self::Mean(avg) => avg.remove(datum),
            Self::Spread(stat) => stat.remove(datum),
        }
    }

    fn change(&mut self, delta: f64) -> Result<()> {
        match self {
            Self::Mean(avg) => avg.change(delta),
            Self::Spread(stat) => stat.change(delta),
        }
    }

    fn count(&self) -> u64 {
        match self {
            Self::Mean(avg) => avg.count(),
            Self::Spread(stat) => stat.count(),
        }
    }

    fn view(&self) -> DiffView {
        match self {
            Self::Mean(avg) => DiffView {
                count: avg.count(),
                mean: avg.mean(),
                stddev: None,
            },
            Self::Spread(stat) => DiffView {
                count: stat.count(),
                mean: stat.mean(),
                stddev: Some(stat.standard_deviation()),
            },
        }
    }
}

#[derive(Debug, Default)]
struct DiffMaps {
    // Outer key is the smaller item id of the pair; the stored mean is
    // value(second) - value(first). Cells carry their own lock so
    // incremental adjustment can share the outer read lock with readers.
    average_diffs: BTreeMap<ItemId, BTreeMap<ItemId, Mutex<DiffStat>>>,
    average_item_pref: BTreeMap<ItemId, Mutex<RunningAverage>>,
    recommendable: BTreeSet<ItemId>,
}

/// Stores the average rating difference for every co-rated item pair.
///
/// For items `a < b` the storage keeps a running average of
/// `rating(b) - rating(a)` across all users who rated both; reading the pair
/// the other way round returns the sign-inverted view. Construction scans
/// the whole model; afterwards readers and incremental adjustments share a
/// read lock while [`MemoryDiffStorage::rebuild`] takes the write lock and
/// replaces everything atomically.
///
/// Pairs co-rated by at most one user are pruned at rebuild as unreliable.
/// `max_entries` caps memory: once reached, later-discovered pairs are
/// ignored. Which pairs survive the cap therefore depends on scan order
/// (ascending user id); infrequently co-rated pairs are the intended
/// casualties.
pub struct MemoryDiffStorage {
    model: std::sync::Arc<dyn DataModel>,
    stddev_weighted: bool,
    max_entries: u64,
    maps: RwLock<DiffMaps>,
}

impl MemoryDiffStorage {
    /// Build diff storage over a model, scanning it immediately.
    ///
    /// `stddev_weighted` tracks the spread of each diff (for
    /// stddev-weighted slope-one) at the cost of forbidding incremental
    /// point updates. `max_entries` must be at least 1; use `u64::MAX` for
    /// no cap.
    pub fn new(
        model: std::sync::Arc<dyn DataModel>,
        stddev_weighted: bool,
        max_entries: u64,
    ) -> Result<Self> {
        if max_entries == 0 {
            return Err(SugerirError::invalid_argument(
                "max_entries",
                max_entries,
                ">= 1",
            ));
        }
        let storage = Self {
            model,
            stddev_weighted,
            max_entries,
            maps: RwLock::new(DiffMaps::default()),
        };
        storage.rebuild()?;
        Ok(storage)
    }

    /// Whether diffs track spread as well as mean.
    #[must_use]
    pub fn stddev_weighted(&self) -> bool {
        self.stddev_weighted
    }

    /// The diff between two items, oriented from `item_a` to `item_b`:
    /// the mean is the average of `rating(item_b) - rating(item_a)`.
    /// `None` when the pair was never co-rated, was pruned, or fell outside
    /// the entry cap.
    pub fn diff(&self, item_a: ItemId, item_b: ItemId) -> Option<DiffView> {
        let maps = self.read();
        Self::diff_in(&maps, item_a, item_b)
    }

    fn diff_in(maps: &DiffMaps, item_a: ItemId, item_b: ItemId) -> Option<DiffView> {
        if let Some(cell) = maps.average_diffs.get(&item_a).and_then(|m| m.get(&item_b)) {
            return Some(lock_cell(cell).view());
        }
        maps.average_diffs
            .get(&item_b)
            .and_then(|m| m.get(&item_a))
            .map(|cell| lock_cell(cell).view().inverted())
    }

    /// For each preference, the diff from that item to `item_id`, aligned
    /// by position. The whole scan happens under one read lock, so the
    /// result is a consistent snapshot.
    pub fn diffs(&self, item_id: ItemId, prefs: &[Preference]) -> Vec<Option<DiffView>> {
        let maps = self.read();
        prefs
            .iter()
            .map(|p| Self::diff_in(&maps, p.item, item_id))
            .collect()
    }

    /// Average rating of an item across all users, if any user rated it at
    /// the last rebuild.
    #[must_use]
    pub fn average_item_pref(&self, item_id: ItemId) -> Option<RunningAverage> {
        let maps = self.read();
        maps.average_item_pref
            .get(&item_id)
            .map(|cell| *cell.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply a rating change to every tracked diff involving `item_id`
    /// without a full rebuild.
    ///
    /// With `remove` false, `pref_delta` is the change in the rating and
    /// each affected diff's mean shifts by it wholesale; this is unsupported
    /// when spread is tracked, because a spread cannot be shifted without
    /// the original datum. With `remove` true, `pref_delta` is the removed
    /// rating's value and one datum leaves each diff. Both approximate the
    /// effect of the single changed rating; a rebuild restores exact diffs.
    pub fn update_item_pref(&self, item_id: ItemId, pref_delta: f64, remove: bool) -> Result<()> {
        if !remove && self.stddev_weighted {
            return Err(SugerirError::unsupported(
                "update_item_pref",
                "cannot shift spread-tracking diffs; rebuild instead",
            ));
        }
        let maps = self.read();
        for (first, inner) in &maps.average_diffs {
            let matches_first = *first == item_id;
            for (second, cell) in inner {
                if matches_first {
                    let mut stat = lock_cell(cell);
                    if remove {
                        stat.remove(pref_delta)?;
                    } else {
                        stat.change(-pref_delta)?;
                    }
                } else if *second == item_id {
                    let mut stat = lock_cell(cell);
                    if remove {
                        stat.remove(-pref_delta)?;
                    } else {
                        stat.change(pref_delta)?;
                    }
                }
            }
        }
        if let Some(cell) = maps.average_item_pref.get(&item_id) {
            let mut avg = cell.lock().unwrap_or_else(PoisonError::into_inner);
            if remove {
                avg.remove(pref_delta)?;
            } else {
                avg.change(pref_delta)?;
            }
        }
        Ok(())
    }

    /// All items a diff-based estimate exists for, minus those the user has
    /// already rated. Ascending item id.
    pub fn recommendable_items(&self, user_id: UserId) -> Result<Vec<ItemId>> {
        let user = self.model.user(user_id)?;
        let maps = self.read();
        Ok(maps
            .recommendable
            .iter()
            .copied()
            .filter(|&item| user.preference_for(item).is_none())
            .collect())
    }

    /// Rescan the model and atomically replace all diffs.
    pub fn rebuild(&self) -> Result<()> {
        let users: Vec<User> = self
            .model
            .user_ids()
            .into_iter()
            .map(|id| self.model.user(id))
            .collect::<Result<_>>()?;

        // Per-user pair contributions are independent; compute them in
        // parallel, then merge in ascending user order so the entry cap
        // keeps first-discovered pairs deterministically.
        let partials: Vec<UserPartial> = users.par_iter().map(per_user_partial).collect();

        let mut diffs: BTreeMap<ItemId, BTreeMap<ItemId, DiffStat>> = BTreeMap::new();
        let mut item_prefs: BTreeMap<ItemId, RunningAverage> = BTreeMap::new();
        let mut entry_count = 0u64;
        for partial in partials {
            for (first, second, diff) in partial.pairs {
                let inner = diffs.entry(first).or_default();
                match inner.get_mut(&second) {
                    Some(stat) => stat.add(diff),
                    None if entry_count < self.max_entries => {
                        let mut stat = DiffStat::new(self.stddev_weighted);
                        stat.add(diff);
                        inner.insert(second, stat);
                        entry_count += 1;
                    }
                    None => {}
                }
            }
            for (item, value) in partial.prefs {
                item_prefs.entry(item).or_insert_with(RunningAverage::new).add(value);
            }
        }

        // Prune diffs backed by a single data point, then derive the
        // recommendable set from what survived.
        let mut new_maps = DiffMaps::default();
        for (first, inner) in diffs {
            let kept: BTreeMap<ItemId, Mutex<DiffStat>> = inner
                .into_iter()
                .filter(|(_, stat)| stat.count() > 1)
                .map(|(second, stat)| (second, Mutex::new(stat)))
                .collect();
            if kept.is_empty() {
                continue;
            }
            new_maps.recommendable.insert(first);
            new_maps.recommendable.extend(kept.keys().copied());
            new_maps.average_diffs.insert(first, kept);
        }
        new_maps.average_item_pref = item_prefs
            .into_iter()
            .map(|(item, avg)| (item, Mutex::new(avg)))
            .collect();

        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);
        *maps = new_maps;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, DiffMaps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_cell(cell: &Mutex<DiffStat>) -> std::sync::MutexGuard<'_, DiffStat> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

struct UserPartial {
    // (smaller item, larger item, larger's rating minus smaller's).
    pairs: Vec<(ItemId, ItemId, f64)>,
    prefs: Vec<(ItemId, f64)>,
}

fn per_user_partial(user: &User) -> UserPartial {
    let prefs = user.preferences();
    let mut pairs = Vec::with_capacity(prefs.len().saturating_sub(1) * prefs.len() / 2);
    for (i, a) in prefs.iter().enumerate() {
        for b in &prefs[i + 1..] {
            // Preferences are sorted by item id, so a.item < b.item.
            pairs.push((a.item, b.item, b.value - a.value));
        }
    }
    UserPartial {
        pairs,
        prefs: prefs.iter().map(|p| (p.item, p.value)).collect(),
    }
}

impl Refreshable for MemoryDiffStorage {
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()> {
        if !already_refreshed.mark(self) {
            return Ok(());
        }
        self.model.refresh(already_refreshed)?;
        self.rebuild()
    }
}
