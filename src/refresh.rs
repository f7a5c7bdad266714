//! Component refresh propagation.
//!
//! Recommenders are built from layered components (data model, similarity,
//! neighborhood, diff storage) that cache derived state. A refresh sweep asks
//! every component to reload, while a shared visited set guarantees each
//! component reloads at most once even when the dependency graph is a diamond
//! or contains a cycle.

use crate::error::Result;
use std::collections::HashSet;

/// A component that can reload its transient state from underlying data.
pub trait Refreshable {
    /// Refresh this component and its dependencies.
    ///
    /// Implementations must call [`RefreshSet::mark`] on themselves first and
    /// return early when it reports the component as already visited, then
    /// refresh dependencies before rebuilding their own derived state.
    fn refresh(&self, already_refreshed: &mut RefreshSet) -> Result<()>;
}

/// Tracks which components a refresh sweep has already visited.
///
/// Identity is by address, which is stable for components held behind `Arc`.
#[derive(Debug, Default)]
pub struct RefreshSet {
    seen: HashSet<usize>,
}

impl RefreshSet {
    /// Create an empty visited set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a component as visited. Returns `true` the first time the
    /// component is seen, `false` on every later call.
    pub fn mark<T: ?Sized>(&mut self, component: &T) -> bool {
        let addr = std::ptr::from_ref(component).cast::<()>() as usize;
        self.seen.insert(addr)
    }

    /// Number of components visited so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no component has been visited yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Run a full refresh sweep starting from `root` with a fresh visited set.
pub fn refresh_all(root: &dyn Refreshable) -> Result<()> {
    let mut already_refreshed = RefreshSet::new();
    root.refresh(&mut already_refreshed)
}
