//! Last-write-wins holder of the most recently produced objects

use bridge_core::ResultSet;

/// Result cache.
///
/// Holds at most one [`ResultSet`]. It survives across plans on the same
/// connection and is cleared on connect.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    current: Option<ResultSet>,
}

impl ResultCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached set.
    pub fn set(&mut self, result_set: ResultSet) {
        self.current = Some(result_set);
    }

    /// Current set, if any command has produced objects.
    pub fn get(&self) -> Option<&ResultSet> {
        self.current.as_ref()
    }

    /// Drop the cached set.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// True if nothing is cached or the cached set is empty.
    pub fn is_empty(&self) -> bool {
        self.current.as_ref().map_or(true, ResultSet::is_empty)
    }

    /// Copy of the current state, for [`ResultCache::restore`].
    pub fn snapshot(&self) -> Option<ResultSet> {
        self.current.clone()
    }

    /// Put back a state taken with [`ResultCache::snapshot`].
    pub fn restore(&mut self, snapshot: Option<ResultSet>) {
        self.current = snapshot;
    }
}
