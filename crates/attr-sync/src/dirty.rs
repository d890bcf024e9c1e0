//! Dirty-path bookkeeping.
//!
//! Paths are tracked individually up to a fixed capacity. One more distinct
//! path collapses the set into a single "everything is dirty" flag, which
//! also absorbs every later mark until the tracker is cleared.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a tracker currently reports as changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirtyState {
    Clean,
    /// The listed paths, in the order they were first marked.
    Paths(Vec<String>),
    /// Every key, including ones that may have been removed.
    All,
}

impl DirtyState {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

#[derive(Clone, Debug)]
pub struct DirtyTracker {
    all_dirty: bool,
    paths: Vec<String>,
    capacity: usize,
}

impl DirtyTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            all_dirty: false,
            paths: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Mark one path. Returns `true` if this call collapsed the tracker to
    /// all-dirty.
    pub fn mark(&mut self, path: &str) -> bool {
        if self.all_dirty || self.paths.iter().any(|p| p == path) {
            return false;
        }
        if self.paths.len() >= self.capacity {
            debug!(
                capacity = self.capacity,
                path, "dirty path set full; marking whole tree dirty"
            );
            self.mark_all();
            return true;
        }
        self.paths.push(path.to_owned());
        false
    }

    pub fn mark_all(&mut self) {
        self.all_dirty = true;
        self.paths.clear();
    }

    pub fn clear(&mut self) {
        self.all_dirty = false;
        self.paths.clear();
    }

    pub fn is_all_dirty(&self) -> bool {
        self.all_dirty
    }

    pub fn is_clean(&self) -> bool {
        !self.all_dirty && self.paths.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> DirtyState {
        if self.all_dirty {
            DirtyState::All
        } else if self.paths.is_empty() {
            DirtyState::Clean
        } else {
            DirtyState::Paths(self.paths.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_deduplicated_and_ordered() {
        let mut tracker = DirtyTracker::new(10);
        tracker.mark("b");
        tracker.mark("a");
        tracker.mark("b");
        assert_eq!(
            tracker.state(),
            DirtyState::Paths(vec!["b".into(), "a".into()])
        );
    }

    #[test]
    fn overflow_collapses_to_all() {
        let mut tracker = DirtyTracker::new(2);
        assert!(!tracker.mark("a"));
        assert!(!tracker.mark("b"));
        assert!(tracker.mark("c"));
        assert_eq!(tracker.state(), DirtyState::All);
        assert!(!tracker.mark("d"));
        assert_eq!(tracker.state(), DirtyState::All);
    }

    #[test]
    fn clear_resets_everything() {
        let mut tracker = DirtyTracker::new(1);
        tracker.mark("a");
        tracker.mark("b");
        tracker.clear();
        assert!(tracker.is_clean());
        assert_eq!(tracker.state(), DirtyState::Clean);
    }
}
