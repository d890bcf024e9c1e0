use serde::{Deserialize, Serialize};

/// Default number of individually tracked dirty paths.
pub const DEFAULT_DIRTY_CAPACITY: usize = 10;

/// Tuning for a [`SyncedTreeAttribute`](crate::SyncedTreeAttribute).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Dirty paths tracked individually before the whole tree is treated as
    /// dirty.
    pub dirty_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dirty_capacity: DEFAULT_DIRTY_CAPACITY,
        }
    }
}

impl SyncConfig {
    pub fn with_dirty_capacity(dirty_capacity: usize) -> Self {
        Self { dirty_capacity }
    }
}
