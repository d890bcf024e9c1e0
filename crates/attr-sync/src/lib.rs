//! Incremental synchronization of attribute trees.
//!
//! A [`SyncedTreeAttribute`] records which paths changed since the last
//! [`mark_clean`](SyncedTreeAttribute::mark_clean) so a sender can ship only
//! those values instead of a full snapshot.
//!
//! # Key Types
//!
//! - [`SyncedTreeAttribute`] -- tree wrapper with dirty tracking and listeners
//! - [`DirtyState`] -- clean, a list of paths, or everything
//! - [`DirtyDelta`] / [`DeltaEntry`] -- sparse per-path payloads
//! - [`SyncUpdate`] -- nothing, a delta, or a full snapshot
//! - [`SyncConfig`] -- dirty-set capacity

pub mod config;
pub mod delta;
pub mod dirty;
pub mod error;
pub mod listener;
pub mod synced;

pub use config::{SyncConfig, DEFAULT_DIRTY_CAPACITY};
pub use delta::{DeltaEntry, DirtyDelta, SyncUpdate};
pub use dirty::{DirtyState, DirtyTracker};
pub use error::{SyncError, SyncResult};
pub use listener::{ListenerFn, ListenerId, ListenerSet};
pub use synced::SyncedTreeAttribute;
