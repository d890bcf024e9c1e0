//! A tree that remembers what changed since the last sync.
//!
//! Reads go straight through to the wrapped [`TreeAttribute`] via `Deref`.
//! Writes must use the methods here so each change is recorded and the
//! matching listeners run.

use std::ops::Deref;

use attr_tree::{
    encode_tagged, with_global, Attribute, DecodeContext, ItemStack, TreeAttribute,
};
use tracing::debug;

use crate::config::SyncConfig;
use crate::delta::{decode_payload, DeltaEntry, DirtyDelta, SyncUpdate};
use crate::dirty::{DirtyState, DirtyTracker};
use crate::error::{SyncError, SyncResult};
use crate::listener::{ListenerFn, ListenerId, ListenerSet};

#[derive(Debug)]
pub struct SyncedTreeAttribute {
    tree: TreeAttribute,
    dirty: DirtyTracker,
    listeners: ListenerSet,
}

/// Setters that record the key as dirty.
macro_rules! tracked_setters {
    ($($set:ident($($ty:tt)+);)*) => {
        impl SyncedTreeAttribute {
            $(
                pub fn $set(&mut self, key: &str, value: $($ty)+) {
                    self.tree.$set(key, value);
                    self.changed(key);
                }
            )*
        }
    };
}

tracked_setters! {
    set_int(i32);
    set_long(i64);
    set_double(f64);
    set_float(f32);
    set_bool(bool);
    set_string(impl Into<String>);
    set_bytes(impl Into<Vec<u8>>);
    set_string_array(impl Into<Vec<String>>);
    set_int_array(impl Into<Vec<i32>>);
    set_float_array(impl Into<Vec<f32>>);
    set_double_array(impl Into<Vec<f64>>);
    set_long_array(impl Into<Vec<i64>>);
    set_bool_array(impl Into<Vec<bool>>);
    set_tree_array(impl Into<Vec<TreeAttribute>>);
    set_tree(TreeAttribute);
    set_item_stack(ItemStack);
}

impl SyncedTreeAttribute {
    pub fn new() -> Self {
        Self::with_config(&SyncConfig::default())
    }

    pub fn with_config(config: &SyncConfig) -> Self {
        Self {
            tree: TreeAttribute::new(),
            dirty: DirtyTracker::new(config.dirty_capacity),
            listeners: ListenerSet::new(),
        }
    }

    /// Wrap an existing tree. Its contents have never been sent, so the
    /// result starts out all dirty.
    pub fn from_tree(tree: TreeAttribute, config: &SyncConfig) -> Self {
        let mut synced = Self::with_config(config);
        synced.tree = tree;
        synced.dirty.mark_all();
        synced
    }

    pub fn tree(&self) -> &TreeAttribute {
        &self.tree
    }

    pub fn into_inner(self) -> TreeAttribute {
        self.tree
    }

    fn changed(&mut self, path: &str) {
        self.dirty.mark(path);
        self.listeners.fire(path);
    }

    /// Store any value under `key`.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Attribute>) -> Option<Attribute> {
        let previous = self.tree.set(key, value);
        self.changed(key);
        previous
    }

    /// Store a value at a nested path, marking that path dirty.
    pub fn set_by_path(&mut self, path: &str, value: impl Into<Attribute>) -> SyncResult<()> {
        if path.is_empty() {
            return Err(SyncError::EmptyPath);
        }
        self.tree.set_by_path(path, value)?;
        self.changed(path);
        Ok(())
    }

    /// Edit the subtree under `key` in place, creating it if needed. The
    /// whole key is marked dirty.
    pub fn update_tree<R>(&mut self, key: &str, f: impl FnOnce(&mut TreeAttribute) -> R) -> R {
        let result = f(self.tree.get_or_add_tree(key));
        self.changed(key);
        result
    }

    /// Remove `key`. A removal cannot be sent as a sparse value, so this
    /// marks the whole tree dirty.
    pub fn remove(&mut self, key: &str) -> Option<Attribute> {
        let removed = self.tree.remove(key);
        if removed.is_some() {
            self.dirty.mark_all();
            self.listeners.fire(key);
        }
        removed
    }

    /// Merge `source` in, marking each of its top-level keys dirty.
    pub fn merge_tree(&mut self, source: &TreeAttribute) -> SyncResult<()> {
        self.tree.merge(source)?;
        let mut keys: Vec<&str> = source.keys().collect();
        keys.sort_unstable();
        for key in keys {
            self.changed(key);
        }
        Ok(())
    }

    pub fn mark_path_dirty(&mut self, path: &str) {
        self.dirty.mark(path);
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.mark_all();
    }

    /// End a sync epoch. The data is untouched.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.dirty.state()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_clean()
    }

    pub fn register_listener(&mut self, prefix: Option<&str>, callback: ListenerFn) -> ListenerId {
        self.listeners.register(prefix, callback)
    }

    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    /// The current value of every dirty path. When the whole tree is dirty
    /// this covers every key present now, in sorted order.
    pub fn extract_dirty_delta(&self) -> SyncResult<DirtyDelta> {
        let paths: Vec<String> = match self.dirty.state() {
            DirtyState::Clean => Vec::new(),
            DirtyState::Paths(paths) => paths,
            DirtyState::All => {
                let mut keys: Vec<String> = self.tree.keys().map(str::to_owned).collect();
                keys.sort_unstable();
                keys
            }
        };

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let payload = match self.tree.get_by_path(&path) {
                Some(value) => {
                    let mut bytes = Vec::new();
                    encode_tagged(value, &mut bytes)?;
                    Some(bytes)
                }
                None => None,
            };
            entries.push(DeltaEntry { path, payload });
        }
        let delta = DirtyDelta { entries };
        debug!(
            paths = delta.len(),
            bytes = delta.payload_len(),
            "extracted dirty delta"
        );
        Ok(delta)
    }

    /// The smallest update that brings a receiver up to date. A tree that
    /// is all dirty is sent whole, since removed keys cannot be listed.
    pub fn extract_update(&self) -> SyncResult<SyncUpdate> {
        if self.dirty.is_all_dirty() {
            return Ok(SyncUpdate::Full(self.tree.to_bytes()?));
        }
        let delta = self.extract_dirty_delta()?;
        if delta.is_empty() {
            Ok(SyncUpdate::None)
        } else {
            Ok(SyncUpdate::Partial(delta))
        }
    }

    /// Apply one delta entry using the process-wide registry.
    pub fn apply_delta(&mut self, path: &str, payload: Option<&[u8]>) -> SyncResult<()> {
        let value = match payload {
            Some(bytes) => Some(with_global(|registry| {
                decode_payload(path, bytes, &DecodeContext::new(registry))
            })??),
            None => None,
        };
        self.install(path, value)
    }

    /// Apply one delta entry decoding with `ctx`.
    pub fn apply_delta_with(
        &mut self,
        path: &str,
        payload: Option<&[u8]>,
        ctx: &DecodeContext<'_>,
    ) -> SyncResult<()> {
        let value = payload
            .map(|bytes| decode_payload(path, bytes, ctx))
            .transpose()?;
        self.install(path, value)
    }

    /// Install a received value, or remove the path for `None`. The
    /// receiving side does not become dirty.
    fn install(&mut self, path: &str, value: Option<Attribute>) -> SyncResult<()> {
        if path.is_empty() {
            return Err(SyncError::EmptyPath);
        }
        match value {
            Some(value) => {
                self.tree.set_by_path(path, value)?;
            }
            None => {
                self.tree.remove_by_path(path);
            }
        }
        self.listeners.fire(path);
        Ok(())
    }

    pub fn apply_dirty_delta(&mut self, delta: &DirtyDelta) -> SyncResult<()> {
        for entry in &delta.entries {
            self.apply_delta(&entry.path, entry.payload.as_deref())?;
        }
        debug!(paths = delta.len(), "applied dirty delta");
        Ok(())
    }

    pub fn apply_dirty_delta_with(
        &mut self,
        delta: &DirtyDelta,
        ctx: &DecodeContext<'_>,
    ) -> SyncResult<()> {
        for entry in &delta.entries {
            self.apply_delta_with(&entry.path, entry.payload.as_deref(), ctx)?;
        }
        Ok(())
    }

    /// Replace the whole tree with a decoded snapshot. Listeners run once
    /// for every key that existed before or after.
    pub fn apply_full(&mut self, bytes: &[u8]) -> SyncResult<()> {
        let tree = TreeAttribute::from_bytes(bytes)?;
        self.replace(tree);
        Ok(())
    }

    pub fn apply_full_with(&mut self, bytes: &[u8], ctx: &DecodeContext<'_>) -> SyncResult<()> {
        let tree = TreeAttribute::from_bytes_with(bytes, ctx)?;
        self.replace(tree);
        Ok(())
    }

    fn replace(&mut self, tree: TreeAttribute) {
        let mut keys: Vec<String> = self
            .tree
            .keys()
            .chain(tree.keys().filter(|k| !self.tree.has(k)))
            .map(str::to_owned)
            .collect();
        keys.sort_unstable();
        self.tree = tree;
        for key in &keys {
            self.listeners.fire(key);
        }
        debug!(keys = keys.len(), "applied full snapshot");
    }

    pub fn apply_update(&mut self, update: &SyncUpdate) -> SyncResult<()> {
        match update {
            SyncUpdate::None => Ok(()),
            SyncUpdate::Partial(delta) => self.apply_dirty_delta(delta),
            SyncUpdate::Full(bytes) => self.apply_full(bytes),
        }
    }
}

impl Default for SyncedTreeAttribute {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SyncedTreeAttribute {
    type Target = TreeAttribute;

    fn deref(&self) -> &TreeAttribute {
        &self.tree
    }
}
