//! Structural diff between two trees.
//!
//! Nested trees are walked rather than reported whole, so a change deep
//! inside a subtree shows up under its full path (`"stats/hp"`). Values are
//! compared with [`Attribute::value_equals`], so `Int(5)` against
//! `Float(5.0)` is not a change.

use crate::tree::{TreeAttribute, PATH_SEPARATOR};
use crate::value::Attribute;

/// The changes between an old and a new tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeDiff {
    pub changes: Vec<TreeChange>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, TreeChange::Added { .. }))
            .count()
    }

    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, TreeChange::Removed { .. }))
            .count()
    }

    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, TreeChange::Modified { .. }))
            .count()
    }

    /// Paths of every change, in the order found.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(TreeChange::path)
    }
}

/// A single change at a full path.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeChange {
    Added { path: String, value: Attribute },
    Removed { path: String, value: Attribute },
    Modified {
        path: String,
        old: Attribute,
        new: Attribute,
    },
}

impl TreeChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Modified { path, .. } => {
                path
            }
        }
    }
}

/// Diff `old` against `new`, skipping any full path listed in
/// `ignore_paths`. Keys are visited in sorted order so the output is stable.
pub fn diff_trees(old: &TreeAttribute, new: &TreeAttribute, ignore_paths: &[&str]) -> TreeDiff {
    let mut changes = Vec::new();
    diff_into(old, new, ignore_paths, "", &mut changes);
    TreeDiff { changes }
}

fn diff_into(
    old: &TreeAttribute,
    new: &TreeAttribute,
    ignore_paths: &[&str],
    prefix: &str,
    changes: &mut Vec<TreeChange>,
) {
    let mut keys: Vec<&str> = old.keys().chain(new.keys().filter(|k| !old.has(k))).collect();
    keys.sort_unstable();

    for key in keys {
        let path = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}{PATH_SEPARATOR}{key}")
        };
        if ignore_paths.contains(&path.as_str()) {
            continue;
        }
        match (old.get(key), new.get(key)) {
            (Some(Attribute::Tree(a)), Some(Attribute::Tree(b))) => {
                diff_into(a, b, ignore_paths, &path, changes);
            }
            (Some(a), Some(b)) => {
                if !a.value_equals(None, b) {
                    changes.push(TreeChange::Modified {
                        path,
                        old: a.clone(),
                        new: b.clone(),
                    });
                }
            }
            (Some(a), None) => changes.push(TreeChange::Removed {
                path,
                value: a.clone(),
            }),
            (None, Some(b)) => changes.push(TreeChange::Added {
                path,
                value: b.clone(),
            }),
            (None, None) => {}
        }
    }
}
