//! Structural comparison and hashing of trees.

use std::collections::BTreeSet;
use std::sync::{OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{AttrError, AttrResult};
use crate::resolver::Resolver;
use crate::tree::{TreeAttribute, PATH_SEPARATOR};
use crate::value::{digest_u64, Attribute};

/// Keys skipped by [`TreeAttribute::is_subset_of`], matched by name at any
/// depth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoredAttributes(BTreeSet<String>);

impl IgnoredAttributes {
    /// An empty set.
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.0.insert(key.into())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for IgnoredAttributes {
    fn default() -> Self {
        Self(BTreeSet::from(["temperature".to_owned()]))
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoredAttributes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

static IGNORED: OnceLock<RwLock<IgnoredAttributes>> = OnceLock::new();

fn ignored_lock() -> &'static RwLock<IgnoredAttributes> {
    IGNORED.get_or_init(|| RwLock::new(IgnoredAttributes::default()))
}

/// Snapshot of the process-wide ignored set.
pub fn ignored_attributes() -> IgnoredAttributes {
    ignored_lock()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Add `key` to the process-wide ignored set.
pub fn add_ignored_attribute(key: impl Into<String>) -> AttrResult<bool> {
    let mut set = ignored_lock()
        .write()
        .map_err(|e| AttrError::RegistryPoisoned(e.to_string()))?;
    Ok(set.insert(key))
}

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{key}")
    }
}

impl TreeAttribute {
    /// Recursive, order-independent equality.
    ///
    /// `ignore_paths` holds full `/`-joined paths from this tree's root.
    /// While the list is non-empty the two trees may differ in size, but a
    /// key present on only one side still makes them unequal unless its path
    /// is ignored.
    pub fn equals(
        &self,
        resolver: Option<&dyn Resolver>,
        other: &TreeAttribute,
        ignore_paths: &[&str],
    ) -> bool {
        self.equals_at(resolver, other, ignore_paths, "")
    }

    fn equals_at(
        &self,
        resolver: Option<&dyn Resolver>,
        other: &TreeAttribute,
        ignore_paths: &[&str],
        prefix: &str,
    ) -> bool {
        if ignore_paths.is_empty() && self.len() != other.len() {
            return false;
        }
        for (key, value) in self.iter() {
            let path = child_path(prefix, key);
            if ignore_paths.contains(&path.as_str()) {
                continue;
            }
            let Some(theirs) = other.get(key) else {
                return false;
            };
            let same = match (value, theirs) {
                (Attribute::Tree(a), Attribute::Tree(b)) => {
                    a.equals_at(resolver, b, ignore_paths, &path)
                }
                _ => value.value_equals(resolver, theirs),
            };
            if !same {
                return false;
            }
        }
        if !ignore_paths.is_empty() {
            for key in other.keys() {
                if !self.has(key) && !ignore_paths.contains(&child_path(prefix, key).as_str()) {
                    return false;
                }
            }
        }
        true
    }

    /// Whether every key here, other than the process-wide ignored
    /// attributes, exists in `other` with the same kind and an equal value.
    /// Nested trees are compared as subsets in turn.
    pub fn is_subset_of(&self, resolver: Option<&dyn Resolver>, other: &TreeAttribute) -> bool {
        let ignored = ignored_lock().read().unwrap_or_else(PoisonError::into_inner);
        self.is_subset_of_with(resolver, other, &ignored)
    }

    /// [`is_subset_of`](Self::is_subset_of) with an explicit ignored set.
    pub fn is_subset_of_with(
        &self,
        resolver: Option<&dyn Resolver>,
        other: &TreeAttribute,
        ignored: &IgnoredAttributes,
    ) -> bool {
        self.iter().all(|(key, value)| {
            if ignored.contains(key) {
                return true;
            }
            let Some(theirs) = other.get(key) else {
                return false;
            };
            if theirs.type_tag() != value.type_tag() {
                return false;
            }
            match (value, theirs) {
                (Attribute::Tree(a), Attribute::Tree(b)) => a.is_subset_of_with(resolver, b, ignored),
                _ => theirs.value_equals(resolver, value),
            }
        })
    }

    /// Order-independent 64-bit hash. Keys named in `ignored_keys` are
    /// skipped at every depth.
    pub fn hash_code(&self, ignored_keys: &[&str]) -> u64 {
        self.iter()
            .filter(|(key, _)| !ignored_keys.contains(key))
            .fold(0u64, |acc, (key, value)| {
                let key_hash = digest_u64(&blake3::hash(key.as_bytes()));
                acc ^ key_hash ^ value.value_hash(ignored_keys)
            })
    }
}
