//! Merging one tree into another.

use tracing::debug;

use crate::error::{AttrError, AttrResult};
use crate::tree::{TreeAttribute, PATH_SEPARATOR};
use crate::value::Attribute;

impl TreeAttribute {
    /// Merge `source` into this tree.
    ///
    /// Keys missing here are cloned in. Where both sides hold a tree the
    /// merge recurses; where both hold the same kind the source value
    /// replaces ours. Any key holding different kinds on the two sides fails
    /// the whole merge with [`AttrError::TypeMismatchOnMerge`] before
    /// anything is changed.
    pub fn merge(&mut self, source: &TreeAttribute) -> AttrResult<()> {
        check_merge(self, source, "")?;
        let changed = apply_merge(self, source);
        debug!(keys = source.len(), changed, "merged attribute tree");
        Ok(())
    }
}

fn check_merge(dest: &TreeAttribute, source: &TreeAttribute, prefix: &str) -> AttrResult<()> {
    for (key, theirs) in source.iter() {
        let Some(ours) = dest.get(key) else {
            continue;
        };
        let path = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}{PATH_SEPARATOR}{key}")
        };
        match (ours, theirs) {
            (Attribute::Tree(a), Attribute::Tree(b)) => check_merge(a, b, &path)?,
            _ if ours.type_tag() != theirs.type_tag() => {
                return Err(AttrError::TypeMismatchOnMerge {
                    path,
                    expected: ours.type_tag(),
                    actual: theirs.type_tag(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Returns the number of leaf values written.
fn apply_merge(dest: &mut TreeAttribute, source: &TreeAttribute) -> usize {
    let mut changed = 0;
    for (key, theirs) in source.iter() {
        match (dest.get_mut(key), theirs) {
            (Some(Attribute::Tree(ours)), Attribute::Tree(nested)) => {
                changed += apply_merge(ours, nested);
            }
            _ => {
                dest.set(key, theirs.clone());
                changed += 1;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag;

    #[test]
    fn missing_keys_are_cloned_in() {
        let mut dest = TreeAttribute::new();
        dest.set_int("hp", 10);
        let mut source = TreeAttribute::new();
        source.set_string("name", "Zara");
        source.get_or_add_tree("inv").set_int("slots", 9);

        dest.merge(&source).unwrap();
        assert_eq!(dest.get_int("hp"), Some(10));
        assert_eq!(dest.get_string("name"), Some("Zara"));

        source.get_tree_mut("inv").unwrap().set_int("slots", 1);
        assert_eq!(dest.get_tree("inv").unwrap().get_int("slots"), Some(9));
    }

    #[test]
    fn same_kind_is_replaced_and_trees_recurse() {
        let mut dest = TreeAttribute::new();
        dest.set_int("hp", 10);
        dest.get_or_add_tree("inv").set_int("slots", 9);
        let mut source = TreeAttribute::new();
        source.set_int("hp", 12);
        source.get_or_add_tree("inv").set_int("used", 3);

        dest.merge(&source).unwrap();
        assert_eq!(dest.get_int("hp"), Some(12));
        let inv = dest.get_tree("inv").unwrap();
        assert_eq!(inv.get_int("slots"), Some(9));
        assert_eq!(inv.get_int("used"), Some(3));
    }

    #[test]
    fn mismatched_kinds_fail_and_leave_destination_untouched() {
        let mut dest = TreeAttribute::new();
        dest.set_string("x", "keep");
        dest.set_int("a", 1);
        let mut source = TreeAttribute::new();
        source.set_int("a", 2);
        source.set_int("x", 5);
        let before = dest.clone();

        let err = dest.merge(&source).unwrap_err();
        assert_eq!(
            err,
            AttrError::TypeMismatchOnMerge {
                path: "x".into(),
                expected: tag::STRING,
                actual: tag::INT,
            }
        );
        assert_eq!(dest.get_string("x"), Some("keep"));
        assert_eq!(dest, before);
    }

    #[test]
    fn nested_mismatch_reports_full_path() {
        let mut dest = TreeAttribute::new();
        dest.get_or_add_tree("stats").set_int("hp", 1);
        let mut source = TreeAttribute::new();
        source.get_or_add_tree("stats").set_bool("hp", true);

        let err = dest.merge(&source).unwrap_err();
        assert!(matches!(
            err,
            AttrError::TypeMismatchOnMerge { ref path, .. } if path == "stats/hp"
        ));
    }

    #[test]
    fn tree_over_leaf_is_a_mismatch() {
        let mut dest = TreeAttribute::new();
        dest.set_int("inv", 0);
        let mut source = TreeAttribute::new();
        source.get_or_add_tree("inv");
        assert!(dest.merge(&source).is_err());
    }
}
