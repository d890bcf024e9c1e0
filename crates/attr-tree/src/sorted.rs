//! Key-ordered views of a tree, for deterministic bytes and digests.

use attr_buffer::WireWrite;

use crate::codec::{encode_entry, write_count};
use crate::error::AttrResult;
use crate::item_stack::ItemStack;
use crate::tag::{self, SENTINEL};
use crate::tree::TreeAttribute;
use crate::value::{quote, Attribute};

/// A borrowed view of a tree with keys in lexicographic order.
#[derive(Clone, Debug)]
pub struct SortedTree<'a> {
    entries: Vec<(&'a str, SortedValue<'a>)>,
}

/// One value in a [`SortedTree`].
#[derive(Clone, Debug)]
pub enum SortedValue<'a> {
    Value(&'a Attribute),
    /// A nested tree, sorted in turn.
    Tree(SortedTree<'a>),
    /// A tree array with every element sorted.
    TreeArray(Vec<SortedTree<'a>>),
    /// An item stack with its attributes sorted.
    ItemStack(&'a ItemStack, SortedTree<'a>),
}

impl TreeAttribute {
    /// A key-ordered view of this tree. With `recursive`, every nested tree
    /// is ordered as well, including tree-array elements and item-stack
    /// attributes.
    pub fn sorted_copy(&self, recursive: bool) -> SortedTree<'_> {
        let mut entries: Vec<(&str, SortedValue<'_>)> = self
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Attribute::Tree(tree) if recursive => SortedValue::Tree(tree.sorted_copy(true)),
                    Attribute::TreeArray(trees) if recursive => SortedValue::TreeArray(
                        trees.iter().map(|tree| tree.sorted_copy(true)).collect(),
                    ),
                    Attribute::ItemStack(Some(stack)) if recursive => {
                        SortedValue::ItemStack(stack, stack.attributes.sorted_copy(true))
                    }
                    other => SortedValue::Value(other),
                };
                (key, value)
            })
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        SortedTree { entries }
    }
}

impl<'a> SortedTree<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &SortedValue<'a>)> + '_ {
        self.entries.iter().map(|(key, value)| (*key, value))
    }

    pub fn get(&self, key: &str) -> Option<&SortedValue<'a>> {
        self.entries
            .binary_search_by(|(k, _)| (*k).cmp(key))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// Encode in key order. The bytes decode to a tree equal to the source.
    pub fn encode<W: WireWrite>(&self, out: &mut W) -> AttrResult<()> {
        for (key, value) in &self.entries {
            match value {
                SortedValue::Value(attr) => encode_entry(key, attr, out)?,
                SortedValue::Tree(tree) => {
                    out.write_u8(tag::TREE);
                    out.write_str(key);
                    tree.encode(out)?;
                }
                SortedValue::TreeArray(trees) => {
                    out.write_u8(tag::TREE_ARRAY);
                    out.write_str(key);
                    write_count(out, "tree array", trees.len())?;
                    for tree in trees {
                        tree.encode(out)?;
                    }
                }
                SortedValue::ItemStack(stack, attributes) => {
                    out.write_u8(tag::ITEM_STACK);
                    out.write_str(key);
                    out.write_bool(true);
                    if stack.encode_head(out) {
                        attributes.encode(out)?;
                    }
                }
            }
        }
        out.write_u8(SENTINEL);
        Ok(())
    }

    pub fn to_bytes(&self) -> AttrResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// BLAKE3 digest of the ordered encoding.
    pub fn digest(&self) -> AttrResult<[u8; 32]> {
        Ok(*blake3::hash(&self.to_bytes()?).as_bytes())
    }

    pub fn digest_hex(&self) -> AttrResult<String> {
        Ok(hex::encode(self.digest()?))
    }

    pub fn to_text(&self) -> String {
        if self.entries.is_empty() {
            return "{ }".to_owned();
        }
        let body: Vec<String> = self
            .entries
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    SortedValue::Value(attr) => attr.to_text(),
                    SortedValue::Tree(tree) => tree.to_text(),
                    SortedValue::TreeArray(trees) => {
                        let items: Vec<String> = trees.iter().map(SortedTree::to_text).collect();
                        format!("[{}]", items.join(", "))
                    }
                    SortedValue::ItemStack(stack, _) => stack.to_text(),
                };
                format!("{}: {text}", quote(key))
            })
            .collect();
        format!("{{ {} }}", body.join(", "))
    }

    /// An owned tree with the same contents.
    pub fn to_tree(&self) -> TreeAttribute {
        self.entries
            .iter()
            .map(|(key, value)| {
                let attr = match value {
                    SortedValue::Value(attr) => (*attr).clone(),
                    SortedValue::Tree(tree) => Attribute::Tree(tree.to_tree()),
                    SortedValue::TreeArray(trees) => {
                        Attribute::TreeArray(trees.iter().map(SortedTree::to_tree).collect())
                    }
                    SortedValue::ItemStack(stack, _) => Attribute::ItemStack(Some((*stack).clone())),
                };
                (*key, attr)
            })
            .collect()
    }
}
