//! The recursive string-keyed container.

use std::collections::hash_map;
use std::collections::HashMap;

use attr_buffer::{WireReader, WireWrite};
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::{decode_entries, encode_entries, DecodeContext};
use crate::error::{AttrError, AttrResult};
use crate::item_stack::ItemStack;
use crate::registry;
use crate::tag::{self, TypeTag};
use crate::value::{quote, Attribute};

/// Separator between keys in a path such as `"stats/hp"`.
pub const PATH_SEPARATOR: char = '/';

/// A mapping from string keys to [`Attribute`] values.
///
/// Key order is not significant: equality, hashing and the wire format's
/// meaning are all order independent. Use
/// [`sorted_copy`](TreeAttribute::sorted_copy) when a stable order is needed.
#[derive(Clone, Debug, Default)]
pub struct TreeAttribute {
    entries: HashMap<String, Attribute>,
}

fn wrong_type(key: &str, expected: TypeTag, actual: &Attribute) -> AttrError {
    AttrError::WrongType {
        key: key.to_owned(),
        expected,
        actual: actual.type_tag(),
    }
}

/// `get_x` / `get_x_or` / `try_get_x` / `set_x` for `Copy` kinds.
macro_rules! copy_accessors {
    ($($variant:ident($ty:ty) = $tag:path => $get:ident, $get_or:ident, $try_get:ident, $set:ident;)*) => {
        impl TreeAttribute {
            $(
                pub fn $get(&self, key: &str) -> Option<$ty> {
                    match self.entries.get(key) {
                        Some(Attribute::$variant(v)) => Some(*v),
                        _ => None,
                    }
                }

                pub fn $get_or(&self, key: &str, default: $ty) -> $ty {
                    self.$get(key).unwrap_or(default)
                }

                pub fn $try_get(&self, key: &str) -> AttrResult<$ty> {
                    match self.entries.get(key) {
                        Some(Attribute::$variant(v)) => Ok(*v),
                        Some(other) => Err(wrong_type(key, $tag, other)),
                        None => Err(AttrError::KeyNotFound(key.to_owned())),
                    }
                }

                pub fn $set(&mut self, key: &str, value: $ty) {
                    match self.entries.get_mut(key) {
                        Some(Attribute::$variant(v)) => *v = value,
                        _ => {
                            self.entries.insert(key.to_owned(), Attribute::$variant(value));
                        }
                    }
                }
            )*
        }
    };
}

/// The same set for kinds stored as `String` or `Vec<_>`, read as slices.
macro_rules! slice_accessors {
    ($($variant:ident($owned:ty => $borrowed:ty) = $tag:path => $get:ident, $get_or:ident, $try_get:ident, $set:ident;)*) => {
        impl TreeAttribute {
            $(
                pub fn $get(&self, key: &str) -> Option<&$borrowed> {
                    match self.entries.get(key) {
                        Some(Attribute::$variant(v)) => Some(&v[..]),
                        _ => None,
                    }
                }

                pub fn $get_or<'a>(&'a self, key: &str, default: &'a $borrowed) -> &'a $borrowed {
                    self.$get(key).unwrap_or(default)
                }

                pub fn $try_get(&self, key: &str) -> AttrResult<&$borrowed> {
                    match self.entries.get(key) {
                        Some(Attribute::$variant(v)) => Ok(&v[..]),
                        Some(other) => Err(wrong_type(key, $tag, other)),
                        None => Err(AttrError::KeyNotFound(key.to_owned())),
                    }
                }

                pub fn $set(&mut self, key: &str, value: impl Into<$owned>) {
                    match self.entries.get_mut(key) {
                        Some(Attribute::$variant(v)) => *v = value.into(),
                        _ => {
                            self.entries.insert(key.to_owned(), Attribute::$variant(value.into()));
                        }
                    }
                }
            )*
        }
    };
}

copy_accessors! {
    Int(i32) = tag::INT => get_int, get_int_or, try_get_int, set_int;
    Long(i64) = tag::LONG => get_long, get_long_or, try_get_long, set_long;
    Double(f64) = tag::DOUBLE => get_double, get_double_or, try_get_double, set_double;
    Float(f32) = tag::FLOAT => get_float, get_float_or, try_get_float, set_float;
    Bool(bool) = tag::BOOL => get_bool, get_bool_or, try_get_bool, set_bool;
}

slice_accessors! {
    String(String => str) = tag::STRING => get_string, get_string_or, try_get_string, set_string;
    Bytes(Vec<u8> => [u8]) = tag::BYTES => get_bytes, get_bytes_or, try_get_bytes, set_bytes;
    StringArray(Vec<String> => [String]) = tag::STRING_ARRAY
        => get_string_array, get_string_array_or, try_get_string_array, set_string_array;
    IntArray(Vec<i32> => [i32]) = tag::INT_ARRAY
        => get_int_array, get_int_array_or, try_get_int_array, set_int_array;
    FloatArray(Vec<f32> => [f32]) = tag::FLOAT_ARRAY
        => get_float_array, get_float_array_or, try_get_float_array, set_float_array;
    DoubleArray(Vec<f64> => [f64]) = tag::DOUBLE_ARRAY
        => get_double_array, get_double_array_or, try_get_double_array, set_double_array;
    LongArray(Vec<i64> => [i64]) = tag::LONG_ARRAY
        => get_long_array, get_long_array_or, try_get_long_array, set_long_array;
    BoolArray(Vec<bool> => [bool]) = tag::BOOL_ARRAY
        => get_bool_array, get_bool_array_or, try_get_bool_array, set_bool_array;
    TreeArray(Vec<TreeAttribute> => [TreeAttribute]) = tag::TREE_ARRAY
        => get_tree_array, get_tree_array_or, try_get_tree_array, set_tree_array;
}

impl TreeAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Attribute> {
        self.entries.get_mut(key)
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Attribute>) -> Option<Attribute> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Attribute> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Any numeric scalar under `key`, widened to `f64`.
    pub fn get_decimal(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Attribute::as_decimal)
    }

    pub fn get_decimal_or(&self, key: &str, default: f64) -> f64 {
        self.get_decimal(key).unwrap_or(default)
    }

    pub fn get_tree(&self, key: &str) -> Option<&TreeAttribute> {
        self.entries.get(key).and_then(Attribute::as_tree)
    }

    pub fn get_tree_mut(&mut self, key: &str) -> Option<&mut TreeAttribute> {
        self.entries.get_mut(key).and_then(Attribute::as_tree_mut)
    }

    pub fn try_get_tree(&self, key: &str) -> AttrResult<&TreeAttribute> {
        match self.entries.get(key) {
            Some(Attribute::Tree(tree)) => Ok(tree),
            Some(other) => Err(wrong_type(key, tag::TREE, other)),
            None => Err(AttrError::KeyNotFound(key.to_owned())),
        }
    }

    /// The subtree under `key`, creating it if absent. A non-tree value
    /// under `key` is replaced by an empty tree.
    pub fn get_or_add_tree(&mut self, key: &str) -> &mut TreeAttribute {
        let slot = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Attribute::Tree(TreeAttribute::new()));
        if !slot.is_tree() {
            *slot = Attribute::Tree(TreeAttribute::new());
        }
        match slot {
            Attribute::Tree(tree) => tree,
            _ => unreachable!("slot was just made a tree"),
        }
    }

    pub fn set_tree(&mut self, key: &str, tree: TreeAttribute) {
        self.entries.insert(key.to_owned(), Attribute::Tree(tree));
    }

    /// The stack under `key`, if present and available.
    pub fn get_item_stack(&self, key: &str) -> Option<&ItemStack> {
        match self.entries.get(key) {
            Some(Attribute::ItemStack(stack)) => stack.as_ref(),
            _ => None,
        }
    }

    pub fn set_item_stack(&mut self, key: &str, stack: ItemStack) {
        self.entries
            .insert(key.to_owned(), Attribute::ItemStack(Some(stack)));
    }

    /// Look a value up by a `/`-separated path of keys.
    pub fn get_by_path(&self, path: &str) -> Option<&Attribute> {
        let (parents, leaf) = split_path(path)?;
        let mut current = self;
        for key in parents {
            current = current.get_tree(key)?;
        }
        current.get(leaf)
    }

    /// Store `value` at a `/`-separated path, creating missing intermediate
    /// trees. Fails if an intermediate key holds something other than a tree.
    pub fn set_by_path(
        &mut self,
        path: &str,
        value: impl Into<Attribute>,
    ) -> AttrResult<Option<Attribute>> {
        let (parents, leaf) =
            split_path(path).ok_or_else(|| AttrError::KeyNotFound(path.to_owned()))?;
        let mut current = self;
        let mut walked = String::new();
        for key in parents {
            if !walked.is_empty() {
                walked.push(PATH_SEPARATOR);
            }
            walked.push_str(key);
            let slot = current
                .entries
                .entry(key.to_owned())
                .or_insert_with(|| Attribute::Tree(TreeAttribute::new()));
            current = slot
                .as_tree_mut()
                .ok_or_else(|| AttrError::NotATree { path: walked.clone() })?;
        }
        Ok(current.set(leaf, value))
    }

    /// Remove the value at a `/`-separated path.
    pub fn remove_by_path(&mut self, path: &str) -> Option<Attribute> {
        let (parents, leaf) = split_path(path)?;
        let mut current = self;
        for key in parents {
            current = current.get_tree_mut(key)?;
        }
        current.remove(leaf)
    }

    /// Insert a freshly decoded entry. A duplicate key keeps the later value.
    pub(crate) fn insert_decoded(&mut self, key: String, value: Attribute) {
        self.entries.insert(key, value);
    }

    /// Append the encoded tree (entries then sentinel) to `out`.
    pub fn encode<W: WireWrite>(&self, out: &mut W) -> AttrResult<()> {
        encode_entries(self, out)
    }

    pub fn to_bytes(&self) -> AttrResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        debug!(entries = self.len(), bytes = out.len(), "encoded attribute tree");
        Ok(out)
    }

    /// Decode a root tree. Stops softly at the context's depth ceiling; check
    /// [`DecodeContext::depth_exceeded`] afterwards to learn whether this
    /// call did.
    pub fn decode(r: &mut WireReader<'_>, ctx: &DecodeContext<'_>) -> AttrResult<Self> {
        ctx.begin();
        let mut tree = Self::new();
        decode_entries(&mut tree, r, ctx, 1)?;
        Ok(tree)
    }

    /// Decode with the process-wide registry and no resolver.
    pub fn from_bytes(bytes: &[u8]) -> AttrResult<Self> {
        registry::with_global(|registry| {
            Self::from_bytes_with(bytes, &DecodeContext::new(registry))
        })?
    }

    pub fn from_bytes_with(bytes: &[u8], ctx: &DecodeContext<'_>) -> AttrResult<Self> {
        let mut r = WireReader::new(bytes);
        let tree = Self::decode(&mut r, ctx)?;
        debug!(
            entries = tree.len(),
            consumed = r.position(),
            trailing = r.remaining(),
            "decoded attribute tree"
        );
        Ok(tree)
    }

    /// `{ "key": value, ... }` with keys in sorted order.
    pub fn to_text(&self) -> String {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        if keys.is_empty() {
            return "{ }".to_owned();
        }
        keys.sort();
        let body: Vec<String> = keys
            .into_iter()
            .map(|key| format!("{}: {}", quote(key), self.entries[key].to_text()))
            .collect();
        format!("{{ {} }}", body.join(", "))
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.raw_value()))
            .collect();
        Value::Object(map)
    }
}

fn split_path<'a>(path: &'a str) -> Option<(impl Iterator<Item = &'a str> + 'a, &'a str)> {
    let (parents, leaf) = match path.rsplit_once(PATH_SEPARATOR) {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    if leaf.is_empty() {
        return None;
    }
    let parents = parents
        .into_iter()
        .flat_map(|p| p.split(PATH_SEPARATOR))
        .filter(|key| !key.is_empty());
    Some((parents, leaf))
}

impl PartialEq for TreeAttribute {
    fn eq(&self, other: &Self) -> bool {
        self.equals(None, other, &[])
    }
}

impl std::fmt::Display for TreeAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl<K: Into<String>, V: Into<Attribute>> FromIterator<(K, V)> for TreeAttribute {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Iterator over `(key, value)` pairs in storage order.
pub struct Iter<'a> {
    inner: hash_map::Iter<'a, String, Attribute>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Attribute);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a TreeAttribute {
    type Item = (&'a str, &'a Attribute);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::registry::TypeRegistry;

    fn zara() -> TreeAttribute {
        let mut tree = TreeAttribute::new();
        tree.set_int("hp", 20);
        tree.set_string("name", "Zara");
        tree.set_int_array("tags", vec![1, 2, 3]);
        tree
    }

    fn decode(bytes: &[u8]) -> TreeAttribute {
        let registry = TypeRegistry::with_builtins();
        TreeAttribute::from_bytes_with(bytes, &DecodeContext::new(&registry)).unwrap()
    }

    #[test]
    fn encode_then_decode_preserves_entries() {
        let tree = zara();
        let bytes = tree.to_bytes().unwrap();
        assert_eq!(*bytes.last().unwrap(), tag::SENTINEL);
        let decoded = decode(&bytes);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.get_int("hp"), Some(20));
        assert_eq!(decoded.get_string("name"), Some("Zara"));
        assert_eq!(decoded.get_int_array("tags"), Some(&[1, 2, 3][..]));
        assert_eq!(decoded, tree);
    }

    #[test]
    fn nan_values_roundtrip_as_equal() {
        let mut tree = TreeAttribute::new();
        tree.set_double("x", f64::NAN);
        tree.set_float_array("f", vec![f32::NAN, 1.0]);
        assert_eq!(tree, tree.clone());

        let decoded = decode(&tree.to_bytes().unwrap());
        assert_eq!(decoded, tree);
        assert_eq!(decoded.hash_code(&[]), tree.hash_code(&[]));
    }

    #[test]
    fn empty_tree_is_a_single_sentinel() {
        let bytes = TreeAttribute::new().to_bytes().unwrap();
        assert_eq!(bytes, vec![0]);
        assert!(decode(&bytes).is_empty());
    }

    #[test]
    fn from_bytes_uses_global_registry() {
        let tree = zara();
        let decoded = TreeAttribute::from_bytes(&tree.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn typed_getters_ignore_other_kinds() {
        let tree = zara();
        assert_eq!(tree.get_long("hp"), None);
        assert_eq!(tree.get_long_or("hp", 7), 7);
        assert_eq!(tree.get_string_or("missing", "none"), "none");
        assert_eq!(tree.get_decimal("hp"), Some(20.0));
        assert_eq!(tree.get_decimal("name"), None);
    }

    #[test]
    fn strict_getters_report_why() {
        let tree = zara();
        assert_eq!(
            tree.try_get_int("missing").unwrap_err(),
            AttrError::KeyNotFound("missing".into())
        );
        assert_eq!(
            tree.try_get_bool("hp").unwrap_err(),
            AttrError::WrongType {
                key: "hp".into(),
                expected: tag::BOOL,
                actual: tag::INT
            }
        );
        assert_eq!(tree.try_get_string("name").unwrap(), "Zara");
    }

    #[test]
    fn setter_replaces_value_of_another_kind() {
        let mut tree = zara();
        tree.set_string("hp", "full");
        assert_eq!(tree.get_string("hp"), Some("full"));
        assert_eq!(tree.get_int("hp"), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn set_and_remove_by_path() {
        let mut tree = TreeAttribute::new();
        tree.set_by_path("stats/combat/hp", 15).unwrap();
        assert_eq!(
            tree.get_by_path("stats/combat/hp"),
            Some(&Attribute::Int(15))
        );
        assert_eq!(tree.get_tree("stats").unwrap().len(), 1);

        assert_eq!(tree.remove_by_path("stats/combat/hp"), Some(Attribute::Int(15)));
        assert!(tree.get_by_path("stats/combat/hp").is_none());
        assert!(tree.get_by_path("stats/combat").is_some());
        assert!(tree.remove_by_path("nope/hp").is_none());
    }

    #[test]
    fn set_by_path_refuses_to_descend_into_a_leaf() {
        let mut tree = zara();
        let err = tree.set_by_path("hp/max", 30).unwrap_err();
        assert_eq!(err, AttrError::NotATree { path: "hp".into() });
        assert_eq!(tree.get_int("hp"), Some(20));
    }

    #[test]
    fn get_or_add_tree_creates_once() {
        let mut tree = TreeAttribute::new();
        tree.get_or_add_tree("inv").set_int("slots", 9);
        tree.get_or_add_tree("inv").set_int("used", 2);
        assert_eq!(tree.get_tree("inv").unwrap().len(), 2);
    }

    #[test]
    fn text_is_sorted_and_stable() {
        assert_eq!(
            zara().to_text(),
            "{ \"hp\": 20, \"name\": \"Zara\", \"tags\": [1, 2, 3] }"
        );
        assert_eq!(TreeAttribute::new().to_text(), "{ }");
    }

    #[test]
    fn json_projection_nests() {
        let mut tree = zara();
        tree.get_or_add_tree("pos").set_double("x", 1.5);
        assert_eq!(
            tree.to_json(),
            serde_json::json!({"hp": 20, "name": "Zara", "tags": [1, 2, 3], "pos": {"x": 1.5}})
        );
    }

    #[test]
    fn collects_from_pairs() {
        let tree: TreeAttribute = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(tree.get_int("b"), Some(2));
    }

    fn leaf() -> impl Strategy<Value = Attribute> {
        prop_oneof![
            any::<i32>().prop_map(Attribute::Int),
            any::<i64>().prop_map(Attribute::Long),
            (-1.0e9f64..1.0e9).prop_map(Attribute::Double),
            any::<bool>().prop_map(Attribute::Bool),
            "[ -~]{0,16}".prop_map(Attribute::String),
            prop::collection::vec(any::<u8>(), 0..32).prop_map(Attribute::Bytes),
            prop::collection::vec(any::<i32>(), 0..8).prop_map(Attribute::IntArray),
            prop::collection::vec("[a-z]{0,6}", 0..4).prop_map(Attribute::StringArray),
        ]
    }

    fn attribute() -> impl Strategy<Value = Attribute> {
        leaf().prop_recursive(3, 48, 6, |inner| {
            prop::collection::hash_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|entries| Attribute::Tree(entries.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn any_tree_roundtrips(entries in prop::collection::hash_map("[a-z]{1,8}", attribute(), 0..10)) {
            let tree: TreeAttribute = entries.into_iter().collect();
            let decoded = decode(&tree.to_bytes().unwrap());
            prop_assert_eq!(decoded.len(), tree.len());
            prop_assert!(decoded == tree);
            prop_assert_eq!(decoded.hash_code(&[]), tree.hash_code(&[]));
        }
    }
}
