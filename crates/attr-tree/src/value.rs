//! The closed family of attribute values.
//!
//! [`Attribute`] covers the sixteen built-in kinds. Kinds added at runtime
//! through the [`TypeRegistry`](crate::TypeRegistry) are carried by
//! [`Attribute::Custom`] and implement [`CustomAttribute`].

use std::any::Any;
use std::fmt;

use attr_buffer::{WireReader, WireWrite};
use serde_json::{json, Value};
use tracing::warn;

use crate::codec::{decode_entries, encode_entries, read_count, write_count, DecodeContext};
use crate::error::{AttrError, AttrResult};
use crate::item_stack::ItemStack;
use crate::resolver::Resolver;
use crate::tag::{self, TypeTag};
use crate::tree::TreeAttribute;

/// A value kind registered at runtime.
///
/// Implementations are constructed empty by their registry factory and then
/// filled in by [`CustomAttribute::decode`].
pub trait CustomAttribute: fmt::Debug + Send + Sync {
    /// The tag this kind is registered under.
    fn type_tag(&self) -> TypeTag;

    /// Append the value bytes (no tag, no key).
    fn encode(&self, out: &mut Vec<u8>) -> AttrResult<()>;

    /// Read the value bytes written by [`CustomAttribute::encode`].
    fn decode(&mut self, r: &mut WireReader<'_>, ctx: &DecodeContext<'_>) -> AttrResult<()>;

    fn raw_value(&self) -> Value;

    fn to_text(&self) -> String;

    fn value_equals(&self, resolver: Option<&dyn Resolver>, other: &Attribute) -> bool;

    fn clone_box(&self) -> Box<dyn CustomAttribute>;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn CustomAttribute> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A single storable value.
#[derive(Clone, Debug)]
pub enum Attribute {
    Int(i32),
    Long(i64),
    Double(f64),
    Float(f32),
    String(String),
    Tree(TreeAttribute),
    /// `None` when the stack could not be resolved on decode.
    ItemStack(Option<ItemStack>),
    Bytes(Vec<u8>),
    Bool(bool),
    StringArray(Vec<String>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    TreeArray(Vec<TreeAttribute>),
    LongArray(Vec<i64>),
    BoolArray(Vec<bool>),
    Custom(Box<dyn CustomAttribute>),
}

/// Numeric view used for lenient cross-kind comparison.
#[derive(Clone, Copy, Debug)]
enum Numeric {
    Integer(i64),
    Real(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Real(v) => v,
        }
    }

    /// Integer pairs compare exactly; any pair involving a real compares
    /// through `f64`.
    fn equals(self, other: Numeric) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            _ => reals_equal(self.as_f64(), other.as_f64()),
        }
    }

    /// Hash input taken from the `f64` view, so every pair `equals` accepts
    /// hashes alike.
    fn hash_bits(self) -> u64 {
        canonical_bits(self.as_f64())
    }
}

/// `==` on reals, except that NaN equals NaN.
fn reals_equal(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn real_slices_equal<T: Copy + Into<f64>>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| reals_equal((*x).into(), (*y).into()))
}

/// Bit pattern with `-0.0` folded onto `0.0` and every NaN onto one NaN.
fn canonical_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl Attribute {
    /// The wire tag of this value's kind.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Int(_) => tag::INT,
            Self::Long(_) => tag::LONG,
            Self::Double(_) => tag::DOUBLE,
            Self::Float(_) => tag::FLOAT,
            Self::String(_) => tag::STRING,
            Self::Tree(_) => tag::TREE,
            Self::ItemStack(_) => tag::ITEM_STACK,
            Self::Bytes(_) => tag::BYTES,
            Self::Bool(_) => tag::BOOL,
            Self::StringArray(_) => tag::STRING_ARRAY,
            Self::IntArray(_) => tag::INT_ARRAY,
            Self::FloatArray(_) => tag::FLOAT_ARRAY,
            Self::DoubleArray(_) => tag::DOUBLE_ARRAY,
            Self::TreeArray(_) => tag::TREE_ARRAY,
            Self::LongArray(_) => tag::LONG_ARRAY,
            Self::BoolArray(_) => tag::BOOL_ARRAY,
            Self::Custom(c) => c.type_tag(),
        }
    }

    /// Short name of this value's kind.
    pub fn kind_name(&self) -> &'static str {
        tag::tag_name(self.type_tag())
    }

    /// Append the value bytes (no tag, no key).
    pub fn encode_value<W: WireWrite>(&self, out: &mut W) -> AttrResult<()> {
        match self {
            Self::Int(v) => out.write_i32(*v),
            Self::Long(v) => out.write_i64(*v),
            Self::Double(v) => out.write_f64(*v),
            Self::Float(v) => out.write_f32(*v),
            Self::String(v) => out.write_str(v),
            Self::Bool(v) => out.write_bool(*v),
            Self::Tree(tree) => encode_entries(tree, out)?,
            Self::ItemStack(stack) => match stack {
                Some(stack) => {
                    out.write_bool(true);
                    stack.encode(out)?;
                }
                None => out.write_bool(false),
            },
            Self::Bytes(bytes) => {
                let len = u16::try_from(bytes.len()).map_err(|_| AttrError::ValueTooLarge {
                    kind: "byte array",
                    len: bytes.len(),
                    max: u16::MAX as usize,
                })?;
                out.write_u16(len);
                out.write_slice(bytes);
            }
            Self::StringArray(values) => {
                write_count(out, "string array", values.len())?;
                for v in values {
                    out.write_str(v);
                }
            }
            Self::IntArray(values) => {
                write_count(out, "int array", values.len())?;
                for v in values {
                    out.write_i32(*v);
                }
            }
            Self::FloatArray(values) => {
                write_count(out, "float array", values.len())?;
                for v in values {
                    out.write_f32(*v);
                }
            }
            Self::DoubleArray(values) => {
                write_count(out, "double array", values.len())?;
                for v in values {
                    out.write_f64(*v);
                }
            }
            Self::TreeArray(trees) => {
                write_count(out, "tree array", trees.len())?;
                for tree in trees {
                    encode_entries(tree, out)?;
                }
            }
            Self::LongArray(values) => {
                write_count(out, "long array", values.len())?;
                for v in values {
                    out.write_i64(*v);
                }
            }
            Self::BoolArray(values) => {
                write_count(out, "bool array", values.len())?;
                for v in values {
                    out.write_bool(*v);
                }
            }
            Self::Custom(custom) => {
                let mut bytes = Vec::new();
                custom.encode(&mut bytes)?;
                out.write_slice(&bytes);
            }
        }
        Ok(())
    }

    /// Fill this value from its encoded bytes.
    ///
    /// The kind is fixed by whatever the registry constructed; `level` is the
    /// nesting level of the tree that holds this value.
    pub fn decode_value(
        &mut self,
        r: &mut WireReader<'_>,
        ctx: &DecodeContext<'_>,
        level: usize,
    ) -> AttrResult<()> {
        match self {
            Self::Int(v) => *v = r.read_i32()?,
            Self::Long(v) => *v = r.read_i64()?,
            Self::Double(v) => *v = r.read_f64()?,
            Self::Float(v) => *v = r.read_f32()?,
            Self::String(v) => *v = r.read_str()?,
            Self::Bool(v) => *v = r.read_bool()?,
            Self::Tree(tree) => decode_entries(tree, r, ctx, level + 1)?,
            Self::ItemStack(slot) => {
                *slot = None;
                if r.read_bool()? {
                    match ItemStack::decode(r, ctx, level) {
                        Ok(stack) => *slot = Some(stack),
                        Err(AttrError::MissingDomainReference { location }) => {
                            warn!(%location, "item stack references an unknown object; value unavailable");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            Self::Bytes(bytes) => {
                let len = r.read_u16()? as usize;
                *bytes = r.read_slice(len)?.to_vec();
            }
            Self::StringArray(values) => {
                let count = read_count(r)?;
                *values = Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    values.push(r.read_str()?);
                }
            }
            Self::IntArray(values) => {
                let count = read_count(r)?;
                *values = Vec::with_capacity(count.min(r.remaining() / 4));
                for _ in 0..count {
                    values.push(r.read_i32()?);
                }
            }
            Self::FloatArray(values) => {
                let count = read_count(r)?;
                *values = Vec::with_capacity(count.min(r.remaining() / 4));
                for _ in 0..count {
                    values.push(r.read_f32()?);
                }
            }
            Self::DoubleArray(values) => {
                let count = read_count(r)?;
                *values = Vec::with_capacity(count.min(r.remaining() / 8));
                for _ in 0..count {
                    values.push(r.read_f64()?);
                }
            }
            Self::TreeArray(trees) => {
                let count = read_count(r)?;
                *trees = Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    let mut tree = TreeAttribute::new();
                    decode_entries(&mut tree, r, ctx, level + 1)?;
                    trees.push(tree);
                    if ctx.depth_exceeded() {
                        break;
                    }
                }
            }
            Self::LongArray(values) => {
                let count = read_count(r)?;
                *values = Vec::with_capacity(count.min(r.remaining() / 8));
                for _ in 0..count {
                    values.push(r.read_i64()?);
                }
            }
            Self::BoolArray(values) => {
                let count = read_count(r)?;
                *values = Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    values.push(r.read_bool()?);
                }
            }
            Self::Custom(custom) => custom.decode(r, ctx)?,
        }
        Ok(())
    }

    /// Encode the value bytes into a fresh buffer.
    pub fn value_bytes(&self) -> AttrResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_value(&mut out)?;
        Ok(out)
    }

    /// JSON projection of the underlying value.
    pub fn raw_value(&self) -> Value {
        match self {
            Self::Int(v) => json!(v),
            Self::Long(v) => json!(v),
            Self::Double(v) => json!(v),
            Self::Float(v) => json!(v),
            Self::String(v) => json!(v),
            Self::Bool(v) => json!(v),
            Self::Tree(tree) => tree.to_json(),
            Self::ItemStack(stack) => stack.as_ref().map_or(Value::Null, ItemStack::to_json),
            Self::Bytes(v) => json!(v),
            Self::StringArray(v) => json!(v),
            Self::IntArray(v) => json!(v),
            Self::FloatArray(v) => json!(v),
            Self::DoubleArray(v) => json!(v),
            Self::TreeArray(trees) => Value::Array(trees.iter().map(TreeAttribute::to_json).collect()),
            Self::LongArray(v) => json!(v),
            Self::BoolArray(v) => json!(v),
            Self::Custom(custom) => custom.raw_value(),
        }
    }

    /// JSON-token-shaped rendering: strings quoted, arrays bracketed,
    /// trees as `{ "k": v, ... }`.
    pub fn to_text(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::String(v) => quote(v),
            Self::Bool(v) => v.to_string(),
            Self::Tree(tree) => tree.to_text(),
            Self::ItemStack(stack) => stack.as_ref().map_or_else(|| "null".into(), ItemStack::to_text),
            Self::Bytes(v) => join(v.iter().map(u8::to_string)),
            Self::StringArray(v) => join(v.iter().map(|s| quote(s))),
            Self::IntArray(v) => join(v.iter().map(i32::to_string)),
            Self::FloatArray(v) => join(v.iter().map(f32::to_string)),
            Self::DoubleArray(v) => join(v.iter().map(f64::to_string)),
            Self::TreeArray(trees) => join(trees.iter().map(TreeAttribute::to_text)),
            Self::LongArray(v) => join(v.iter().map(i64::to_string)),
            Self::BoolArray(v) => join(v.iter().map(bool::to_string)),
            Self::Custom(custom) => custom.to_text(),
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Self::Int(v) => Some(Numeric::Integer(i64::from(*v))),
            Self::Long(v) => Some(Numeric::Integer(*v)),
            Self::Float(v) => Some(Numeric::Real(f64::from(*v))),
            Self::Double(v) => Some(Numeric::Real(*v)),
            _ => None,
        }
    }

    /// Numeric scalars as `f64`, regardless of their kind.
    pub fn as_decimal(&self) -> Option<f64> {
        self.numeric().map(Numeric::as_f64)
    }

    /// Value equality.
    ///
    /// Numeric scalars compare by magnitude across kinds, so `Int(5)` equals
    /// `Float(5.0)`. Everything else requires the same kind. Item stacks use
    /// `resolver`, when given, to compare the objects they name.
    pub fn value_equals(&self, resolver: Option<&dyn Resolver>, other: &Attribute) -> bool {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return a.equals(b);
        }
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Tree(a), Self::Tree(b)) => a.equals(resolver, b, &[]),
            (Self::ItemStack(a), Self::ItemStack(b)) => match (a, b) {
                (Some(a), Some(b)) => a.value_equals(resolver, b),
                (None, None) => true,
                _ => false,
            },
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::StringArray(a), Self::StringArray(b)) => a == b,
            (Self::IntArray(a), Self::IntArray(b)) => a == b,
            (Self::FloatArray(a), Self::FloatArray(b)) => real_slices_equal(a, b),
            (Self::DoubleArray(a), Self::DoubleArray(b)) => real_slices_equal(a, b),
            (Self::TreeArray(a), Self::TreeArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(resolver, y, &[]))
            }
            (Self::LongArray(a), Self::LongArray(b)) => a == b,
            (Self::BoolArray(a), Self::BoolArray(b)) => a == b,
            (Self::Custom(a), _) => a.value_equals(resolver, other),
            (_, Self::Custom(b)) => b.value_equals(resolver, self),
            _ => false,
        }
    }

    /// Stable 64-bit hash consistent with [`Attribute::value_equals`].
    /// Nested trees hash order-independently, ignoring
    /// `ignored_keys` at every depth.
    pub fn value_hash(&self, ignored_keys: &[&str]) -> u64 {
        let mut hasher = blake3::Hasher::new();
        match self.numeric() {
            Some(numeric) => {
                hasher.update(b"num:");
                hasher.update(&numeric.hash_bits().to_le_bytes());
            }
            None => match self {
                Self::Tree(tree) => return tree.hash_code(ignored_keys),
                Self::TreeArray(trees) => {
                    hasher.update(&[tag::TREE_ARRAY]);
                    for tree in trees {
                        hasher.update(&tree.hash_code(ignored_keys).to_le_bytes());
                    }
                }
                Self::FloatArray(values) => {
                    hasher.update(&[tag::FLOAT_ARRAY]);
                    for v in values {
                        hasher.update(&canonical_bits(f64::from(*v)).to_le_bytes());
                    }
                }
                Self::DoubleArray(values) => {
                    hasher.update(&[tag::DOUBLE_ARRAY]);
                    for v in values {
                        hasher.update(&canonical_bits(*v).to_le_bytes());
                    }
                }
                Self::ItemStack(Some(stack)) => {
                    hasher.update(&[tag::ITEM_STACK]);
                    hasher.update(&[stack.class.to_byte()]);
                    hasher.update(stack.location.to_string().as_bytes());
                    hasher.update(&stack.quantity.to_le_bytes());
                    hasher.update(&stack.attributes.hash_code(ignored_keys).to_le_bytes());
                }
                other => {
                    hasher.update(&[other.type_tag()]);
                    match other.value_bytes() {
                        Ok(bytes) => hasher.update(&bytes),
                        Err(_) => hasher.update(other.to_text().as_bytes()),
                    };
                }
            },
        }
        digest_u64(&hasher.finalize())
    }

    pub fn as_tree(&self) -> Option<&TreeAttribute> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut TreeAttribute> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree(_))
    }

    /// Downcast a custom value to its concrete type.
    pub fn as_custom<T: CustomAttribute + 'static>(&self) -> Option<&T> {
        match self {
            Self::Custom(custom) => custom.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.value_equals(None, other)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<TreeAttribute> for Attribute {
    fn from(tree: TreeAttribute) -> Self {
        Self::Tree(tree)
    }
}

impl From<ItemStack> for Attribute {
    fn from(stack: ItemStack) -> Self {
        Self::ItemStack(Some(stack))
    }
}

macro_rules! from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Attribute {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

from_scalar! {
    i32 => Int,
    i64 => Long,
    f64 => Double,
    f32 => Float,
    bool => Bool,
    String => String,
    &str => String,
    Vec<String> => StringArray,
    Vec<i32> => IntArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<i64> => LongArray,
    Vec<bool> => BoolArray,
    Vec<TreeAttribute> => TreeArray,
}

/// First eight bytes of a BLAKE3 digest as a little-endian `u64`.
pub(crate) fn digest_u64(hash: &blake3::Hash) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

pub(crate) fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

fn join(items: impl Iterator<Item = String>) -> String {
    format!("[{}]", items.collect::<Vec<_>>().join(", "))
}
