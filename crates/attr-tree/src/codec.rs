//! Entry-level encoding and decoding shared by trees, tree arrays, item
//! stacks and synchronization payloads.
//!
//! ```text
//! Tree     := Entry* Sentinel
//! Entry    := TypeTag(u8) Key(length-prefixed UTF-8) ValueBytes
//! Sentinel := 0x00
//! ```
//!
//! Decoding enforces a nesting ceiling. Hitting it is a soft stop: the
//! over-deep value is dropped, decoding ends, and every enclosing tree keeps
//! the entries it had already read.

use std::cell::Cell;
use std::fmt;

use attr_buffer::{WireReader, WireWrite};
use tracing::warn;

use crate::error::{AttrError, AttrResult};
use crate::registry::TypeRegistry;
use crate::resolver::Resolver;
use crate::tag::{TypeTag, SENTINEL};
use crate::tree::TreeAttribute;
use crate::value::Attribute;

/// Deepest tree nesting level that decoding will materialize. The root tree
/// is level 1.
pub const MAX_DECODE_DEPTH: usize = 30;

/// Everything a decode call needs besides the bytes themselves.
pub struct DecodeContext<'a> {
    registry: &'a TypeRegistry,
    resolver: Option<&'a dyn Resolver>,
    max_depth: usize,
    stopped_at: Cell<Option<usize>>,
}

impl<'a> DecodeContext<'a> {
    /// A context using `registry`, no resolver and the default depth ceiling.
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            resolver: None,
            max_depth: MAX_DECODE_DEPTH,
            stopped_at: Cell::new(None),
        }
    }

    /// Resolve item stacks through `resolver`.
    pub fn with_resolver(mut self, resolver: &'a dyn Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Override the nesting ceiling.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn resolver(&self) -> Option<&'a dyn Resolver> {
        self.resolver
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns `true` if the most recent decode using this context hit the
    /// nesting ceiling.
    pub fn depth_exceeded(&self) -> bool {
        self.stopped_at.get().is_some()
    }

    /// Level of the tree the most recent decode refused, if any.
    pub fn stopped_at(&self) -> Option<usize> {
        self.stopped_at.get()
    }

    /// Clear the stop left by an earlier decode. Called at the start of every
    /// root decode.
    pub(crate) fn begin(&self) {
        self.stopped_at.set(None);
    }

    fn stop(&self, level: usize) {
        self.stopped_at.set(Some(level));
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("registry", &self.registry.len())
            .field("resolver", &self.resolver.is_some())
            .field("max_depth", &self.max_depth)
            .field("stopped_at", &self.stopped_at.get())
            .finish()
    }
}

/// Write one `(tag, key, value)` entry.
pub(crate) fn encode_entry<W: WireWrite>(
    key: &str,
    value: &Attribute,
    out: &mut W,
) -> AttrResult<()> {
    let tag = checked_tag(value)?;
    out.write_u8(tag);
    out.write_str(key);
    value.encode_value(out)
}

/// Write every entry of `tree` followed by the sentinel.
pub(crate) fn encode_entries<W: WireWrite>(tree: &TreeAttribute, out: &mut W) -> AttrResult<()> {
    for (key, value) in tree.iter() {
        encode_entry(key, value, out)?;
    }
    out.write_u8(SENTINEL);
    Ok(())
}

/// Read entries into `tree` until the sentinel. `level` is the nesting level
/// of `tree` itself.
pub(crate) fn decode_entries(
    tree: &mut TreeAttribute,
    r: &mut WireReader<'_>,
    ctx: &DecodeContext<'_>,
    level: usize,
) -> AttrResult<()> {
    if level > ctx.max_depth {
        warn!(
            level,
            max_depth = ctx.max_depth,
            offset = r.position(),
            "attribute tree nesting exceeds decode ceiling; stopping"
        );
        ctx.stop(level);
        return Ok(());
    }
    loop {
        let tag = r.read_u8()?;
        if tag == SENTINEL {
            return Ok(());
        }
        let key = r.read_str()?;
        let mut value = ctx.registry.construct(tag)?;
        value.decode_value(r, ctx, level)?;
        match ctx.stopped_at() {
            None => tree.insert_decoded(key, value),
            Some(stopped) => {
                // The value that directly holds the refused tree is dropped;
                // values that merely contain it somewhere deeper are kept.
                if stopped > level + 1 {
                    tree.insert_decoded(key, value);
                }
                return Ok(());
            }
        }
    }
}

/// Write a bare `(tag, value)` pair with no key.
pub fn encode_tagged<W: WireWrite>(value: &Attribute, out: &mut W) -> AttrResult<()> {
    out.write_u8(checked_tag(value)?);
    value.encode_value(out)
}

/// Read a bare `(tag, value)` pair written by [`encode_tagged`].
pub fn decode_tagged(r: &mut WireReader<'_>, ctx: &DecodeContext<'_>) -> AttrResult<Attribute> {
    ctx.begin();
    let offset = r.position();
    let tag = r.read_u8()?;
    if tag == SENTINEL {
        return Err(AttrError::MalformedWire {
            offset,
            reason: "sentinel where a tagged value was expected".into(),
        });
    }
    let mut value = ctx.registry.construct(tag)?;
    value.decode_value(r, ctx, 0)?;
    Ok(value)
}

/// Read an `i32` element count. Negative counts are malformed.
pub(crate) fn read_count(r: &mut WireReader<'_>) -> AttrResult<usize> {
    let offset = r.position();
    let count = r.read_i32()?;
    usize::try_from(count).map_err(|_| AttrError::MalformedWire {
        offset,
        reason: format!("negative element count {count}"),
    })
}

/// Write an element count as `i32`.
pub(crate) fn write_count<W: WireWrite>(
    out: &mut W,
    kind: &'static str,
    len: usize,
) -> AttrResult<()> {
    let count = i32::try_from(len).map_err(|_| AttrError::ValueTooLarge {
        kind,
        len,
        max: i32::MAX as usize,
    })?;
    out.write_i32(count);
    Ok(())
}

fn checked_tag(value: &Attribute) -> AttrResult<TypeTag> {
    match value.type_tag() {
        SENTINEL => Err(AttrError::ReservedTag(SENTINEL)),
        tag => Ok(tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag;

    fn nested_bytes(levels: usize) -> Vec<u8> {
        // levels-1 nested "n" entries inside the root, each a tree.
        let mut out = Vec::new();
        for _ in 1..levels {
            out.write_u8(tag::TREE);
            out.write_str("n");
        }
        for _ in 0..levels {
            out.write_u8(SENTINEL);
        }
        out
    }

    fn nesting_of(tree: &TreeAttribute) -> usize {
        let mut depth = 1;
        let mut current = tree;
        while let Some(child) = current.get_tree("n") {
            depth += 1;
            current = child;
        }
        depth
    }

    #[test]
    fn tagged_value_roundtrip() {
        let registry = TypeRegistry::with_builtins();
        let mut out = Vec::new();
        encode_tagged(&Attribute::Int(15), &mut out).unwrap();
        assert_eq!(out, vec![tag::INT, 15, 0, 0, 0]);

        let ctx = DecodeContext::new(&registry);
        let value = decode_tagged(&mut WireReader::new(&out), &ctx).unwrap();
        assert_eq!(value, Attribute::Int(15));
    }

    #[test]
    fn tagged_sentinel_is_malformed() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let err = decode_tagged(&mut WireReader::new(&[0]), &ctx).unwrap_err();
        assert!(err.is_malformed_wire());
    }

    #[test]
    fn unknown_tag_is_a_hard_failure() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let mut bytes = Vec::new();
        bytes.write_u8(99);
        bytes.write_str("x");
        bytes.write_u8(SENTINEL);
        let err = TreeAttribute::decode(&mut WireReader::new(&bytes), &ctx).unwrap_err();
        assert_eq!(err, AttrError::UnknownTypeTag { tag: 99 });
    }

    #[test]
    fn forty_levels_stop_at_thirty() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let bytes = nested_bytes(40);
        let tree = TreeAttribute::decode(&mut WireReader::new(&bytes), &ctx).unwrap();
        assert!(ctx.depth_exceeded());
        assert_eq!(ctx.stopped_at(), Some(MAX_DECODE_DEPTH + 1));
        assert_eq!(nesting_of(&tree), MAX_DECODE_DEPTH);
    }

    #[test]
    fn exactly_thirty_levels_decode_fully() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let bytes = nested_bytes(30);
        let tree = TreeAttribute::decode(&mut WireReader::new(&bytes), &ctx).unwrap();
        assert!(!ctx.depth_exceeded());
        assert_eq!(nesting_of(&tree), 30);
    }

    #[test]
    fn context_reused_after_a_stop_decodes_fully() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        TreeAttribute::decode(&mut WireReader::new(&nested_bytes(40)), &ctx).unwrap();
        assert!(ctx.depth_exceeded());

        let mut flat = TreeAttribute::new();
        flat.set_int("hp", 20);
        flat.set_string("name", "Zara");
        flat.set_int_array("tags", vec![1, 2, 3]);
        let bytes = flat.to_bytes().unwrap();
        let tree = TreeAttribute::decode(&mut WireReader::new(&bytes), &ctx).unwrap();
        assert!(!ctx.depth_exceeded());
        assert_eq!(tree.len(), 3);
        assert_eq!(tree, flat);
    }

    #[test]
    fn tagged_decode_clears_an_earlier_stop() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry).with_max_depth(2);
        TreeAttribute::decode(&mut WireReader::new(&nested_bytes(5)), &ctx).unwrap();
        assert_eq!(ctx.stopped_at(), Some(3));

        let mut pair = TreeAttribute::new();
        pair.set_int("a", 1);
        pair.set_int("b", 2);
        let mut out = Vec::new();
        encode_tagged(&Attribute::Tree(pair.clone()), &mut out).unwrap();
        let value = decode_tagged(&mut WireReader::new(&out), &ctx).unwrap();
        assert_eq!(ctx.stopped_at(), None);
        assert_eq!(value, Attribute::Tree(pair));
    }

    #[test]
    fn depth_stop_keeps_earlier_siblings() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry).with_max_depth(2);
        let mut bytes = Vec::new();
        bytes.write_u8(tag::INT);
        bytes.write_str("hp");
        bytes.write_i32(20);
        bytes.extend(nested_bytes(4));

        let tree = TreeAttribute::decode(&mut WireReader::new(&bytes), &ctx).unwrap();
        assert_eq!(tree.get_int("hp"), Some(20));
        let child = tree.get_tree("n").unwrap();
        assert!(child.is_empty());
    }

    #[test]
    fn negative_count_is_malformed() {
        let mut r = WireReader::new(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            read_count(&mut r).unwrap_err(),
            AttrError::MalformedWire { offset: 0, .. }
        ));
    }

    #[test]
    fn truncated_entry_is_malformed() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let bytes = [tag::INT, 2, b'h', b'p', 20, 0];
        let err = TreeAttribute::decode(&mut WireReader::new(&bytes), &ctx).unwrap_err();
        assert!(err.is_malformed_wire());
    }
}
