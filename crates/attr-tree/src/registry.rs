//! Tag → factory table used to reconstruct values during decode.
//!
//! Every decode goes through a [`TypeRegistry`]: the tag read from the wire
//! selects a factory, the factory builds an empty value of the right kind,
//! and that value decodes its own bytes. The sixteen built-in kinds are
//! always present in [`TypeRegistry::with_builtins`]; further kinds are
//! added with [`TypeRegistry::register`] or, for the process-wide instance,
//! [`register_global`].

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use tracing::debug;

use crate::error::{AttrError, AttrResult};
use crate::tag::{self, TypeTag, SENTINEL};
use crate::value::Attribute;

/// Builds an empty value of one kind.
pub type AttributeFactory = fn() -> Attribute;

/// Mapping from wire tag to value factory.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    factories: HashMap<TypeTag, AttributeFactory>,
}

impl TypeRegistry {
    /// A registry with no kinds at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding the sixteen built-in kinds.
    pub fn with_builtins() -> Self {
        let mut factories: HashMap<TypeTag, AttributeFactory> = HashMap::with_capacity(32);
        factories.insert(tag::INT, || Attribute::Int(0));
        factories.insert(tag::LONG, || Attribute::Long(0));
        factories.insert(tag::DOUBLE, || Attribute::Double(0.0));
        factories.insert(tag::FLOAT, || Attribute::Float(0.0));
        factories.insert(tag::STRING, || Attribute::String(String::new()));
        factories.insert(tag::TREE, || Attribute::Tree(Default::default()));
        factories.insert(tag::ITEM_STACK, || Attribute::ItemStack(None));
        factories.insert(tag::BYTES, || Attribute::Bytes(Vec::new()));
        factories.insert(tag::BOOL, || Attribute::Bool(false));
        factories.insert(tag::STRING_ARRAY, || Attribute::StringArray(Vec::new()));
        factories.insert(tag::INT_ARRAY, || Attribute::IntArray(Vec::new()));
        factories.insert(tag::FLOAT_ARRAY, || Attribute::FloatArray(Vec::new()));
        factories.insert(tag::DOUBLE_ARRAY, || Attribute::DoubleArray(Vec::new()));
        factories.insert(tag::TREE_ARRAY, || Attribute::TreeArray(Vec::new()));
        factories.insert(tag::LONG_ARRAY, || Attribute::LongArray(Vec::new()));
        factories.insert(tag::BOOL_ARRAY, || Attribute::BoolArray(Vec::new()));
        Self { factories }
    }

    /// Register `factory` under `tag`, replacing and returning any earlier
    /// factory for that tag. Tag 0 is reserved for the tree terminator.
    pub fn register(
        &mut self,
        tag: TypeTag,
        factory: AttributeFactory,
    ) -> AttrResult<Option<AttributeFactory>> {
        if tag == SENTINEL {
            return Err(AttrError::ReservedTag(tag));
        }
        let previous = self.factories.insert(tag, factory);
        debug!(tag, replaced = previous.is_some(), "registered attribute kind");
        Ok(previous)
    }

    /// Build an empty value for `tag`.
    pub fn construct(&self, tag: TypeTag) -> AttrResult<Attribute> {
        self.factories
            .get(&tag)
            .map(|factory| factory())
            .ok_or(AttrError::UnknownTypeTag { tag })
    }

    pub fn contains(&self, tag: TypeTag) -> bool {
        self.factories.contains_key(&tag)
    }

    /// Registered tags in ascending order.
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<_> = self.factories.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

static GLOBAL: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();

/// The process-wide registry, seeded with the built-ins on first use.
pub fn global() -> &'static RwLock<TypeRegistry> {
    GLOBAL.get_or_init(|| RwLock::new(TypeRegistry::with_builtins()))
}

/// Register a kind in the process-wide registry.
///
/// Intended for startup, before concurrent decoding begins.
pub fn register_global(
    tag: TypeTag,
    factory: AttributeFactory,
) -> AttrResult<Option<AttributeFactory>> {
    let mut registry = global()
        .write()
        .map_err(|e| AttrError::RegistryPoisoned(e.to_string()))?;
    registry.register(tag, factory)
}

/// Run `f` with a read guard on the process-wide registry.
pub fn with_global<T>(f: impl FnOnce(&TypeRegistry) -> T) -> AttrResult<T> {
    let registry = global()
        .read()
        .map_err(|e| AttrError::RegistryPoisoned(e.to_string()))?;
    Ok(f(&registry))
}
