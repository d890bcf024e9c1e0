//! Item-stack values: a quantity of some item or block plus free-form
//! attributes.

use attr_buffer::{WireReader, WireWrite};
use serde_json::{json, Value};

use crate::codec::{decode_entries, encode_entries, DecodeContext};
use crate::error::{AttrError, AttrResult};
use crate::resolver::{AssetLocation, ResolvedObject, Resolver, StackClass};
use crate::tree::TreeAttribute;

/// A stack of items or blocks.
///
/// Stacks built in code carry only their location. Decoded stacks also carry
/// the object the resolver found for that location.
#[derive(Clone, Debug)]
pub struct ItemStack {
    pub class: StackClass,
    pub location: AssetLocation,
    pub quantity: i32,
    pub attributes: TreeAttribute,
    resolved: Option<ResolvedObject>,
}

impl ItemStack {
    pub fn new(class: StackClass, location: AssetLocation, quantity: i32) -> Self {
        Self {
            class,
            location,
            quantity,
            attributes: TreeAttribute::new(),
            resolved: None,
        }
    }

    pub fn with_attributes(mut self, attributes: TreeAttribute) -> Self {
        self.attributes = attributes;
        self
    }

    /// The object this stack resolved to when it was decoded.
    pub fn resolved(&self) -> Option<&ResolvedObject> {
        self.resolved.as_ref()
    }

    /// Look the stack's object up through `resolver`.
    pub fn resolve(&self, resolver: &dyn Resolver) -> Option<ResolvedObject> {
        resolver.find_object_by_location(self.class, &self.location)
    }

    /// Write the stack body. The presence byte is the caller's concern.
    pub fn encode<W: WireWrite>(&self, out: &mut W) -> AttrResult<()> {
        if self.encode_head(out) {
            encode_entries(&self.attributes, out)?;
        }
        Ok(())
    }

    /// Class, location, quantity and the has-attributes flag. Returns the
    /// flag; the attributes themselves follow when it is set.
    pub(crate) fn encode_head<W: WireWrite>(&self, out: &mut W) -> bool {
        out.write_u8(self.class.to_byte());
        out.write_str(&self.location.to_string());
        out.write_i32(self.quantity);
        let has_attributes = !self.attributes.is_empty();
        out.write_bool(has_attributes);
        has_attributes
    }

    /// Read a stack body and resolve it.
    ///
    /// All of the stack's bytes are consumed before resolution, so a
    /// [`AttrError::MissingDomainReference`] leaves the reader positioned at
    /// the next value.
    pub fn decode(
        r: &mut WireReader<'_>,
        ctx: &DecodeContext<'_>,
        level: usize,
    ) -> AttrResult<Self> {
        let offset = r.position();
        let class_byte = r.read_u8()?;
        let class = StackClass::from_byte(class_byte).ok_or_else(|| AttrError::MalformedWire {
            offset,
            reason: format!("unknown item stack class {class_byte}"),
        })?;
        let location_offset = r.position();
        let location: AssetLocation = r
            .read_str()?
            .parse()
            .map_err(|_| AttrError::MalformedWire {
                offset: location_offset,
                reason: "item stack location has an empty path".into(),
            })?;
        let quantity = r.read_i32()?;
        let mut attributes = TreeAttribute::new();
        if r.read_bool()? {
            decode_entries(&mut attributes, r, ctx, level + 1)?;
        }

        let resolved = ctx
            .resolver()
            .and_then(|resolver| resolver.find_object_by_location(class, &location))
            .ok_or_else(|| AttrError::MissingDomainReference {
                location: location.to_string(),
            })?;

        Ok(Self {
            class,
            location,
            quantity,
            attributes,
            resolved: Some(resolved),
        })
    }

    /// Stack equality. With a resolver, two locations naming the same
    /// object are considered equal.
    pub fn value_equals(&self, resolver: Option<&dyn Resolver>, other: &ItemStack) -> bool {
        if self.class != other.class || self.quantity != other.quantity {
            return false;
        }
        let same_object = match resolver {
            Some(resolver) => match (self.resolve(resolver), other.resolve(resolver)) {
                (Some(a), Some(b)) => a.id == b.id,
                _ => self.location == other.location,
            },
            None => self.location == other.location,
        };
        same_object && self.attributes.equals(resolver, &other.attributes, &[])
    }

    pub fn to_json(&self) -> Value {
        json!({
            "class": self.class.to_string(),
            "location": self.location.to_string(),
            "quantity": self.quantity,
            "attributes": self.attributes.to_json(),
        })
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}x {} {} {}",
            self.quantity,
            self.class,
            self.location,
            self.attributes.to_text()
        )
    }
}

impl PartialEq for ItemStack {
    fn eq(&self, other: &Self) -> bool {
        self.value_equals(None, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::resolver::InMemoryResolver;
    use crate::value::Attribute;

    fn stick() -> AssetLocation {
        AssetLocation::new("game", "stick")
    }

    fn encoded(stack: &ItemStack) -> Vec<u8> {
        Attribute::from(stack.clone()).value_bytes().unwrap()
    }

    #[test]
    fn roundtrip_with_resolver() {
        let mut resolver = InMemoryResolver::new();
        let object = resolver.register(StackClass::Item, stick());
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry).with_resolver(&resolver);

        let mut extra = TreeAttribute::new();
        extra.set_int("durability", 40);
        let stack = ItemStack::new(StackClass::Item, stick(), 12).with_attributes(extra);

        let bytes = encoded(&stack);
        let mut value = Attribute::ItemStack(None);
        value
            .decode_value(&mut WireReader::new(&bytes), &ctx, 1)
            .unwrap();
        match value {
            Attribute::ItemStack(Some(decoded)) => {
                assert_eq!(decoded, stack);
                assert_eq!(decoded.resolved(), Some(&object));
                assert_eq!(decoded.attributes.get_int("durability"), Some(40));
            }
            other => panic!("expected a resolved stack, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_stack_is_unavailable_not_substituted() {
        let registry = TypeRegistry::with_builtins();
        let resolver = InMemoryResolver::new();
        let ctx = DecodeContext::new(&registry).with_resolver(&resolver);

        let mut bytes = encoded(&ItemStack::new(StackClass::Block, stick(), 1));
        bytes.extend_from_slice(&[7, 0, 0, 0]);
        let mut r = WireReader::new(&bytes);
        let mut value = Attribute::ItemStack(None);
        value.decode_value(&mut r, &ctx, 1).unwrap();
        assert!(matches!(value, Attribute::ItemStack(None)));
        // the stack body was consumed; the trailing int is next
        assert_eq!(r.read_i32().unwrap(), 7);
    }

    #[test]
    fn strict_decode_reports_missing_reference() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let stack = ItemStack::new(StackClass::Item, stick(), 1);
        let mut body = Vec::new();
        stack.encode(&mut body).unwrap();
        let err = ItemStack::decode(&mut WireReader::new(&body), &ctx, 1).unwrap_err();
        assert_eq!(
            err,
            AttrError::MissingDomainReference {
                location: "game:stick".into()
            }
        );
    }

    #[test]
    fn unknown_class_is_malformed() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let err = ItemStack::decode(&mut WireReader::new(&[5]), &ctx, 1).unwrap_err();
        assert!(err.is_malformed_wire());
    }

    #[test]
    fn resolver_equates_aliased_locations() {
        let mut resolver = InMemoryResolver::new();
        let target = resolver.register(StackClass::Item, stick());
        let old = AssetLocation::new("legacy", "stick");
        resolver.alias(StackClass::Item, old.clone(), &target);

        let a = ItemStack::new(StackClass::Item, stick(), 3);
        let b = ItemStack::new(StackClass::Item, old, 3);
        assert!(!a.value_equals(None, &b));
        assert!(a.value_equals(Some(&resolver), &b));
    }

    #[test]
    fn quantity_and_class_matter() {
        let a = ItemStack::new(StackClass::Item, stick(), 3);
        assert_ne!(a, ItemStack::new(StackClass::Item, stick(), 4));
        assert_ne!(a, ItemStack::new(StackClass::Block, stick(), 3));
    }
}
