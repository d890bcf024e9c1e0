//! Domain object resolution for item-stack values.
//!
//! Item stacks name the item or block they hold by an [`AssetLocation`]. Turning
//! that name back into a live object is the job of a [`Resolver`] supplied by
//! the caller; this crate never looks objects up on its own.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AttrError;

/// Domain assumed when a location string carries no `domain:` prefix.
pub const DEFAULT_DOMAIN: &str = "game";

/// Whether a stack holds an item or a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StackClass {
    Item,
    Block,
}

impl StackClass {
    /// Wire discriminator.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Item => 0,
            Self::Block => 1,
        }
    }

    /// Parse a wire discriminator.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Item),
            1 => Some(Self::Block),
            _ => None,
        }
    }
}

impl fmt::Display for StackClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// A `domain:path` name for a domain object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetLocation {
    pub domain: String,
    pub path: String,
}

impl AssetLocation {
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.path)
    }
}

impl FromStr for AssetLocation {
    type Err = AttrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, path) = s.split_once(':').unwrap_or((DEFAULT_DOMAIN, s));
        if path.is_empty() {
            return Err(AttrError::MalformedWire {
                offset: 0,
                reason: format!("asset location {s:?} has an empty path"),
            });
        }
        Ok(Self::new(domain, path))
    }
}

/// A live object a resolver found for an asset location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedObject {
    pub class: StackClass,
    /// Numeric id of the object in the caller's registry.
    pub id: i32,
    pub location: AssetLocation,
}

/// Capability to look up domain objects by location.
pub trait Resolver {
    /// Find the object named by `location`, or `None` if it does not exist.
    fn find_object_by_location(
        &self,
        class: StackClass,
        location: &AssetLocation,
    ) -> Option<ResolvedObject>;
}

/// A [`Resolver`] backed by a `HashMap`, for tools and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryResolver {
    objects: HashMap<(StackClass, AssetLocation), i32>,
    next_id: i32,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object and return its resolved form. Re-registering a
    /// location returns the existing id.
    pub fn register(&mut self, class: StackClass, location: AssetLocation) -> ResolvedObject {
        let next_id = &mut self.next_id;
        let id = *self
            .objects
            .entry((class, location.clone()))
            .or_insert_with(|| {
                *next_id += 1;
                *next_id
            });
        ResolvedObject {
            class,
            id,
            location,
        }
    }

    /// Register an alias: `location` resolves to the same id as `target`.
    pub fn alias(&mut self, class: StackClass, location: AssetLocation, target: &ResolvedObject) {
        self.objects.insert((class, location), target.id);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Resolver for InMemoryResolver {
    fn find_object_by_location(
        &self,
        class: StackClass,
        location: &AssetLocation,
    ) -> Option<ResolvedObject> {
        self.objects
            .get(&(class, location.clone()))
            .map(|&id| ResolvedObject {
                class,
                id,
                location: location.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_parses_domain_and_path() {
        let loc: AssetLocation = "game:stick".parse().unwrap();
        assert_eq!(loc, AssetLocation::new("game", "stick"));
        assert_eq!(loc.to_string(), "game:stick");
    }

    #[test]
    fn location_without_domain_uses_default() {
        let loc: AssetLocation = "plank-oak".parse().unwrap();
        assert_eq!(loc.domain, DEFAULT_DOMAIN);
        assert_eq!(loc.path, "plank-oak");
    }

    #[test]
    fn location_with_empty_path_is_rejected() {
        assert!("game:".parse::<AssetLocation>().is_err());
    }

    #[test]
    fn class_byte_roundtrip() {
        for class in [StackClass::Item, StackClass::Block] {
            assert_eq!(StackClass::from_byte(class.to_byte()), Some(class));
        }
        assert_eq!(StackClass::from_byte(9), None);
    }

    #[test]
    fn in_memory_resolver_assigns_stable_ids() {
        let mut resolver = InMemoryResolver::new();
        let a = resolver.register(StackClass::Item, AssetLocation::new("game", "stick"));
        let b = resolver.register(StackClass::Block, AssetLocation::new("game", "rock"));
        let again = resolver.register(StackClass::Item, AssetLocation::new("game", "stick"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.id, again.id);
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn resolver_distinguishes_class() {
        let mut resolver = InMemoryResolver::new();
        resolver.register(StackClass::Item, AssetLocation::new("game", "torch"));
        let loc = AssetLocation::new("game", "torch");
        assert!(resolver
            .find_object_by_location(StackClass::Item, &loc)
            .is_some());
        assert!(resolver
            .find_object_by_location(StackClass::Block, &loc)
            .is_none());
    }

    #[test]
    fn alias_resolves_to_target_id() {
        let mut resolver = InMemoryResolver::new();
        let target = resolver.register(StackClass::Item, AssetLocation::new("game", "flint"));
        resolver.alias(StackClass::Item, AssetLocation::new("old", "flint"), &target);
        let found = resolver
            .find_object_by_location(StackClass::Item, &AssetLocation::new("old", "flint"))
            .unwrap();
        assert_eq!(found.id, target.id);
    }
}
