//! Polymorphic attribute trees.
//!
//! A [`TreeAttribute`] is a string-keyed map of typed [`Attribute`] values,
//! one of which is another tree. Trees encode to a self-describing binary
//! form in which every entry carries a one-byte type tag; decoding maps the
//! tag back to a kind through a [`TypeRegistry`].
//!
//! # Key Types
//!
//! - [`Attribute`] / [`CustomAttribute`] -- value kinds, built-in and registered
//! - [`TreeAttribute`] -- the container, with typed and path accessors
//! - [`TypeRegistry`] -- tag to factory table, plus the process-wide instance
//! - [`DecodeContext`] -- registry, resolver and depth ceiling for a decode
//! - [`ItemStack`] / [`Resolver`] -- stack values and object lookup
//! - [`SortedTree`] -- key-ordered view for deterministic bytes
//! - [`TreeDiff`] / [`TreeChange`] -- structural differences between trees

pub mod codec;
pub mod compare;
pub mod diff;
pub mod error;
pub mod item_stack;
pub mod merge;
pub mod registry;
pub mod resolver;
pub mod sorted;
pub mod tag;
pub mod tree;
pub mod value;

pub use codec::{decode_tagged, encode_tagged, DecodeContext, MAX_DECODE_DEPTH};
pub use compare::{add_ignored_attribute, ignored_attributes, IgnoredAttributes};
pub use diff::{diff_trees, TreeChange, TreeDiff};
pub use error::{AttrError, AttrResult};
pub use item_stack::ItemStack;
pub use registry::{register_global, with_global, AttributeFactory, TypeRegistry};
pub use resolver::{AssetLocation, InMemoryResolver, ResolvedObject, Resolver, StackClass};
pub use sorted::{SortedTree, SortedValue};
pub use tag::TypeTag;
pub use tree::{TreeAttribute, PATH_SEPARATOR};
pub use value::{Attribute, CustomAttribute};
