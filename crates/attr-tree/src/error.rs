use attr_buffer::BufferError;
use thiserror::Error;

use crate::tag::TypeTag;

/// Errors produced by attribute and tree operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttrError {
    /// Truncated or otherwise unreadable bytes.
    #[error("malformed wire data: {0}")]
    Buffer(#[from] BufferError),

    /// A tag with no registered factory was read.
    #[error("malformed wire data: unknown attribute type tag {tag}")]
    UnknownTypeTag { tag: TypeTag },

    #[error("malformed wire data at offset {offset}: {reason}")]
    MalformedWire { offset: usize, reason: String },

    /// `merge` found the same path holding different kinds on both sides.
    #[error("type mismatch merging {path}: destination holds tag {expected}, source holds tag {actual}")]
    TypeMismatchOnMerge {
        path: String,
        expected: TypeTag,
        actual: TypeTag,
    },

    /// The resolver could not find the object an item stack names.
    #[error("item stack references unknown object {location}")]
    MissingDomainReference { location: String },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("wrong type for {key}: expected tag {expected}, found tag {actual}")]
    WrongType {
        key: String,
        expected: TypeTag,
        actual: TypeTag,
    },

    #[error("{path} is not a tree attribute")]
    NotATree { path: String },

    #[error("type tag {0} is reserved")]
    ReservedTag(TypeTag),

    #[error("{kind} too large to encode: {len} (max {max})")]
    ValueTooLarge {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    #[error("type registry lock poisoned: {0}")]
    RegistryPoisoned(String),
}

impl AttrError {
    /// Returns `true` for errors caused by corrupt or truncated input bytes.
    pub fn is_malformed_wire(&self) -> bool {
        matches!(
            self,
            Self::Buffer(_) | Self::UnknownTypeTag { .. } | Self::MalformedWire { .. }
        )
    }
}

/// Convenience alias for attribute results.
pub type AttrResult<T> = Result<T, AttrError>;
