//! Stable numeric type tags carried on the wire.
//!
//! The tag is the only type information transmitted for each entry; decoders
//! map it back to a value kind through the [`TypeRegistry`](crate::TypeRegistry).

/// A wire type tag.
pub type TypeTag = u8;

/// Terminates the entry list of an encoded tree. Never assigned to a kind.
pub const SENTINEL: TypeTag = 0;

pub const INT: TypeTag = 1;
pub const LONG: TypeTag = 2;
pub const DOUBLE: TypeTag = 3;
pub const FLOAT: TypeTag = 4;
pub const STRING: TypeTag = 5;
pub const TREE: TypeTag = 6;
pub const ITEM_STACK: TypeTag = 7;
pub const BYTES: TypeTag = 8;
pub const BOOL: TypeTag = 9;
pub const STRING_ARRAY: TypeTag = 10;
pub const INT_ARRAY: TypeTag = 11;
pub const FLOAT_ARRAY: TypeTag = 12;
pub const DOUBLE_ARRAY: TypeTag = 13;
pub const TREE_ARRAY: TypeTag = 14;
pub const LONG_ARRAY: TypeTag = 15;
pub const BOOL_ARRAY: TypeTag = 16;

/// Every built-in tag, in ascending order.
pub const BUILTIN_TAGS: [TypeTag; 16] = [
    INT,
    LONG,
    DOUBLE,
    FLOAT,
    STRING,
    TREE,
    ITEM_STACK,
    BYTES,
    BOOL,
    STRING_ARRAY,
    INT_ARRAY,
    FLOAT_ARRAY,
    DOUBLE_ARRAY,
    TREE_ARRAY,
    LONG_ARRAY,
    BOOL_ARRAY,
];

/// Human-readable name of a built-in tag.
pub fn tag_name(tag: TypeTag) -> &'static str {
    match tag {
        SENTINEL => "sentinel",
        INT => "int",
        LONG => "long",
        DOUBLE => "double",
        FLOAT => "float",
        STRING => "string",
        TREE => "tree",
        ITEM_STACK => "itemstack",
        BYTES => "bytes",
        BOOL => "bool",
        STRING_ARRAY => "string[]",
        INT_ARRAY => "int[]",
        FLOAT_ARRAY => "float[]",
        DOUBLE_ARRAY => "double[]",
        TREE_ARRAY => "tree[]",
        LONG_ARRAY => "long[]",
        BOOL_ARRAY => "bool[]",
        _ => "custom",
    }
}
