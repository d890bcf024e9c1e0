//! Wire primitives for attribute trees.
//!
//! The attribute codec only depends on the narrow contract defined here:
//! an append-only sink with little-endian fixed-width writes, length-prefixed
//! strings and patch-in-place of reserved `u32` fields, plus a bounds-checked
//! reader over byte slices.
//!
//! # Key Types
//!
//! - [`WireWrite`] -- write trait implemented for `Vec<u8>` and `bytes::BytesMut`
//! - [`WireReader`] -- cursor over encoded bytes
//! - [`write_frame`] / [`read_frame`] -- checksummed snapshot framing

pub mod error;
pub mod frame;
pub mod read;
pub mod varint;
pub mod write;

pub use error::{BufferError, BufferResult};
pub use frame::{
    read_frame, read_frame_with_limit, write_frame, FrameOptions, FRAME_MAGIC, FRAME_VERSION,
    MAX_FRAME_BODY_LEN,
};
pub use read::WireReader;
pub use varint::{decode_varint, encode_varint};
pub use write::WireWrite;
