//! Append-only write side of the wire buffer.

use bytes::BufMut;

use crate::error::{BufferError, BufferResult};
use crate::varint::{encode_varint, MAX_VARINT_LEN};

/// A growable byte sink for attribute encodings.
///
/// All multi-byte values are written little-endian. Strings are written as a
/// LEB128 byte length followed by the UTF-8 bytes. Fields whose value is only
/// known after later writes can be reserved with [`WireWrite::write_placeholder_u32`]
/// and filled in with [`WireWrite::patch_u32`].
///
/// Implemented for every `BufMut` that also exposes its written bytes, which
/// covers `Vec<u8>` and `bytes::BytesMut`.
pub trait WireWrite {
    /// Number of bytes written so far.
    fn position(&self) -> usize;

    fn write_u8(&mut self, value: u8);
    fn write_u16(&mut self, value: u16);
    fn write_i32(&mut self, value: i32);
    fn write_u32(&mut self, value: u32);
    fn write_i64(&mut self, value: i64);
    fn write_f32(&mut self, value: f32);
    fn write_f64(&mut self, value: f64);
    fn write_slice(&mut self, data: &[u8]);

    /// Write a boolean as a single `0` or `1` byte.
    fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Write an unsigned LEB128 varint.
    fn write_varint(&mut self, value: u64) {
        let mut tmp = Vec::with_capacity(MAX_VARINT_LEN);
        encode_varint(&mut tmp, value);
        self.write_slice(&tmp);
    }

    /// Write a length-prefixed UTF-8 string.
    fn write_str(&mut self, value: &str) {
        self.write_varint(value.len() as u64);
        self.write_slice(value.as_bytes());
    }

    /// Reserve four bytes for a `u32` and return their offset.
    fn write_placeholder_u32(&mut self) -> usize {
        let at = self.position();
        self.write_u32(0);
        at
    }

    /// Overwrite a previously written `u32` at `at`.
    fn patch_u32(&mut self, at: usize, value: u32) -> BufferResult<()>;
}

impl<B> WireWrite for B
where
    B: BufMut + AsRef<[u8]> + AsMut<[u8]>,
{
    fn position(&self) -> usize {
        self.as_ref().len()
    }

    fn write_u8(&mut self, value: u8) {
        self.put_u8(value);
    }

    fn write_u16(&mut self, value: u16) {
        self.put_u16_le(value);
    }

    fn write_i32(&mut self, value: i32) {
        self.put_i32_le(value);
    }

    fn write_u32(&mut self, value: u32) {
        self.put_u32_le(value);
    }

    fn write_i64(&mut self, value: i64) {
        self.put_i64_le(value);
    }

    fn write_f32(&mut self, value: f32) {
        self.put_f32_le(value);
    }

    fn write_f64(&mut self, value: f64) {
        self.put_f64_le(value);
    }

    fn write_slice(&mut self, data: &[u8]) {
        self.put_slice(data);
    }

    fn patch_u32(&mut self, at: usize, value: u32) -> BufferResult<()> {
        let len = self.as_ref().len();
        let end = at.checked_add(4).filter(|end| *end <= len).ok_or(
            BufferError::PatchOutOfBounds {
                at,
                width: 4,
                len,
            },
        )?;
        self.as_mut()[at..end].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}
