//! Bounds-checked read side of the wire buffer.

use bytes::Buf;

use crate::error::{BufferError, BufferResult};
use crate::varint::decode_varint;

/// Cursor over an encoded byte slice.
///
/// Every read checks the remaining length first, so truncated input surfaces
/// as [`BufferError::Truncated`] instead of a panic.
#[derive(Clone, Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            total: data.len(),
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.total - self.buf.remaining()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize) -> BufferResult<()> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(BufferError::Truncated { needed, remaining });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> BufferResult<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> BufferResult<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i32(&mut self) -> BufferResult<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_u32(&mut self) -> BufferResult<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i64(&mut self) -> BufferResult<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_f32(&mut self) -> BufferResult<f32> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_f64(&mut self) -> BufferResult<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Read a boolean byte. Any non-zero value is `true`.
    pub fn read_bool(&mut self) -> BufferResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an unsigned LEB128 varint.
    pub fn read_varint(&mut self) -> BufferResult<u64> {
        let (value, consumed) = decode_varint(self.buf, self.position())?;
        self.buf.advance(consumed);
        Ok(value)
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_slice(&mut self, len: usize) -> BufferResult<&'a [u8]> {
        self.ensure(len)?;
        let data: &'a [u8] = self.buf;
        let (head, tail) = data.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> BufferResult<String> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| BufferError::Truncated {
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        let offset = self.position();
        let bytes = self.read_slice(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| BufferError::InvalidUtf8 { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::WireWrite;

    #[test]
    fn reads_back_written_primitives() {
        let mut buf = Vec::new();
        buf.write_u8(7);
        buf.write_i32(-42);
        buf.write_i64(1 << 40);
        buf.write_f32(1.5);
        buf.write_f64(-2.25);
        buf.write_bool(true);
        buf.write_str("Zara");

        let mut r = WireReader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert_eq!(r.read_i64().unwrap(), 1 << 40);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_f64().unwrap(), -2.25);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_str().unwrap(), "Zara");
        assert!(r.is_empty());
        assert_eq!(r.position(), buf.len());
    }

    #[test]
    fn truncated_fixed_width_read() {
        let mut r = WireReader::new(&[1, 2, 3]);
        let err = r.read_i32().unwrap_err();
        assert_eq!(
            err,
            BufferError::Truncated {
                needed: 4,
                remaining: 3
            }
        );
        // A failed read does not consume anything.
        assert_eq!(r.remaining(), 3);
    }

    #[test]
    fn string_longer_than_input() {
        let mut r = WireReader::new(&[10, b'a', b'b']);
        assert!(matches!(
            r.read_str().unwrap_err(),
            BufferError::Truncated { needed: 10, .. }
        ));
    }

    #[test]
    fn invalid_utf8_is_reported_with_offset() {
        let mut r = WireReader::new(&[2, 0xC3, 0x28]);
        assert_eq!(
            r.read_str().unwrap_err(),
            BufferError::InvalidUtf8 { offset: 1 }
        );
    }

    #[test]
    fn read_slice_borrows_from_input() {
        let data = [1u8, 2, 3, 4];
        let mut r = WireReader::new(&data);
        assert_eq!(r.read_slice(3).unwrap(), &[1, 2, 3]);
        assert_eq!(r.position(), 3);
    }
}
