//! LEB128 variable-length integers used for string length prefixes.

use crate::error::{BufferError, BufferResult};

/// Maximum encoded width of a `u64` varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `buf` as an unsigned LEB128 varint.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from the front of `data`. Returns (value, bytes_consumed).
///
/// `offset` is only used to label errors with the absolute stream position.
pub fn decode_varint(data: &[u8], offset: usize) -> BufferResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        if shift >= 64 || (shift == 63 && byte & 0x7E != 0) {
            return Err(BufferError::VarintOverflow { offset: offset + i });
        }
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(BufferError::Truncated {
        needed: data.len() + 1,
        remaining: data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_values() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 0);
        encode_varint(&mut buf, 127);
        assert_eq!(buf, vec![0x00, 0x7F]);
    }

    #[test]
    fn multi_byte_value() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);
        assert_eq!(decode_varint(&buf, 0).unwrap(), (300, 2));
    }

    #[test]
    fn max_u64_fits_in_ten_bytes() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(decode_varint(&buf, 0).unwrap(), (u64::MAX, MAX_VARINT_LEN));
    }

    #[test]
    fn truncated_varint() {
        let err = decode_varint(&[0x80, 0x80], 0).unwrap_err();
        assert!(matches!(err, BufferError::Truncated { .. }));
    }

    #[test]
    fn overlong_varint_overflows() {
        let data = [0xFFu8; 11];
        let err = decode_varint(&data, 5).unwrap_err();
        assert!(matches!(err, BufferError::VarintOverflow { .. }));
    }
}
