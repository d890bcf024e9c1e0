//! Snapshot framing for persisting an encoded tree as a single blob.
//!
//! On-disk layout:
//! ```text
//! [4 bytes: magic "ATRF"]
//! [4 bytes: version (little-endian u32)]
//! [1 byte:  flags (bit 0 = zstd-compressed body)]
//! [4 bytes: stored body length (little-endian u32)]
//! [4 bytes: CRC32 of stored body (little-endian u32)]
//! [N bytes: stored body]
//! ```
//!
//! The length and CRC are reserved as placeholders and patched once the
//! (possibly compressed) body has been written.

use std::io::Read;

use bytes::BytesMut;
use tracing::debug;

use crate::error::{BufferError, BufferResult};
use crate::read::WireReader;
use crate::write::WireWrite;

/// Magic bytes at the start of every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"ATRF";

/// Current frame format version.
pub const FRAME_VERSION: u32 = 1;

/// Size of the fixed frame header in bytes.
pub const FRAME_HEADER_LEN: usize = 17;

/// Largest body [`read_frame`] will inflate a compressed frame to.
pub const MAX_FRAME_BODY_LEN: usize = 256 * 1024 * 1024;

const FLAG_ZSTD: u8 = 0x01;

/// Options controlling how a frame body is stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameOptions {
    /// Compress the body with zstd.
    pub compress: bool,
    /// zstd compression level (ignored when `compress` is false).
    pub level: i32,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            compress: false,
            level: 3,
        }
    }
}

impl FrameOptions {
    /// Options with zstd compression enabled at the default level.
    pub fn compressed() -> Self {
        Self {
            compress: true,
            ..Default::default()
        }
    }
}

/// Wrap `body` in a frame.
pub fn write_frame(body: &[u8], options: &FrameOptions) -> BufferResult<Vec<u8>> {
    let stored = if options.compress {
        zstd::encode_all(body, options.level)
            .map_err(|e| BufferError::Compression(e.to_string()))?
    } else {
        body.to_vec()
    };
    let stored_len =
        u32::try_from(stored.len()).map_err(|_| BufferError::BodyTooLarge(stored.len()))?;

    let mut out = BytesMut::with_capacity(FRAME_HEADER_LEN + stored.len());
    out.write_slice(&FRAME_MAGIC);
    out.write_u32(FRAME_VERSION);
    out.write_u8(if options.compress { FLAG_ZSTD } else { 0 });
    let len_at = out.write_placeholder_u32();
    let crc_at = out.write_placeholder_u32();
    out.write_slice(&stored);

    out.patch_u32(len_at, stored_len)?;
    out.patch_u32(crc_at, crc32fast::hash(&stored))?;

    debug!(
        body = body.len(),
        stored = stored.len(),
        compressed = options.compress,
        "frame written"
    );
    Ok(out.to_vec())
}

/// Validate a frame and return its decompressed body, inflating at most
/// [`MAX_FRAME_BODY_LEN`] bytes.
pub fn read_frame(data: &[u8]) -> BufferResult<Vec<u8>> {
    read_frame_with_limit(data, MAX_FRAME_BODY_LEN)
}

/// [`read_frame`] with an explicit cap on the decompressed body size.
pub fn read_frame_with_limit(data: &[u8], limit: usize) -> BufferResult<Vec<u8>> {
    let mut r = WireReader::new(data);
    let magic = r.read_slice(4)?;
    if magic != FRAME_MAGIC {
        let mut actual = [0u8; 4];
        actual.copy_from_slice(magic);
        return Err(BufferError::InvalidMagic {
            expected: FRAME_MAGIC,
            actual,
        });
    }
    let version = r.read_u32()?;
    if version != FRAME_VERSION {
        return Err(BufferError::UnsupportedVersion(version));
    }
    let flags = r.read_u8()?;
    let declared = r.read_u32()? as usize;
    let expected_crc = r.read_u32()?;

    if r.remaining() != declared {
        return Err(BufferError::LengthMismatch {
            declared,
            actual: r.remaining(),
        });
    }
    let stored = r.read_slice(declared)?;

    let actual_crc = crc32fast::hash(stored);
    if actual_crc != expected_crc {
        return Err(BufferError::ChecksumMismatch {
            expected: expected_crc,
            actual: actual_crc,
        });
    }

    if flags & FLAG_ZSTD != 0 {
        inflate(stored, limit)
    } else {
        Ok(stored.to_vec())
    }
}

fn inflate(stored: &[u8], limit: usize) -> BufferResult<Vec<u8>> {
    let decoder = zstd::stream::read::Decoder::new(stored)
        .map_err(|e| BufferError::Decompression(e.to_string()))?;
    let mut body = Vec::new();
    decoder
        .take(limit as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| BufferError::Decompression(e.to_string()))?;
    if body.len() > limit {
        return Err(BufferError::DecompressedTooLarge { limit });
    }
    Ok(body)
}
