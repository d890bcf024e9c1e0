use thiserror::Error;

/// Errors produced while writing or reading wire bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("varint overflow at offset {offset}")]
    VarintOverflow { offset: usize },

    #[error("patch at offset {at} (width {width}) is outside the written range of {len} bytes")]
    PatchOutOfBounds { at: usize, width: usize, len: usize },

    #[error("invalid frame magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u32),

    #[error("frame body length mismatch: header says {declared}, found {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("frame checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("frame body of {0} bytes does not fit a 32-bit length field")]
    BodyTooLarge(usize),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("decompressed frame body exceeds {limit} bytes")]
    DecompressedTooLarge { limit: usize },

    #[error("decompression failed: {0}")]
    Decompression(String),
}

/// Convenience alias used throughout the buffer crate.
pub type BufferResult<T> = Result<T, BufferError>;
