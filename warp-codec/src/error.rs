//! Codec Error Types
//!
//! Typed errors for every expected malformed-input case. Codec errors are
//! always fatal to the operation that hit them and are surfaced verbatim to
//! the caller; the variants carry the observed sizes and identifiers so an
//! operator can tell a malformed on-chain message apart from a client bug.

use thiserror::Error;

/// Errors produced by packing and parsing warp message structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer is shorter than the structure's minimum fixed size.
    #[error("buffer too short: need at least {minimum} bytes, got {actual}")]
    TooShort { minimum: usize, actual: usize },

    /// The leading 2-byte codec version is not the supported version.
    #[error("unsupported codec version {found} (expected {expected})")]
    UnsupportedCodecVersion { expected: u16, found: u16 },

    /// The 4-byte type identifier does not match the structure being parsed.
    #[error("unexpected type id {found} (expected {expected})")]
    UnexpectedTypeId { expected: u32, found: u32 },

    /// A caller-supplied fixed-width field has the wrong size, or a parsed
    /// field holds a value outside its fixed domain.
    #[error("invalid size for field '{field}': expected {expected}, got {actual}")]
    InvalidFieldSize {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A declared length field does not line up with the bytes actually
    /// present: either trailing garbage after the structure or a length
    /// prefix that overruns the buffer.
    #[error("declared length {declared} does not match available bytes {available}")]
    TrailingOrMissingBytes { declared: usize, available: usize },
}

impl CodecError {
    /// Checks that `buf` holds at least `minimum` bytes.
    pub(crate) fn check_min(buf: &[u8], minimum: usize) -> Result<(), CodecError> {
        if buf.len() < minimum {
            return Err(CodecError::TooShort {
                minimum,
                actual: buf.len(),
            });
        }
        Ok(())
    }

    /// Converts a byte slice into a fixed array, reporting the field name on
    /// mismatch.
    pub(crate) fn fixed<const N: usize>(
        field: &'static str,
        bytes: &[u8],
    ) -> Result<[u8; N], CodecError> {
        if bytes.len() != N {
            return Err(CodecError::InvalidFieldSize {
                field,
                expected: N,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
