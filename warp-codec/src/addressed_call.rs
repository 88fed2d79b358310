//! Addressed Call Wrapper
//!
//! Identifies a logical call type and optional source address around a
//! payload. Layout (all big-endian):
//!
//! ```text
//! codecVersion        : u16 (= 0)
//! typeID              : u32 (= 1, "this is an addressed call")
//! sourceAddressLength : u32
//! sourceAddress       : sourceAddressLength bytes
//! payloadLength       : u32
//! payload             : payloadLength bytes
//! ```
//!
//! The wrapper-level type ID lives in a different space from the payload-level
//! type IDs that distinguish message kinds; the two are never compared.

use serde::{Deserialize, Serialize};

use crate::envelope::CODEC_VERSION;
use crate::error::CodecError;
use crate::reader::Reader;

/// Fixed type ID marking an addressed call.
pub const ADDRESSED_CALL_TYPE_ID: u32 = 1;

/// Minimum packed size: version + typeID + two empty length-prefixed fields.
pub const MIN_ADDRESSED_CALL_SIZE: usize = 2 + 4 + 4 + 4;

/// An addressed call: an optional source address around an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressedCall {
    /// Address of the logical sender; may be empty.
    pub source_address: Vec<u8>,
    /// Wrapped payload bytes (normally a packed lifecycle payload).
    pub payload: Vec<u8>,
}

impl AddressedCall {
    /// Wraps `payload` with the given source address.
    pub fn new(source_address: Vec<u8>, payload: Vec<u8>) -> Self {
        Self {
            source_address,
            payload,
        }
    }

    /// Serializes the wrapper to its exact byte layout.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            MIN_ADDRESSED_CALL_SIZE + self.source_address.len() + self.payload.len(),
        );
        out.extend_from_slice(&CODEC_VERSION.to_be_bytes());
        out.extend_from_slice(&ADDRESSED_CALL_TYPE_ID.to_be_bytes());
        out.extend_from_slice(&(self.source_address.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.source_address);
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses an addressed call, validating version, type ID, and that every
    /// declared length stays within the buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        CodecError::check_min(bytes, MIN_ADDRESSED_CALL_SIZE)?;
        let mut reader = Reader::new(bytes);

        let version = reader.read_u16()?;
        if version != CODEC_VERSION {
            return Err(CodecError::UnsupportedCodecVersion {
                expected: CODEC_VERSION,
                found: version,
            });
        }

        let type_id = reader.read_u32()?;
        if type_id != ADDRESSED_CALL_TYPE_ID {
            return Err(CodecError::UnexpectedTypeId {
                expected: ADDRESSED_CALL_TYPE_ID,
                found: type_id,
            });
        }

        let source_address = reader.read_len_prefixed()?.to_vec();
        let payload = reader.read_len_prefixed()?.to_vec();
        reader.finish()?;

        Ok(Self {
            source_address,
            payload,
        })
    }
}
