//! Unsigned Message Envelope
//!
//! The outermost versioned wrapper carried between the two chains. Layout
//! (all big-endian):
//!
//! ```text
//! codecVersion   : u16 (= 0)
//! networkID      : u32
//! sourceChainID  : 32 bytes
//! messageLength  : u32
//! message        : messageLength bytes
//! ```
//!
//! The minimum packed size is 42 bytes (empty inner message).

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::reader::Reader;

/// The single supported codec version for every structure in this crate.
pub const CODEC_VERSION: u16 = 0;

/// Minimum packed envelope size: version + networkID + sourceChainID + length.
pub const MIN_ENVELOPE_SIZE: usize = 2 + 4 + 32 + 4;

/// An unsigned warp message envelope: network and source-chain identifiers
/// around an opaque inner payload (normally a packed addressed call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedMessage {
    /// Identifier of the network the message belongs to (test = 5, production = 1).
    pub network_id: u32,
    /// Identifier of the chain the message originates from.
    pub source_chain_id: [u8; 32],
    /// Inner message bytes.
    pub payload: Vec<u8>,
}

impl UnsignedMessage {
    /// Wraps `payload` in an envelope for the given network and source chain.
    pub fn new(network_id: u32, source_chain_id: [u8; 32], payload: Vec<u8>) -> Self {
        Self {
            network_id,
            source_chain_id,
            payload,
        }
    }

    /// Serializes the envelope to its exact byte layout. Infallible: every
    /// fixed-width field is a fixed array.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_ENVELOPE_SIZE + self.payload.len());
        out.extend_from_slice(&CODEC_VERSION.to_be_bytes());
        out.extend_from_slice(&self.network_id.to_be_bytes());
        out.extend_from_slice(&self.source_chain_id);
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses an envelope, validating minimum length, codec version, and that
    /// the declared inner length consumes the buffer exactly.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        CodecError::check_min(bytes, MIN_ENVELOPE_SIZE)?;
        let mut reader = Reader::new(bytes);

        let version = reader.read_u16()?;
        if version != CODEC_VERSION {
            return Err(CodecError::UnsupportedCodecVersion {
                expected: CODEC_VERSION,
                found: version,
            });
        }

        let network_id = reader.read_u32()?;
        let source_chain_id = reader.read_fixed::<32>()?;
        let payload = reader.read_len_prefixed()?.to_vec();
        reader.finish()?;

        Ok(Self {
            network_id,
            source_chain_id,
            payload,
        })
    }
}
