//! Validator Lifecycle Payloads
//!
//! The three typed payloads carried inside an addressed call, each prefixed
//! with the codec version (u16 = 0) and its own 4-byte payload type ID:
//!
//! - type 1: [`RegisterL1ValidatorMessage`] — registration request
//! - type 2: [`L1ValidatorRegistrationMessage`] — registration acknowledgement
//! - type 3: [`L1ValidatorWeightMessage`] — weight update
//!
//! Payload type IDs live in their own space, separate from the addressed-call
//! wrapper's type ID.

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use sha2::{Digest, Sha256};

use crate::envelope::CODEC_VERSION;
use crate::error::CodecError;
use crate::reader::Reader;

/// Size of the codec version + payload type ID header.
const PAYLOAD_HEADER_SIZE: usize = 2 + 4;

fn check_header(reader: &mut Reader, expected_type_id: u32) -> Result<(), CodecError> {
    let version = reader.read_u16()?;
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedCodecVersion {
            expected: CODEC_VERSION,
            found: version,
        });
    }
    let type_id = reader.read_u32()?;
    if type_id != expected_type_id {
        return Err(CodecError::UnexpectedTypeId {
            expected: expected_type_id,
            found: type_id,
        });
    }
    Ok(())
}

fn pack_header(out: &mut Vec<u8>, type_id: u32) {
    out.extend_from_slice(&CODEC_VERSION.to_be_bytes());
    out.extend_from_slice(&type_id.to_be_bytes());
}

// ============================================================================
// P-CHAIN OWNER
// ============================================================================

/// A threshold owner on the ledger chain: `threshold` of `addresses` must
/// sign. Packed as {threshold: u32, addressCount: u32, addresses: 20 bytes
/// each}, with no per-address length prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PChainOwner {
    pub threshold: u32,
    pub addresses: Vec<[u8; 20]>,
}

impl PChainOwner {
    /// Creates an owner, enforcing `threshold <= addresses.len()`.
    pub fn new(threshold: u32, addresses: Vec<[u8; 20]>) -> Result<Self, CodecError> {
        if threshold as usize > addresses.len() {
            return Err(CodecError::InvalidFieldSize {
                field: "owner threshold",
                expected: addresses.len(),
                actual: threshold as usize,
            });
        }
        Ok(Self {
            threshold,
            addresses,
        })
    }

    /// Creates an owner from raw 20-byte address slices.
    pub fn from_slices(threshold: u32, addresses: &[&[u8]]) -> Result<Self, CodecError> {
        let mut fixed = Vec::with_capacity(addresses.len());
        for addr in addresses {
            fixed.push(CodecError::fixed::<20>("owner address", addr)?);
        }
        Self::new(threshold, fixed)
    }

    fn packed_size(&self) -> usize {
        4 + 4 + self.addresses.len() * 20
    }

    fn pack_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.threshold.to_be_bytes());
        out.extend_from_slice(&(self.addresses.len() as u32).to_be_bytes());
        for addr in &self.addresses {
            out.extend_from_slice(addr);
        }
    }

    fn parse_from(reader: &mut Reader) -> Result<Self, CodecError> {
        let threshold = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        let mut addresses = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            addresses.push(reader.read_fixed::<20>()?);
        }
        Self::new(threshold, addresses)
    }
}

// ============================================================================
// REGISTER L1 VALIDATOR (type 1)
// ============================================================================

/// Registration request for a new validator, emitted by the EVM-style chain
/// and consumed by the ledger chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterL1ValidatorMessage {
    pub subnet_id: [u8; 32],
    /// Raw node identifier bytes (length-prefixed on the wire).
    pub node_id: Vec<u8>,
    #[serde(with = "BigArray")]
    pub bls_public_key: [u8; 48],
    /// Unix timestamp after which the registration request is void.
    pub expiry: u64,
    pub remaining_balance_owner: PChainOwner,
    pub disable_owner: PChainOwner,
    pub weight: u64,
}

impl RegisterL1ValidatorMessage {
    pub const TYPE_ID: u32 = 1;

    /// Minimum packed size: empty node ID and both owners empty.
    pub const MIN_SIZE: usize = PAYLOAD_HEADER_SIZE + 32 + 4 + 48 + 8 + 8 + 8 + 8;

    /// Creates a message from raw byte slices, validating fixed field sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn from_slices(
        subnet_id: &[u8],
        node_id: &[u8],
        bls_public_key: &[u8],
        expiry: u64,
        remaining_balance_owner: PChainOwner,
        disable_owner: PChainOwner,
        weight: u64,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            subnet_id: CodecError::fixed::<32>("subnet id", subnet_id)?,
            node_id: node_id.to_vec(),
            bls_public_key: CodecError::fixed::<48>("bls public key", bls_public_key)?,
            expiry,
            remaining_balance_owner,
            disable_owner,
            weight,
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            Self::MIN_SIZE
                + self.node_id.len()
                + self.remaining_balance_owner.packed_size()
                + self.disable_owner.packed_size(),
        );
        pack_header(&mut out, Self::TYPE_ID);
        out.extend_from_slice(&self.subnet_id);
        out.extend_from_slice(&(self.node_id.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.node_id);
        out.extend_from_slice(&self.bls_public_key);
        out.extend_from_slice(&self.expiry.to_be_bytes());
        self.remaining_balance_owner.pack_into(&mut out);
        self.disable_owner.pack_into(&mut out);
        out.extend_from_slice(&self.weight.to_be_bytes());
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        CodecError::check_min(bytes, Self::MIN_SIZE)?;
        let mut reader = Reader::new(bytes);
        check_header(&mut reader, Self::TYPE_ID)?;

        let subnet_id = reader.read_fixed::<32>()?;
        let node_id = reader.read_len_prefixed()?.to_vec();
        let bls_public_key = reader.read_fixed::<48>()?;
        let expiry = reader.read_u64()?;
        let remaining_balance_owner = PChainOwner::parse_from(&mut reader)?;
        let disable_owner = PChainOwner::parse_from(&mut reader)?;
        let weight = reader.read_u64()?;
        reader.finish()?;

        Ok(Self {
            subnet_id,
            node_id,
            bls_public_key,
            expiry,
            remaining_balance_owner,
            disable_owner,
            weight,
        })
    }

    /// The chain-assigned validation identifier for this registration: the
    /// SHA-256 digest of the packed payload.
    pub fn validation_id(&self) -> [u8; 32] {
        Sha256::digest(self.pack()).into()
    }
}

// ============================================================================
// L1 VALIDATOR REGISTRATION ACKNOWLEDGEMENT (type 2)
// ============================================================================

/// Registration acknowledgement emitted by the ledger chain: whether the
/// validation identifier is now registered. Fixed 39-byte layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1ValidatorRegistrationMessage {
    pub validation_id: [u8; 32],
    pub registered: bool,
}

impl L1ValidatorRegistrationMessage {
    pub const TYPE_ID: u32 = 2;
    pub const SIZE: usize = PAYLOAD_HEADER_SIZE + 32 + 1;

    pub fn new(validation_id: [u8; 32], registered: bool) -> Self {
        Self {
            validation_id,
            registered,
        }
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        pack_header(&mut out, Self::TYPE_ID);
        out.extend_from_slice(&self.validation_id);
        out.push(u8::from(self.registered));
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        CodecError::check_min(bytes, Self::SIZE)?;
        let mut reader = Reader::new(bytes);
        check_header(&mut reader, Self::TYPE_ID)?;

        let validation_id = reader.read_fixed::<32>()?;
        let flag = reader.read_u8()?;
        reader.finish()?;

        // Strict 0/1 so a re-pack always reproduces the input bytes.
        let registered = match flag {
            0 => false,
            1 => true,
            other => {
                return Err(CodecError::InvalidFieldSize {
                    field: "registered flag",
                    expected: 1,
                    actual: other as usize,
                })
            }
        };

        Ok(Self {
            validation_id,
            registered,
        })
    }
}

// ============================================================================
// L1 VALIDATOR WEIGHT (type 3)
// ============================================================================

/// Weight update for an active validator. Fixed 54-byte layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1ValidatorWeightMessage {
    pub validation_id: [u8; 32],
    /// Monotonic per-validation nonce ordering weight updates.
    pub nonce: u64,
    /// New weight; zero removes the validator.
    pub weight: u64,
}

impl L1ValidatorWeightMessage {
    pub const TYPE_ID: u32 = 3;
    pub const SIZE: usize = PAYLOAD_HEADER_SIZE + 32 + 8 + 8;

    pub fn new(validation_id: [u8; 32], nonce: u64, weight: u64) -> Self {
        Self {
            validation_id,
            nonce,
            weight,
        }
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        pack_header(&mut out, Self::TYPE_ID);
        out.extend_from_slice(&self.validation_id);
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.weight.to_be_bytes());
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        CodecError::check_min(bytes, Self::SIZE)?;
        let mut reader = Reader::new(bytes);
        check_header(&mut reader, Self::TYPE_ID)?;

        let validation_id = reader.read_fixed::<32>()?;
        let nonce = reader.read_u64()?;
        let weight = reader.read_u64()?;
        reader.finish()?;

        Ok(Self {
            validation_id,
            nonce,
            weight,
        })
    }
}
