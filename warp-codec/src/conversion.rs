//! Subnet-to-L1 Conversion
//!
//! The conversion message (payload type 0) carries only the 32-byte
//! conversion identifier: the SHA-256 digest of the packed conversion data.
//! The digest is computed over the validator set sorted by raw node-ID bytes,
//! so it is reproducible bit-for-bit regardless of the order validators were
//! supplied in.

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use sha2::{Digest, Sha256};

use crate::envelope::CODEC_VERSION;
use crate::error::CodecError;
use crate::reader::Reader;

/// A validator record inside the conversion data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionValidator {
    /// Raw node identifier bytes (length-prefixed on the wire).
    pub node_id: Vec<u8>,
    #[serde(with = "BigArray")]
    pub bls_public_key: [u8; 48],
    pub weight: u64,
}

impl ConversionValidator {
    /// Creates a validator record from raw byte slices.
    pub fn from_slices(
        node_id: &[u8],
        bls_public_key: &[u8],
        weight: u64,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: node_id.to_vec(),
            bls_public_key: CodecError::fixed::<48>("bls public key", bls_public_key)?,
            weight,
        })
    }
}

/// The data hashed into a conversion identifier: which manager contract on
/// which chain now controls the subnet, and the initial validator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetToL1ConversionData {
    pub subnet_id: [u8; 32],
    pub manager_chain_id: [u8; 32],
    /// Manager contract address (length-prefixed on the wire).
    pub manager_address: Vec<u8>,
    pub validators: Vec<ConversionValidator>,
}

impl SubnetToL1ConversionData {
    /// Packs the conversion data with validators in canonical order: sorted
    /// lexicographically by raw node-ID bytes, shorter arrays first on a tie.
    /// This order is load-bearing — it changes the digest.
    pub fn pack(&self) -> Vec<u8> {
        let mut sorted: Vec<&ConversionValidator> = self.validators.iter().collect();
        sorted.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        let mut out = Vec::new();
        out.extend_from_slice(&CODEC_VERSION.to_be_bytes());
        out.extend_from_slice(&self.subnet_id);
        out.extend_from_slice(&self.manager_chain_id);
        out.extend_from_slice(&(self.manager_address.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.manager_address);
        out.extend_from_slice(&(sorted.len() as u32).to_be_bytes());
        for validator in sorted {
            out.extend_from_slice(&(validator.node_id.len() as u32).to_be_bytes());
            out.extend_from_slice(&validator.node_id);
            out.extend_from_slice(&validator.bls_public_key);
            out.extend_from_slice(&validator.weight.to_be_bytes());
        }
        out
    }

    /// The conversion identifier: SHA-256 over the canonically packed data.
    pub fn conversion_id(&self) -> [u8; 32] {
        Sha256::digest(self.pack()).into()
    }
}

/// Conversion message payload (type 0): just the conversion identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetToL1ConversionMessage {
    pub conversion_id: [u8; 32],
}

impl SubnetToL1ConversionMessage {
    pub const TYPE_ID: u32 = 0;
    pub const SIZE: usize = 2 + 4 + 32;

    pub fn new(conversion_id: [u8; 32]) -> Self {
        Self { conversion_id }
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&CODEC_VERSION.to_be_bytes());
        out.extend_from_slice(&Self::TYPE_ID.to_be_bytes());
        out.extend_from_slice(&self.conversion_id);
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        CodecError::check_min(bytes, Self::SIZE)?;
        let mut reader = Reader::new(bytes);

        let version = reader.read_u16()?;
        if version != CODEC_VERSION {
            return Err(CodecError::UnsupportedCodecVersion {
                expected: CODEC_VERSION,
                found: version,
            });
        }
        let type_id = reader.read_u32()?;
        if type_id != Self::TYPE_ID {
            return Err(CodecError::UnexpectedTypeId {
                expected: Self::TYPE_ID,
                found: type_id,
            });
        }

        let conversion_id = reader.read_fixed::<32>()?;
        reader.finish()?;

        Ok(Self { conversion_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(node_id: &[u8], weight: u64) -> ConversionValidator {
        ConversionValidator::from_slices(node_id, &[0xbb; 48], weight).unwrap()
    }

    #[test]
    fn digest_is_independent_of_input_order() {
        let a = validator(b"AAAA", 10);
        let b = validator(b"BBBB", 20);
        let c = validator(b"CCCC", 30);

        let shuffled = SubnetToL1ConversionData {
            subnet_id: [1u8; 32],
            manager_chain_id: [2u8; 32],
            manager_address: vec![0x33; 20],
            validators: vec![b.clone(), a.clone(), c.clone()],
        };
        let ordered = SubnetToL1ConversionData {
            validators: vec![a, b, c],
            ..shuffled.clone()
        };

        assert_eq!(shuffled.conversion_id(), ordered.conversion_id());
    }

    #[test]
    fn digest_changes_with_any_weight() {
        let base = SubnetToL1ConversionData {
            subnet_id: [1u8; 32],
            manager_chain_id: [2u8; 32],
            manager_address: vec![0x33; 20],
            validators: vec![validator(b"AAAA", 10), validator(b"BBBB", 20)],
        };
        let mut changed = base.clone();
        changed.validators[1].weight = 21;
        assert_ne!(base.conversion_id(), changed.conversion_id());
    }

    #[test]
    fn shorter_node_id_sorts_first_on_shared_prefix() {
        let short = validator(b"AA", 1);
        let long = validator(b"AAA", 2);
        let data = SubnetToL1ConversionData {
            subnet_id: [0u8; 32],
            manager_chain_id: [0u8; 32],
            manager_address: vec![],
            validators: vec![long.clone(), short.clone()],
        };
        let packed = data.pack();
        // First validator record starts after version + ids + empty address
        // length + count: 2 + 32 + 32 + 4 + 4 = 74. Its node-ID length must be
        // the shorter record's.
        let first_len = u32::from_be_bytes([packed[74], packed[75], packed[76], packed[77]]);
        assert_eq!(first_len, 2);
    }

    #[test]
    fn conversion_message_round_trips() {
        let msg = SubnetToL1ConversionMessage::new([7u8; 32]);
        assert_eq!(msg.pack().len(), 38);
        assert_eq!(SubnetToL1ConversionMessage::parse(&msg.pack()).unwrap(), msg);
    }
}
