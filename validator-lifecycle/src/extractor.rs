//! Transaction Message Extractor Module
//!
//! Given a ledger transaction identifier, fetches the raw transaction,
//! locates the embedded warp message bytes, and decodes them through all
//! three codec layers (envelope, addressed call, typed payload). Every
//! structural violation is reported with the stage it occurred in so an
//! operator can tell a malformed on-chain message apart from a client bug.

use thiserror::Error;
use tracing::info;

use warp_codec::{
    AddressedCall, CodecError, L1ValidatorRegistrationMessage, L1ValidatorWeightMessage,
    RegisterL1ValidatorMessage, SubnetToL1ConversionMessage, UnsignedMessage,
};

use crate::pchain_client::PChainClient;

// ============================================================================
// EXTRACTION RESULTS AND ERRORS
// ============================================================================

/// A fully decoded warp message: envelope fields, addressed-call source, and
/// the typed payload, alongside the exact original envelope bytes (which
/// downstream signature aggregation requires verbatim).
#[derive(Debug, Clone)]
pub struct ExtractedWarpMessage {
    pub network_id: u32,
    pub source_chain_id: [u8; 32],
    pub source_address: Vec<u8>,
    pub payload: ExtractedPayload,
    /// The original packed envelope, byte for byte.
    pub raw: Vec<u8>,
}

/// The typed payload found inside an extracted message.
#[derive(Debug, Clone)]
pub enum ExtractedPayload {
    Conversion(SubnetToL1ConversionMessage),
    Register(RegisterL1ValidatorMessage),
    RegistrationAck(L1ValidatorRegistrationMessage),
    Weight(L1ValidatorWeightMessage),
}

/// Errors from fetching and decoding an embedded warp message.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The transaction exists but carries no warp message field.
    #[error("transaction {tx_id} does not carry a warp message")]
    NotAWarpCarryingTransaction { tx_id: String },

    /// The outer envelope failed to parse.
    #[error("envelope stage: {0}")]
    Envelope(CodecError),

    /// The addressed-call wrapper failed to parse.
    #[error("addressed-call stage: {0}")]
    AddressedCall(CodecError),

    /// The typed payload failed to parse.
    #[error("payload stage: {0}")]
    Payload(CodecError),

    /// The payload declared a type ID no parser handles.
    #[error("unknown payload type id {type_id}")]
    UnknownPayloadType { type_id: u32 },

    /// The underlying RPC fetch failed.
    #[error("rpc failure: {0}")]
    Rpc(#[from] anyhow::Error),
}

// ============================================================================
// MESSAGE EXTRACTOR
// ============================================================================

/// Extracts embedded warp messages out of ledger transactions.
pub struct MessageExtractor<'a> {
    pchain: &'a PChainClient,
}

impl<'a> MessageExtractor<'a> {
    pub fn new(pchain: &'a PChainClient) -> Self {
        Self { pchain }
    }

    /// Fetches the transaction and decodes its embedded warp message.
    ///
    /// Pure fetch plus decode — no side effects, safe to retry.
    pub async fn extract_from_tx(
        &self,
        tx_id: &str,
    ) -> Result<ExtractedWarpMessage, ExtractionError> {
        info!("Extracting warp message from ledger transaction {}", tx_id);

        let bytes = self
            .pchain
            .get_tx_warp_message(tx_id)
            .await?
            .ok_or_else(|| ExtractionError::NotAWarpCarryingTransaction {
                tx_id: tx_id.to_string(),
            })?;

        decode_warp_message(&bytes)
    }
}

/// Decodes raw envelope bytes through all three codec layers, dispatching on
/// the payload type ID.
pub fn decode_warp_message(bytes: &[u8]) -> Result<ExtractedWarpMessage, ExtractionError> {
    let envelope = UnsignedMessage::parse(bytes).map_err(ExtractionError::Envelope)?;
    let call = AddressedCall::parse(&envelope.payload).map_err(ExtractionError::AddressedCall)?;
    let payload = decode_payload(&call.payload)?;

    Ok(ExtractedWarpMessage {
        network_id: envelope.network_id,
        source_chain_id: envelope.source_chain_id,
        source_address: call.source_address,
        payload,
        raw: bytes.to_vec(),
    })
}

/// Dispatches payload bytes to the matching typed parser.
fn decode_payload(bytes: &[u8]) -> Result<ExtractedPayload, ExtractionError> {
    // The type ID sits after the 2-byte codec version.
    if bytes.len() < 6 {
        return Err(ExtractionError::Payload(CodecError::TooShort {
            minimum: 6,
            actual: bytes.len(),
        }));
    }
    let type_id = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);

    let payload = match type_id {
        SubnetToL1ConversionMessage::TYPE_ID => ExtractedPayload::Conversion(
            SubnetToL1ConversionMessage::parse(bytes).map_err(ExtractionError::Payload)?,
        ),
        RegisterL1ValidatorMessage::TYPE_ID => ExtractedPayload::Register(
            RegisterL1ValidatorMessage::parse(bytes).map_err(ExtractionError::Payload)?,
        ),
        L1ValidatorRegistrationMessage::TYPE_ID => ExtractedPayload::RegistrationAck(
            L1ValidatorRegistrationMessage::parse(bytes).map_err(ExtractionError::Payload)?,
        ),
        L1ValidatorWeightMessage::TYPE_ID => ExtractedPayload::Weight(
            L1ValidatorWeightMessage::parse(bytes).map_err(ExtractionError::Payload)?,
        ),
        other => return Err(ExtractionError::UnknownPayloadType { type_id: other }),
    };
    Ok(payload)
}
