//! Justification Locator Module
//!
//! Scans the EVM chain's historical warp logs for the original outbound
//! registration message matching a target validator. The raw envelope bytes
//! of that message are the "justification" the signature-aggregation service
//! requires for later messages about the same validation.

use anyhow::Result;
use tracing::{debug, info};

use warp_codec::{AddressedCall, RegisterL1ValidatorMessage, UnsignedMessage};

use crate::abi;
use crate::access_list::WARP_PRECOMPILE_ADDRESS;
use crate::evm_client::EvmClient;

/// Event emitted by the warp precompile for every outbound message.
pub const SEND_WARP_MESSAGE_EVENT: &str = "SendWarpMessage(address,bytes32,bytes)";

/// Which validator a justification is being located for.
#[derive(Debug, Clone)]
pub enum JustificationTarget {
    /// Match on the raw node identifier carried in the registration payload.
    NodeId(Vec<u8>),
    /// Match on the validation identifier derived from the payload.
    ValidationId([u8; 32]),
}

impl std::fmt::Display for JustificationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JustificationTarget::NodeId(id) => write!(f, "node {}", hex::encode(id)),
            JustificationTarget::ValidationId(id) => {
                write!(f, "validation {}", hex::encode(id))
            }
        }
    }
}

/// Locates registration justifications in historical warp logs.
pub struct JustificationLocator<'a> {
    evm: &'a EvmClient,
}

impl<'a> JustificationLocator<'a> {
    pub fn new(evm: &'a EvmClient) -> Self {
        Self { evm }
    }

    /// Scans all warp logs for a registration message on `subnet_id` matching
    /// `target`, returning the original raw envelope bytes.
    ///
    /// Returns `Ok(None)` after scanning every log without a match — a
    /// blocking precondition failure for the caller, not a transient error.
    /// Malformed individual log entries are skipped, not fatal to the scan.
    pub async fn find_registration(
        &self,
        subnet_id: &[u8; 32],
        target: &JustificationTarget,
    ) -> Result<Option<Vec<u8>>> {
        let topic = abi::event_topic(SEND_WARP_MESSAGE_EVENT);
        info!("Scanning warp logs for justification ({})", target);

        let logs = self
            .evm
            .get_logs(WARP_PRECOMPILE_ADDRESS, &topic, "earliest", "latest")
            .await?;
        debug!("Scanning {} warp log(s)", logs.len());

        for log in &logs {
            let Some(envelope_bytes) = decode_log_message(&log.data) else {
                debug!("Skipping warp log with malformed data");
                continue;
            };

            let Some(register) = parse_registration(&envelope_bytes) else {
                continue;
            };

            if register.subnet_id != *subnet_id {
                continue;
            }

            let matched = match target {
                JustificationTarget::NodeId(node_id) => register.node_id == *node_id,
                JustificationTarget::ValidationId(validation_id) => {
                    register.validation_id() == *validation_id
                }
            };
            if matched {
                info!("Found justification for {}", target);
                return Ok(Some(envelope_bytes));
            }
        }

        info!("No justification found for {}", target);
        Ok(None)
    }
}

/// Decodes the ABI-encoded `bytes message` argument out of a warp log's data
/// field. Returns `None` on any malformed entry.
fn decode_log_message(data_hex: &str) -> Option<Vec<u8>> {
    let clean = data_hex.strip_prefix("0x").unwrap_or(data_hex);
    let data = hex::decode(clean).ok()?;
    abi::decode_single_bytes(&data)
}

/// Parses envelope -> addressed call -> registration payload, returning
/// `None` for messages of any other shape.
pub(crate) fn parse_registration(envelope_bytes: &[u8]) -> Option<RegisterL1ValidatorMessage> {
    let envelope = UnsignedMessage::parse(envelope_bytes).ok()?;
    let call = AddressedCall::parse(&envelope.payload).ok()?;
    RegisterL1ValidatorMessage::parse(&call.payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp_codec::PChainOwner;

    fn registration_envelope(node_id: &[u8]) -> (RegisterL1ValidatorMessage, Vec<u8>) {
        let register = RegisterL1ValidatorMessage::from_slices(
            &[1u8; 32],
            node_id,
            &[0xaau8; 48],
            99,
            PChainOwner::new(0, vec![]).unwrap(),
            PChainOwner::new(0, vec![]).unwrap(),
            5,
        )
        .unwrap();
        let call = AddressedCall::new(vec![], register.pack());
        let envelope = UnsignedMessage::new(5, [2u8; 32], call.pack());
        (register, envelope.pack())
    }

    #[test]
    fn parses_registration_out_of_envelope_bytes() {
        let (register, bytes) = registration_envelope(&[7u8; 20]);
        let parsed = parse_registration(&bytes).unwrap();
        assert_eq!(parsed.validation_id(), register.validation_id());
    }

    #[test]
    fn skips_non_registration_messages() {
        let weight = warp_codec::L1ValidatorWeightMessage::new([0u8; 32], 0, 1);
        let call = AddressedCall::new(vec![], weight.pack());
        let envelope = UnsignedMessage::new(5, [2u8; 32], call.pack());
        assert!(parse_registration(&envelope.pack()).is_none());
    }

    #[test]
    fn decodes_log_data_and_rejects_garbage() {
        let (_, bytes) = registration_envelope(&[7u8; 20]);
        let encoded = abi::encode_call("ignored()", &[abi::Token::Bytes(bytes.clone())]);
        // Log data has no selector; strip the 4 selector bytes.
        let data_hex = format!("0x{}", hex::encode(&encoded[4..]));
        assert_eq!(decode_log_message(&data_hex), Some(bytes));

        assert_eq!(decode_log_message("0xzz"), None);
        assert_eq!(decode_log_message("0x00"), None);
    }
}
