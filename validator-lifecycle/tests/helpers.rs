//! Shared test helpers for integration tests
//!
//! This module provides helper functions used by the test files:
//! - **Configuration builders**: test configs pointing at mock servers
//! - **Envelope builders**: packed warp messages for both flow directions
//! - **Mock helpers**: JSON-RPC response mounting and log entry construction

use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use validator_lifecycle::access_list::WARP_PRECOMPILE_ADDRESS;
use validator_lifecycle::config::{
    AggregatorConfig, Config, EvmChainConfig, NetworkKind, PChainConfig, WalletConfig,
};
use validator_lifecycle::justification::SEND_WARP_MESSAGE_EVENT;
use validator_lifecycle::{abi, LedgerWallet};
use warp_codec::{
    AddressedCall, L1ValidatorRegistrationMessage, PChainOwner, RegisterL1ValidatorMessage,
    UnsignedMessage,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Well-known test private key (secp256k1 scalar 1).
pub const DUMMY_PRIVATE_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000001";

/// Ethereum address derived from `DUMMY_PRIVATE_KEY`.
pub const CALLER_ADDRESS: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

/// Dummy validator-manager contract address.
pub const DUMMY_MANAGER_ADDR: &str = "0x00000000000000000000000000000000000000aa";

/// Dummy EVM transaction hash.
pub const DUMMY_TX_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000123";

/// Dummy ledger transaction identifier.
pub const DUMMY_LEDGER_TX_ID: &str = "2fZcy5WLN7KcNqhvFvX8mDvJGcuNBvUjMQTYQ9XnLm6H7Gq4vR";

/// Subnet identifier used across the tests.
pub fn test_subnet_id() -> [u8; 32] {
    [0x11u8; 32]
}

/// Node identifier used across the tests (raw 20-byte form).
pub fn test_node_id() -> Vec<u8> {
    vec![0x01u8; 20]
}

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Builds a config pointing every endpoint at the given mock server URLs.
pub fn build_test_config(evm_url: &str, pchain_url: &str, aggregator_url: &str) -> Config {
    Config {
        network: NetworkKind::Testnet,
        evm_chain: EvmChainConfig {
            rpc_url: evm_url.to_string(),
            chain_id: 43113,
            validator_manager_address: DUMMY_MANAGER_ADDR.to_string(),
            subnet_id: format!("0x{}", hex::encode(test_subnet_id())),
        },
        pchain: PChainConfig {
            rpc_url: pchain_url.to_string(),
        },
        aggregator: AggregatorConfig {
            url: aggregator_url.to_string(),
            quorum_percentage: 67,
            signing_subnet_id: None,
        },
        wallet: WalletConfig {
            private_key: DUMMY_PRIVATE_KEY.to_string(),
        },
    }
}

// ============================================================================
// ENVELOPE BUILDERS
// ============================================================================

/// Builds a packed registration envelope for the test subnet and node,
/// returning the payload and the envelope bytes.
pub fn registration_envelope() -> (RegisterL1ValidatorMessage, Vec<u8>) {
    let register = RegisterL1ValidatorMessage::from_slices(
        &test_subnet_id(),
        &test_node_id(),
        &[0xaau8; 48],
        1000,
        PChainOwner::new(0, vec![]).unwrap(),
        PChainOwner::new(0, vec![]).unwrap(),
        500,
    )
    .unwrap();
    let call = AddressedCall::new(vec![], register.pack());
    let envelope = UnsignedMessage::new(5, [0x22u8; 32], call.pack());
    (register, envelope.pack())
}

/// Builds a packed registration-acknowledgement envelope for a validation.
pub fn registration_ack_envelope(validation_id: [u8; 32]) -> Vec<u8> {
    let ack = L1ValidatorRegistrationMessage::new(validation_id, true);
    let call = AddressedCall::new(vec![], ack.pack());
    UnsignedMessage::new(5, [0x33u8; 32], call.pack()).pack()
}

// ============================================================================
// MOCK HELPERS
// ============================================================================

/// ABI-encodes a single dynamic `bytes` value the way event data carries it:
/// offset word, length word, padded payload.
pub fn encode_single_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut word = [0u8; 32];
    word[31] = 32;
    out.extend_from_slice(&word);
    let mut len_word = [0u8; 32];
    len_word[24..32].copy_from_slice(&(data.len() as u64).to_be_bytes());
    out.extend_from_slice(&len_word);
    out.extend_from_slice(data);
    while out.len() % 32 != 0 {
        out.push(0);
    }
    out
}

/// Builds an `eth_getLogs`-shaped warp precompile log entry carrying the
/// given envelope bytes.
pub fn warp_log_json(envelope_bytes: &[u8]) -> serde_json::Value {
    json!({
        "address": WARP_PRECOMPILE_ADDRESS,
        "topics": [abi::event_topic(SEND_WARP_MESSAGE_EVENT)],
        "data": format!("0x{}", hex::encode(encode_single_bytes(envelope_bytes))),
        "transactionHash": DUMMY_TX_HASH,
    })
}

/// Wraps a result value in a JSON-RPC success envelope.
pub fn rpc_result(result: serde_json::Value) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result,
    })
}

/// Mounts a mock answering every JSON-RPC request for `rpc_method` with the
/// given result.
pub async fn mount_rpc(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(result)))
        .mount(server)
        .await;
}

// ============================================================================
// MOCK WALLET
// ============================================================================

/// Wallet stub that records nothing and returns a fixed transaction id.
pub struct MockWallet;

impl LedgerWallet for MockWallet {
    async fn issue_register_validator(
        &self,
        _signed_warp_message: &[u8],
    ) -> anyhow::Result<String> {
        Ok(DUMMY_LEDGER_TX_ID.to_string())
    }

    async fn issue_set_validator_weight(
        &self,
        _signed_warp_message: &[u8],
    ) -> anyhow::Result<String> {
        Ok(DUMMY_LEDGER_TX_ID.to_string())
    }
}
