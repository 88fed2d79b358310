//! Unit tests for ledger transaction message extraction
//!
//! These tests verify that the extractor fetches a transaction through the
//! platform API, locates the embedded warp message bytes, and reports every
//! structural failure with its decode stage.

use serde_json::json;
use wiremock::MockServer;

use validator_lifecycle::pchain_client::PChainClient;
use validator_lifecycle::{ExtractedPayload, ExtractionError, MessageExtractor};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{mount_rpc, registration_envelope, DUMMY_LEDGER_TX_ID};

// ============================================================================
// TESTS
// ============================================================================

/// Test that a warp-carrying transaction decodes through all three layers
/// What is tested: platform.getTx fetch, hex decode, envelope/call/payload parse
/// Why: the extracted raw bytes feed signature aggregation and must survive verbatim
#[tokio::test]
async fn test_extracts_registration_from_ledger_tx() {
    let mock_server = MockServer::start().await;
    let (register, envelope_bytes) = registration_envelope();

    mount_rpc(
        &mock_server,
        "platform.getTx",
        json!({
            "tx": {
                "unsignedTx": {
                    "message": format!("0x{}", hex::encode(&envelope_bytes)),
                }
            }
        }),
    )
    .await;

    let pchain = PChainClient::new(&mock_server.uri()).unwrap();
    let extracted = MessageExtractor::new(&pchain)
        .extract_from_tx(DUMMY_LEDGER_TX_ID)
        .await
        .unwrap();

    assert_eq!(extracted.network_id, 5);
    assert_eq!(extracted.raw, envelope_bytes);
    match extracted.payload {
        ExtractedPayload::Register(parsed) => {
            assert_eq!(parsed.validation_id(), register.validation_id())
        }
        other => panic!("wrong payload variant: {:?}", other),
    }
}

/// Test that a transaction without a message field is classified distinctly
/// What is tested: the NotAWarpCarryingTransaction variant
/// Why: pointing a flow at the wrong transaction must not read as a codec bug
#[tokio::test]
async fn test_reports_transaction_without_warp_message() {
    let mock_server = MockServer::start().await;

    mount_rpc(
        &mock_server,
        "platform.getTx",
        json!({
            "tx": {
                "unsignedTx": {
                    "networkID": 5,
                }
            }
        }),
    )
    .await;

    let pchain = PChainClient::new(&mock_server.uri()).unwrap();
    let err = MessageExtractor::new(&pchain)
        .extract_from_tx(DUMMY_LEDGER_TX_ID)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::NotAWarpCarryingTransaction { .. }
    ));
}

/// Test that truncated message bytes fail at the envelope stage
/// What is tested: stage attribution of decode failures
/// Why: an operator must be able to tell a malformed on-chain message from a client bug
#[tokio::test]
async fn test_reports_envelope_stage_for_truncated_message() {
    let mock_server = MockServer::start().await;
    let (_, envelope_bytes) = registration_envelope();

    mount_rpc(
        &mock_server,
        "platform.getTx",
        json!({
            "tx": {
                "unsignedTx": {
                    "message": format!("0x{}", hex::encode(&envelope_bytes[..20])),
                }
            }
        }),
    )
    .await;

    let pchain = PChainClient::new(&mock_server.uri()).unwrap();
    let err = MessageExtractor::new(&pchain)
        .extract_from_tx(DUMMY_LEDGER_TX_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Envelope(_)));
}

/// Test that a platform API error surfaces as an RPC failure
/// What is tested: the Rpc variant wrapping the transport/service error
/// Why: a missing transaction is a different operator problem than bad bytes
#[tokio::test]
async fn test_reports_rpc_failure_for_unknown_tx() {
    let mock_server = MockServer::start().await;

    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, ResponseTemplate};
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "platform.getTx"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "no such transaction" }
        })))
        .mount(&mock_server)
        .await;

    let pchain = PChainClient::new(&mock_server.uri()).unwrap();
    let err = MessageExtractor::new(&pchain)
        .extract_from_tx(DUMMY_LEDGER_TX_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Rpc(_)));
}
