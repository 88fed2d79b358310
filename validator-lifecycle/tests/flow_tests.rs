//! End-to-end flow tests against mocked chain endpoints
//!
//! These tests run whole lifecycle flows with every external collaborator
//! mocked: the EVM node, the ledger node's platform API, the aggregation
//! service, and the ledger wallet. They verify step ordering, the revert
//! fallback on the initiating registration call, ownership gating, and the
//! retry-from-step semantics.

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use validator_lifecycle::{
    abi, AddParams, ChangeWeightParams, FlowError, FlowParams, FlowRunner, StepStatus,
};
use warp_codec::{AddressedCall, L1ValidatorWeightMessage, PChainOwner, UnsignedMessage};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    build_test_config, mount_rpc, registration_ack_envelope, registration_envelope, rpc_result,
    test_node_id, warp_log_json, MockWallet, CALLER_ADDRESS, DUMMY_LEDGER_TX_ID, DUMMY_TX_HASH,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Signed-message bytes the mocked aggregation service hands back.
fn signed_message_bytes() -> Vec<u8> {
    vec![0x5au8; 64]
}

/// Left-pads a 20-byte address into an ABI result word.
fn address_word(address: &str) -> String {
    let clean = address.strip_prefix("0x").unwrap_or(address);
    format!("0x{:0>64}", clean)
}

/// Mounts the EVM mocks every write transaction needs: nonce, gas price,
/// submission, and a successful receipt carrying the given warp envelope.
async fn mount_tx_mocks(server: &MockServer, emitted_envelope: &[u8]) {
    mount_rpc(server, "eth_getTransactionCount", json!("0x0")).await;
    mount_rpc(server, "eth_gasPrice", json!("0x3b9aca00")).await;
    mount_rpc(server, "eth_sendRawTransaction", json!(DUMMY_TX_HASH)).await;
    mount_rpc(
        server,
        "eth_getTransactionReceipt",
        json!({
            "status": "0x1",
            "transactionHash": DUMMY_TX_HASH,
            "logs": [warp_log_json(emitted_envelope)],
        }),
    )
    .await;
}

/// Mounts an `eth_call` mock keyed on the function selector in the calldata.
async fn mount_eth_call(server: &MockServer, signature: &str, result_hex: String) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .and(body_string_contains(hex::encode(abi::selector(signature))))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!(result_hex))))
        .mount(server)
        .await;
}

/// Mounts the aggregation service answering every request with a fixed
/// signed message.
async fn mount_aggregator(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/signatureAggregator/aggregateSignatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signedMessage": format!("0x{}", hex::encode(signed_message_bytes())),
        })))
        .mount(server)
        .await;
}

/// Mounts `platform.getTx` returning the given envelope bytes.
async fn mount_ledger_tx(server: &MockServer, envelope_bytes: &[u8]) {
    mount_rpc(
        server,
        "platform.getTx",
        json!({
            "tx": {
                "unsignedTx": {
                    "message": format!("0x{}", hex::encode(envelope_bytes)),
                }
            }
        }),
    )
    .await;
}

fn add_params() -> FlowParams {
    FlowParams::Add(AddParams {
        node_id: test_node_id(),
        bls_public_key: [0xaau8; 48],
        expiry: 1000,
        remaining_balance_owner: PChainOwner::new(0, vec![]).unwrap(),
        disable_owner: PChainOwner::new(0, vec![]).unwrap(),
        weight: 500,
        pchain_address: None,
    })
}

// ============================================================================
// TESTS
// ============================================================================

/// Test that the add flow runs all eight steps against mocked endpoints
/// What is tested: step ordering, context accumulation, direct ownership path
/// Why: this is the complete registration path an operator drives in production
#[tokio::test]
async fn test_add_flow_runs_to_completion() {
    let _ = tracing_subscriber::fmt::try_init();

    let evm = MockServer::start().await;
    let pchain = MockServer::start().await;
    let aggregator = MockServer::start().await;

    let (register, registration_bytes) = registration_envelope();
    mount_eth_call(&evm, "owner()", address_word(CALLER_ADDRESS)).await;
    mount_tx_mocks(&evm, &registration_bytes).await;
    mount_rpc(&evm, "eth_getLogs", json!([warp_log_json(&registration_bytes)])).await;
    mount_ledger_tx(&pchain, &registration_ack_envelope(register.validation_id())).await;
    mount_aggregator(&aggregator).await;

    let config = build_test_config(&evm.uri(), &pchain.uri(), &aggregator.uri());
    let mut runner = FlowRunner::new(&config, MockWallet, add_params()).unwrap();

    runner.run().await.unwrap();

    assert!(runner
        .state()
        .steps()
        .iter()
        .all(|s| s.status == StepStatus::Success));

    let ctx = runner.context();
    assert_eq!(ctx.unsigned_message.as_deref(), Some(&registration_bytes[..]));
    assert_eq!(ctx.validation_id, Some(register.validation_id()));
    assert_eq!(ctx.signed_message.as_deref(), Some(&signed_message_bytes()[..]));
    assert_eq!(ctx.ledger_tx_id.as_deref(), Some(DUMMY_LEDGER_TX_ID));
    assert_eq!(ctx.justification.as_deref(), Some(&registration_bytes[..]));
    assert!(!ctx.used_resend_fallback);
}

/// Test that a reverted initiating call falls back to resending the message
/// What is tested: revert detection, registeredValidators lookup, resend path
/// Why: re-running a flow for an already-registered node must recover, not fail
#[tokio::test]
async fn test_add_flow_resends_after_initiate_revert() {
    let _ = tracing_subscriber::fmt::try_init();

    let evm = MockServer::start().await;
    let pchain = MockServer::start().await;
    let aggregator = MockServer::start().await;

    let (register, registration_bytes) = registration_envelope();

    // First receipt poll sees the revert; later polls see the resend receipt.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({
            "status": "0x0",
            "transactionHash": DUMMY_TX_HASH,
            "logs": [],
        }))))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&evm)
        .await;

    mount_eth_call(&evm, "owner()", address_word(CALLER_ADDRESS)).await;
    mount_eth_call(
        &evm,
        "registeredValidators(bytes)",
        format!("0x{}", hex::encode(register.validation_id())),
    )
    .await;

    // The resend calldata appears verbatim inside the raw transaction hex;
    // exactly one resend submission must happen.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_sendRawTransaction"})))
        .and(body_string_contains(hex::encode(abi::selector(
            "resendRegisterValidatorMessage(bytes32)",
        ))))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!(DUMMY_TX_HASH))))
        .with_priority(1)
        .expect(1)
        .mount(&evm)
        .await;

    mount_tx_mocks(&evm, &registration_bytes).await;
    mount_rpc(&evm, "eth_getLogs", json!([warp_log_json(&registration_bytes)])).await;
    mount_ledger_tx(&pchain, &registration_ack_envelope(register.validation_id())).await;
    mount_aggregator(&aggregator).await;

    let config = build_test_config(&evm.uri(), &pchain.uri(), &aggregator.uri());
    let mut runner = FlowRunner::new(&config, MockWallet, add_params()).unwrap();

    runner.run().await.unwrap();

    assert!(runner.context().used_resend_fallback);
    assert_eq!(
        runner.context().validation_id,
        Some(register.validation_id())
    );
}

/// Test that a foreign owner without a proposal path blocks the flow
/// What is tested: ownership gating before any state-changing call
/// Why: the flow must fail fast with a permission error, not revert on-chain
#[tokio::test]
async fn test_flow_blocked_when_caller_lacks_authority() {
    let evm = MockServer::start().await;
    let pchain = MockServer::start().await;
    let aggregator = MockServer::start().await;

    let stranger = "0x00000000000000000000000000000000000000ff";
    mount_eth_call(&evm, "owner()", address_word(stranger)).await;
    mount_rpc(&evm, "eth_getCode", json!("0x")).await;

    let config = build_test_config(&evm.uri(), &pchain.uri(), &aggregator.uri());
    let mut runner = FlowRunner::new(&config, MockWallet, add_params()).unwrap();

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, FlowError::OwnershipPermission { .. }));

    let steps = runner.state().steps();
    assert!(matches!(steps[0].status, StepStatus::Error(_)));
    assert!(steps[1..]
        .iter()
        .all(|s| s.status == StepStatus::Pending));
}

/// Test that a failed aggregation is retryable from the failed step
/// What is tested: QuorumNotReached classification and retry-from semantics
/// Why: quorum failures are transient; earlier cached outputs must be reused
#[tokio::test]
async fn test_add_flow_retries_after_quorum_failure() {
    let evm = MockServer::start().await;
    let pchain = MockServer::start().await;
    let aggregator = MockServer::start().await;

    let (register, registration_bytes) = registration_envelope();
    mount_eth_call(&evm, "owner()", address_word(CALLER_ADDRESS)).await;
    mount_tx_mocks(&evm, &registration_bytes).await;
    mount_rpc(&evm, "eth_getLogs", json!([warp_log_json(&registration_bytes)])).await;
    mount_ledger_tx(&pchain, &registration_ack_envelope(register.validation_id())).await;

    // First aggregation attempt misses quorum; every later one succeeds.
    Mock::given(method("POST"))
        .and(path("/v1/signatureAggregator/aggregateSignatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "failed to reach sufficient quorum of signatures",
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&aggregator)
        .await;
    mount_aggregator(&aggregator).await;

    let config = build_test_config(&evm.uri(), &pchain.uri(), &aggregator.uri());
    let mut runner = FlowRunner::new(&config, MockWallet, add_params()).unwrap();

    let err = runner.run().await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Aggregation(validator_lifecycle::AggregatorError::QuorumNotReached { .. })
    ));
    assert!(matches!(runner.state().steps()[2].status, StepStatus::Error(_)));

    runner.retry_from(2).await.unwrap();
    assert!(runner
        .state()
        .steps()
        .iter()
        .all(|s| s.status == StepStatus::Success));
}

/// Test that reset discards both step statuses and accumulated values
/// What is tested: runner reset returns the flow to its initial state
/// Why: reset is a client-side view reset; stale intermediate values must not
/// leak into a rerun of the flow
#[tokio::test]
async fn test_reset_clears_steps_and_context() {
    let evm = MockServer::start().await;
    let pchain = MockServer::start().await;
    let aggregator = MockServer::start().await;

    let (register, registration_bytes) = registration_envelope();
    mount_eth_call(&evm, "owner()", address_word(CALLER_ADDRESS)).await;
    mount_tx_mocks(&evm, &registration_bytes).await;
    mount_rpc(&evm, "eth_getLogs", json!([warp_log_json(&registration_bytes)])).await;
    mount_ledger_tx(&pchain, &registration_ack_envelope(register.validation_id())).await;
    mount_aggregator(&aggregator).await;

    let config = build_test_config(&evm.uri(), &pchain.uri(), &aggregator.uri());
    let mut runner = FlowRunner::new(&config, MockWallet, add_params()).unwrap();

    runner.run().await.unwrap();
    assert!(runner.context().unsigned_message.is_some());
    assert!(runner.context().signed_ledger_message.is_some());

    runner.reset();

    assert!(runner
        .state()
        .steps()
        .iter()
        .all(|s| s.status == StepStatus::Pending));
    let ctx = runner.context();
    assert!(ctx.ownership.is_none());
    assert!(ctx.unsigned_message.is_none());
    assert!(ctx.validation_id.is_none());
    assert!(ctx.signed_message.is_none());
    assert!(ctx.ledger_tx_id.is_none());
    assert!(ctx.ledger_message.is_none());
    assert!(ctx.justification.is_none());
    assert!(ctx.signed_ledger_message.is_none());
    assert!(!ctx.used_resend_fallback);
}

/// Test that the change-weight flow completes without a justification step
/// What is tested: the seven-step flow shape and weight-message plumbing
/// Why: weight messages need no justification; the flow must not look for one
#[tokio::test]
async fn test_change_weight_flow_runs_to_completion() {
    let evm = MockServer::start().await;
    let pchain = MockServer::start().await;
    let aggregator = MockServer::start().await;

    let validation_id = [0x44u8; 32];
    let weight = L1ValidatorWeightMessage::new(validation_id, 1, 900);
    let call = AddressedCall::new(vec![], weight.pack());
    let weight_envelope = UnsignedMessage::new(5, [0x22u8; 32], call.pack()).pack();

    mount_eth_call(&evm, "owner()", address_word(CALLER_ADDRESS)).await;
    mount_tx_mocks(&evm, &weight_envelope).await;
    mount_ledger_tx(&pchain, &weight_envelope).await;
    mount_aggregator(&aggregator).await;

    let config = build_test_config(&evm.uri(), &pchain.uri(), &aggregator.uri());
    let params = FlowParams::ChangeWeight(ChangeWeightParams {
        validation_id,
        new_weight: 900,
    });
    let mut runner = FlowRunner::new(&config, MockWallet, params).unwrap();

    runner.run().await.unwrap();

    assert_eq!(runner.state().steps().len(), 7);
    assert!(runner
        .state()
        .steps()
        .iter()
        .all(|s| s.status == StepStatus::Success));
    assert_eq!(runner.context().validation_id, Some(validation_id));
    assert!(runner.context().justification.is_none());
}
