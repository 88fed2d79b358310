//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    build_test_config, encode_single_bytes, mount_rpc, registration_ack_envelope,
    registration_envelope, rpc_result, test_node_id, test_subnet_id, warp_log_json, MockWallet,
    CALLER_ADDRESS, DUMMY_LEDGER_TX_ID, DUMMY_MANAGER_ADDR, DUMMY_PRIVATE_KEY, DUMMY_TX_HASH,
};
