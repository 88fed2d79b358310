//! Validator Lifecycle Orchestration Library
//!
//! This crate drives a validator through its full lifecycle (register, change
//! weight, remove) on a two-chain network: one chain issues EVM-style
//! contract calls, the other issues native ledger transactions, and the two
//! are bridged by warp messages that must be collected, signed by a quorum,
//! and replayed on the opposite chain.
//!
//! ## Overview
//!
//! A lifecycle flow:
//! 1. Submits an initiating contract call on the EVM chain
//! 2. Extracts the unsigned warp message from the call's emitted logs
//! 3. Aggregates quorum signatures over it (external service)
//! 4. Submits the signed result as a ledger transaction
//! 5. Extracts the ledger transaction's own emitted message
//! 6. Locates the original registration message as justification
//! 7. Aggregates signatures again
//! 8. Completes on the EVM chain, injecting the signed message through the
//!    transaction access list
//!
//! There is no CLI or UI surface here; the crate is invoked programmatically
//! by a presentation layer that owns wallet bootstrapping and display.

pub mod abi;
pub mod access_list;
pub mod aggregator;
pub mod config;
pub mod crypto;
pub mod error;
pub mod evm_client;
pub mod extractor;
pub mod flow;
pub mod justification;
pub mod ownership;
pub mod pchain_client;
pub mod rlp;

// Re-export commonly used types
pub use aggregator::{AggregatorClient, AggregatorError};
pub use config::{AggregatorConfig, Config, EvmChainConfig, NetworkKind, PChainConfig};
pub use crypto::CryptoService;
pub use error::FlowError;
pub use evm_client::{EvmClient, EvmLog, TxReceipt};
pub use extractor::{ExtractedPayload, ExtractedWarpMessage, ExtractionError, MessageExtractor};
pub use flow::{
    AddParams, ChangeWeightParams, FlowContext, FlowEvent, FlowKind, FlowParams, FlowRunner,
    FlowState, LedgerWallet, RemoveParams, StepState, StepStatus,
};
pub use justification::{JustificationLocator, JustificationTarget};
pub use ownership::OwnershipMode;
pub use pchain_client::PChainClient;
