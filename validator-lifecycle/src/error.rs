//! Flow Error Taxonomy
//!
//! Step-level errors surfaced by the lifecycle state machine. Low-level
//! codec and extraction errors are never swallowed; they propagate here with
//! their stage information intact.

use thiserror::Error;

use crate::aggregator::AggregatorError;
use crate::extractor::ExtractionError;
use warp_codec::CodecError;

/// Errors raised while executing lifecycle flow steps.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The caller lacks authority over the validator manager and no
    /// delegated-authority path exists. Fatal for the whole flow.
    #[error("permission denied: validator manager is owned by {owner}")]
    OwnershipPermission { owner: String },

    /// A contract call reverted. On the initiating step this triggers the
    /// resend fallback; everywhere else it is a terminal step error.
    #[error("transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: String },

    /// No justification record exists for the target validator. Blocking
    /// precondition failure, distinct from a transient network error.
    #[error("no justification found for {target}")]
    JustificationNotFound { target: String },

    /// The initiating call's receipt carried no warp message log.
    #[error("transaction {tx_hash} emitted no warp message")]
    NoWarpMessageEmitted { tx_hash: String },

    /// A step needed a value an earlier step should have produced.
    #[error("missing intermediate value: {name}")]
    MissingContext { name: &'static str },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Aggregation(#[from] AggregatorError),

    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),

    /// Transport or other unclassified failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
