//! Lifecycle Flow State Machine
//!
//! Three flows — Add, ChangeWeight, Remove — share one execution model: an
//! ordered list of named steps, each `pending → loading → success | error`.
//! Steps execute strictly in order; a failure leaves later steps pending and
//! earlier successes (with their cached outputs) untouched. Retry-from-step
//! resets step *k* and everything after it, then resumes from *k*. Reset
//! clears all statuses and accumulated values — a client-side view reset,
//! never a compensating transaction.
//!
//! State transitions go through a pure reducer; the presentation layer
//! subscribes to [`FlowState`] instead of owning any of the logic.

mod add;
mod change_weight;
mod remove;
mod runner;

use serde::Serialize;

pub use runner::FlowRunner;

use crate::ownership::OwnershipMode;
use warp_codec::PChainOwner;

// ============================================================================
// STEP AND FLOW STATE
// ============================================================================

/// Status of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "message")]
pub enum StepStatus {
    Pending,
    Loading,
    Success,
    Error(String),
}

/// One named step and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepState {
    pub name: &'static str,
    pub status: StepStatus,
}

/// Which lifecycle flow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowKind {
    Add,
    ChangeWeight,
    Remove,
}

impl FlowKind {
    /// The declared step order for this flow.
    pub fn step_names(&self) -> &'static [&'static str] {
        match self {
            FlowKind::Add => &[
                "resolve ownership",
                "initiate registration",
                "aggregate registration signatures",
                "submit ledger registration",
                "extract ledger acknowledgement",
                "locate justification",
                "aggregate acknowledgement signatures",
                "complete registration",
            ],
            FlowKind::ChangeWeight => &[
                "resolve ownership",
                "initiate weight update",
                "aggregate weight signatures",
                "submit ledger weight update",
                "extract ledger acknowledgement",
                "aggregate acknowledgement signatures",
                "complete weight update",
            ],
            FlowKind::Remove => &[
                "resolve ownership",
                "initiate removal",
                "aggregate removal signatures",
                "submit ledger weight update",
                "extract ledger acknowledgement",
                "locate justification",
                "aggregate acknowledgement signatures",
                "complete removal",
            ],
        }
    }
}

/// Events the executor feeds through the reducer.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    StepStarted(usize),
    StepSucceeded(usize),
    StepFailed(usize, String),
    RetryFrom(usize),
    Reset,
}

/// The observable state of one flow: its kind and every step's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowState {
    pub kind: FlowKind,
    steps: Vec<StepState>,
}

impl FlowState {
    /// Creates a flow with every step pending.
    pub fn new(kind: FlowKind) -> Self {
        let steps = kind
            .step_names()
            .iter()
            .map(|name| StepState {
                name,
                status: StepStatus::Pending,
            })
            .collect();
        Self { kind, steps }
    }

    pub fn steps(&self) -> &[StepState] {
        &self.steps
    }

    /// Index of the first step that has not succeeded yet.
    pub fn first_unfinished(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.status != StepStatus::Success)
    }

    /// Applies an event in place (see [`reduce`]).
    pub fn apply(&mut self, event: FlowEvent) {
        *self = reduce(self.clone(), event);
    }
}

/// Pure reducer: the only place step statuses change.
pub fn reduce(mut state: FlowState, event: FlowEvent) -> FlowState {
    match event {
        FlowEvent::StepStarted(index) => {
            if let Some(step) = state.steps.get_mut(index) {
                step.status = StepStatus::Loading;
            }
        }
        FlowEvent::StepSucceeded(index) => {
            if let Some(step) = state.steps.get_mut(index) {
                step.status = StepStatus::Success;
            }
        }
        FlowEvent::StepFailed(index, message) => {
            if let Some(step) = state.steps.get_mut(index) {
                step.status = StepStatus::Error(message);
            }
        }
        FlowEvent::RetryFrom(index) => {
            for step in state.steps.iter_mut().skip(index) {
                step.status = StepStatus::Pending;
            }
        }
        FlowEvent::Reset => {
            for step in state.steps.iter_mut() {
                step.status = StepStatus::Pending;
            }
        }
    }
    state
}

// ============================================================================
// FLOW PARAMETERS AND ACCUMULATED CONTEXT
// ============================================================================

/// Parameters for the Add flow.
#[derive(Debug, Clone)]
pub struct AddParams {
    /// Raw node identifier bytes.
    pub node_id: Vec<u8>,
    pub bls_public_key: [u8; 48],
    /// Unix timestamp after which the registration request is void.
    pub expiry: u64,
    pub remaining_balance_owner: PChainOwner,
    pub disable_owner: PChainOwner,
    pub weight: u64,
    /// Ledger address watched for a balance change after the registration
    /// transaction (operator feedback only).
    pub pchain_address: Option<String>,
}

/// Parameters for the ChangeWeight flow.
#[derive(Debug, Clone)]
pub struct ChangeWeightParams {
    pub validation_id: [u8; 32],
    pub new_weight: u64,
}

/// Parameters for the Remove flow.
#[derive(Debug, Clone)]
pub struct RemoveParams {
    pub validation_id: [u8; 32],
}

/// Per-flow parameters.
#[derive(Debug, Clone)]
pub enum FlowParams {
    Add(AddParams),
    ChangeWeight(ChangeWeightParams),
    Remove(RemoveParams),
}

impl FlowParams {
    pub fn kind(&self) -> FlowKind {
        match self {
            FlowParams::Add(_) => FlowKind::Add,
            FlowParams::ChangeWeight(_) => FlowKind::ChangeWeight,
            FlowParams::Remove(_) => FlowKind::Remove,
        }
    }
}

/// Intermediate values produced by earlier steps and consumed by later ones.
/// Owned by the flow, mutated only by the step executor, discarded on reset.
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    pub ownership: Option<OwnershipMode>,
    /// Raw unsigned envelope extracted from the initiating call's logs.
    pub unsigned_message: Option<Vec<u8>>,
    pub validation_id: Option<[u8; 32]>,
    /// Quorum-signed version of `unsigned_message`.
    pub signed_message: Option<Vec<u8>>,
    pub ledger_tx_id: Option<String>,
    /// Raw unsigned envelope extracted from the ledger transaction.
    pub ledger_message: Option<Vec<u8>>,
    /// Original registration envelope used as aggregation justification.
    pub justification: Option<Vec<u8>>,
    /// Quorum-signed version of `ledger_message`.
    pub signed_ledger_message: Option<Vec<u8>>,
    /// True when the initiating step went through the resend fallback.
    pub used_resend_fallback: bool,
}

// ============================================================================
// LEDGER WALLET COLLABORATOR
// ============================================================================

/// External wallet that assembles, signs, and issues native ledger
/// transactions. Wallet machinery is outside this crate; flows only need
/// these two operations and the resulting transaction identifier.
pub trait LedgerWallet {
    /// Issues the ledger transaction registering a validator, consuming the
    /// quorum-signed registration message.
    fn issue_register_validator(
        &self,
        signed_warp_message: &[u8],
    ) -> impl std::future::Future<Output = anyhow::Result<String>> + Send;

    /// Issues the ledger transaction applying a weight change (weight zero
    /// removes the validator), consuming the quorum-signed weight message.
    fn issue_set_validator_weight(
        &self,
        signed_warp_message: &[u8],
    ) -> impl std::future::Future<Output = anyhow::Result<String>> + Send;
}
