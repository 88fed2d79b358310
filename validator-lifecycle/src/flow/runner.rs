//! Flow Runner
//!
//! Owns the chain clients and the mutable flow state, executes steps in
//! order, and feeds every status change through the reducer. Step bodies for
//! each flow live in the sibling modules; this file holds the machinery they
//! share: routing calls through the resolved ownership mode, pulling warp
//! envelopes out of receipts, and the aggregation / extraction / completion
//! steps that are identical across flows.

use tracing::{error, info, warn};

use crate::abi::{self, Token};
use crate::access_list::{signed_message_access_list, AccessListEntry, WARP_PRECOMPILE_ADDRESS};
use crate::aggregator::AggregatorClient;
use crate::config::{Config, NetworkKind};
use crate::crypto::CryptoService;
use crate::error::FlowError;
use crate::evm_client::{EvmClient, TxReceipt};
use crate::extractor::MessageExtractor;
use crate::justification::SEND_WARP_MESSAGE_EVENT;
use crate::ownership::{self, OwnershipMode};
use crate::pchain_client::PChainClient;

use super::{FlowContext, FlowEvent, FlowKind, FlowParams, FlowState, LedgerWallet};

/// Executes one lifecycle flow step by step.
pub struct FlowRunner<W: LedgerWallet> {
    pub(super) evm: EvmClient,
    pub(super) pchain: PChainClient,
    pub(super) aggregator: AggregatorClient,
    pub(super) crypto: CryptoService,
    pub(super) wallet: W,
    pub(super) network: NetworkKind,
    pub(super) manager_address: String,
    pub(super) subnet_id: [u8; 32],
    pub(super) params: FlowParams,
    pub(super) state: FlowState,
    pub(super) ctx: FlowContext,
}

impl<W: LedgerWallet> FlowRunner<W> {
    /// Creates a runner for one flow, building every chain client from the
    /// configuration.
    pub fn new(config: &Config, wallet: W, params: FlowParams) -> anyhow::Result<Self> {
        let evm = EvmClient::new(&config.evm_chain.rpc_url, config.evm_chain.chain_id)?;
        let pchain = PChainClient::new(&config.pchain.rpc_url)?;
        let aggregator = AggregatorClient::new(config.aggregator.clone())?;
        let crypto = CryptoService::new(config)?;
        let subnet_id = parse_subnet_id(&config.evm_chain.subnet_id)?;
        let state = FlowState::new(params.kind());

        Ok(Self {
            evm,
            pchain,
            aggregator,
            crypto,
            wallet,
            network: config.network,
            manager_address: config.evm_chain.validator_manager_address.clone(),
            subnet_id,
            params,
            state,
            ctx: FlowContext::default(),
        })
    }

    /// The current step statuses, for display.
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// The accumulated intermediate values.
    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    /// Runs the flow forward from the first unfinished step.
    ///
    /// Stops at the first failing step, leaving its error recorded and every
    /// later step pending. Cached outputs of completed steps are reused, so
    /// calling `run` again (or [`retry_from`](Self::retry_from)) resumes
    /// rather than restarts.
    pub async fn run(&mut self) -> Result<(), FlowError> {
        while let Some(index) = self.state.first_unfinished() {
            let name = self.state.kind.step_names()[index];
            self.state.apply(FlowEvent::StepStarted(index));
            info!("Step {}: {}", index + 1, name);

            match self.execute_step(index).await {
                Ok(()) => {
                    self.state.apply(FlowEvent::StepSucceeded(index));
                }
                Err(e) => {
                    error!("Step {} ({}) failed: {}", index + 1, name, e);
                    self.state
                        .apply(FlowEvent::StepFailed(index, e.to_string()));
                    return Err(e);
                }
            }
        }
        info!("Flow complete");
        Ok(())
    }

    /// Resets step `index` and everything after it to pending, then resumes.
    /// Outputs of steps before `index` stay cached.
    pub async fn retry_from(&mut self, index: usize) -> Result<(), FlowError> {
        self.state.apply(FlowEvent::RetryFrom(index));
        self.run().await
    }

    /// Clears all step statuses and accumulated values. Client-side only:
    /// nothing already submitted to a chain is undone.
    pub fn reset(&mut self) {
        self.state.apply(FlowEvent::Reset);
        self.ctx = FlowContext::default();
    }

    async fn execute_step(&mut self, index: usize) -> Result<(), FlowError> {
        match self.state.kind {
            FlowKind::Add => self.execute_add_step(index).await,
            FlowKind::ChangeWeight => self.execute_change_weight_step(index).await,
            FlowKind::Remove => self.execute_remove_step(index).await,
        }
    }

    // ------------------------------------------------------------------
    // Shared step bodies
    // ------------------------------------------------------------------

    /// Step: resolve how the caller may drive the validator manager.
    pub(super) async fn resolve_ownership_step(&mut self) -> Result<(), FlowError> {
        let caller = self.crypto.ethereum_address()?;
        let mode =
            ownership::resolve_ownership(&self.evm, &self.manager_address, &caller).await?;
        self.ctx.ownership = Some(mode);
        Ok(())
    }

    /// Step: aggregate quorum signatures over the initiating message.
    pub(super) async fn aggregate_initiating_message(&mut self) -> Result<(), FlowError> {
        let unsigned = Self::require(&self.ctx.unsigned_message, "unsigned message")?.clone();
        let signed = self.aggregator.aggregate_signatures(&unsigned, None).await?;
        self.ctx.signed_message = Some(signed);
        Ok(())
    }

    /// Step: issue the weight-setting ledger transaction through the wallet.
    /// Used by both the ChangeWeight and Remove flows (removal is a weight-0
    /// change on the ledger side).
    pub(super) async fn submit_ledger_weight_update(&mut self) -> Result<(), FlowError> {
        let signed = Self::require(&self.ctx.signed_message, "signed message")?.clone();
        let tx_id = self.wallet.issue_set_validator_weight(&signed).await?;
        info!("Ledger weight transaction issued: {}", tx_id);
        self.ctx.ledger_tx_id = Some(tx_id);
        Ok(())
    }

    /// Step: fetch the ledger transaction and keep its embedded envelope.
    pub(super) async fn extract_ledger_message(&mut self) -> Result<(), FlowError> {
        let tx_id = Self::require(&self.ctx.ledger_tx_id, "ledger transaction id")?.clone();
        let extracted = MessageExtractor::new(&self.pchain)
            .extract_from_tx(&tx_id)
            .await?;
        if extracted.network_id != self.network.network_id() {
            warn!(
                "Extracted message carries network id {} but the configured network is {}",
                extracted.network_id,
                self.network.network_id()
            );
        }
        self.ctx.ledger_message = Some(extracted.raw);
        Ok(())
    }

    /// Step: aggregate quorum signatures over the ledger acknowledgement,
    /// attaching the stored justification when the message type requires one.
    pub(super) async fn aggregate_ledger_message(
        &mut self,
        with_justification: bool,
    ) -> Result<(), FlowError> {
        let message = Self::require(&self.ctx.ledger_message, "ledger message")?.clone();
        let justification = if with_justification {
            Some(Self::require(&self.ctx.justification, "justification")?.clone())
        } else {
            None
        };
        let signed = self
            .aggregator
            .aggregate_signatures(&message, justification.as_deref())
            .await?;
        self.ctx.signed_ledger_message = Some(signed);
        Ok(())
    }

    /// Step: complete the flow on the EVM chain. The signed ledger message
    /// rides in the access list; the call argument is the message index
    /// within it (always 0 — one message per transaction).
    pub(super) async fn complete_on_evm(&mut self, signature: &str) -> Result<(), FlowError> {
        let signed =
            Self::require(&self.ctx.signed_ledger_message, "signed ledger message")?.clone();
        let entry = signed_message_access_list(&signed);
        let calldata = abi::encode_call(signature, &[Token::Uint(0)]);

        let receipt = self.submit_manager_call(calldata, Some(&entry)).await?;
        if !receipt.status {
            return Err(FlowError::TransactionReverted {
                tx_hash: receipt.tx_hash,
            });
        }
        info!("Completion transaction mined: {}", receipt.tx_hash);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Routes manager calldata through the resolved ownership mode: straight
    /// to the manager, or wrapped in a multisig proposal.
    pub(super) fn route_call(&self, calldata: Vec<u8>) -> Result<(String, Vec<u8>), FlowError> {
        match Self::require(&self.ctx.ownership, "ownership mode")? {
            OwnershipMode::Direct => Ok((self.manager_address.clone(), calldata)),
            OwnershipMode::Multisig { multisig_address } => {
                let manager = ownership::parse_address(&self.manager_address)?;
                let wrapped = abi::encode_call(
                    "propose(address,bytes)",
                    &[Token::Address(manager), Token::Bytes(calldata)],
                );
                Ok((multisig_address.clone(), wrapped))
            }
        }
    }

    /// Signs, sends, and waits out a manager call, routed per ownership.
    /// Returns the receipt whether it succeeded or reverted.
    pub(super) async fn submit_manager_call(
        &self,
        calldata: Vec<u8>,
        access_list: Option<&AccessListEntry>,
    ) -> Result<TxReceipt, FlowError> {
        let (to, data) = self.route_call(calldata)?;
        let tx_hash = self
            .evm
            .sign_and_send(&self.crypto, &to, &data, access_list)
            .await?;
        let receipt = self.evm.wait_for_receipt(&tx_hash).await?;
        Ok(receipt)
    }

    /// Pulls the raw warp envelope out of a receipt's precompile log.
    pub(super) fn warp_message_from_receipt(receipt: &TxReceipt) -> Result<Vec<u8>, FlowError> {
        let topic = abi::event_topic(SEND_WARP_MESSAGE_EVENT);
        for log in &receipt.logs {
            if !log.address.eq_ignore_ascii_case(WARP_PRECOMPILE_ADDRESS) {
                continue;
            }
            let matches_topic = log
                .topics
                .first()
                .map(|t| t.eq_ignore_ascii_case(&topic))
                .unwrap_or(false);
            if !matches_topic {
                continue;
            }
            let clean = log.data.strip_prefix("0x").unwrap_or(&log.data);
            let Ok(data) = hex::decode(clean) else {
                continue;
            };
            if let Some(message) = abi::decode_single_bytes(&data) {
                return Ok(message);
            }
        }
        Err(FlowError::NoWarpMessageEmitted {
            tx_hash: receipt.tx_hash.clone(),
        })
    }

    pub(super) fn require<'a, T>(
        value: &'a Option<T>,
        name: &'static str,
    ) -> Result<&'a T, FlowError> {
        value.as_ref().ok_or(FlowError::MissingContext { name })
    }
}

/// Parses the configured hex subnet identifier (32 bytes).
fn parse_subnet_id(subnet_id_hex: &str) -> anyhow::Result<[u8; 32]> {
    let clean = subnet_id_hex.strip_prefix("0x").unwrap_or(subnet_id_hex);
    let bytes = hex::decode(clean)?;
    if bytes.len() != 32 {
        anyhow::bail!("subnet id must be 32 bytes, got {}", bytes.len());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}
