//! Add-Validator Flow Steps
//!
//! The eight-step registration flow. Step 2 (initiate) carries the one
//! automatic fallback in the whole state machine: when the initiating call
//! reverts, the manager is queried for a pre-existing registration of the
//! same node and, if one exists, the original message is resent instead of
//! failing the flow.

use anyhow::anyhow;
use tracing::{info, warn};

use crate::abi::{self, Token};
use crate::error::FlowError;
use crate::evm_client::TxReceipt;
use crate::justification::{self, JustificationLocator, JustificationTarget};

use super::runner::FlowRunner;
use super::{AddParams, FlowParams, LedgerWallet};

impl<W: LedgerWallet> FlowRunner<W> {
    pub(super) async fn execute_add_step(&mut self, index: usize) -> Result<(), FlowError> {
        match index {
            0 => self.resolve_ownership_step().await,
            1 => self.initiate_registration().await,
            2 => self.aggregate_initiating_message().await,
            3 => self.submit_ledger_registration().await,
            4 => self.extract_ledger_message().await,
            5 => self.locate_registration_justification().await,
            6 => self.aggregate_ledger_message(true).await,
            7 => {
                self.complete_on_evm("completeValidatorRegistration(uint32)")
                    .await
            }
            other => Err(FlowError::Other(anyhow!(
                "add flow has no step {}",
                other
            ))),
        }
    }

    fn add_params(&self) -> Result<&AddParams, FlowError> {
        match &self.params {
            FlowParams::Add(params) => Ok(params),
            _ => Err(FlowError::Other(anyhow!(
                "flow parameters do not match the add flow"
            ))),
        }
    }

    /// Step: submit the initiating registration call and capture the warp
    /// message it emits.
    async fn initiate_registration(&mut self) -> Result<(), FlowError> {
        let add = self.add_params()?.clone();
        let calldata = abi::encode_call(
            "initiateValidatorRegistration(bytes,bytes,uint64,(uint32,address[]),(uint32,address[]),uint64)",
            &[
                Token::Bytes(add.node_id.clone()),
                Token::Bytes(add.bls_public_key.to_vec()),
                Token::Uint(add.expiry),
                owner_token(&add.remaining_balance_owner),
                owner_token(&add.disable_owner),
                Token::Uint(add.weight),
            ],
        );

        let receipt = self.submit_manager_call(calldata, None).await?;
        let receipt = if receipt.status {
            receipt
        } else {
            warn!(
                "Registration transaction {} reverted; checking for an existing registration",
                receipt.tx_hash
            );
            self.resend_existing_registration(&add.node_id, receipt.tx_hash)
                .await?
        };

        let message = Self::warp_message_from_receipt(&receipt)?;
        if let Some(register) = justification::parse_registration(&message) {
            self.ctx.validation_id = Some(register.validation_id());
        }
        self.ctx.unsigned_message = Some(message);
        Ok(())
    }

    /// Fallback for a reverted initiating call: a revert commonly means the
    /// node is already registered, in which case the manager can resend the
    /// original registration message instead of starting over.
    async fn resend_existing_registration(
        &mut self,
        node_id: &[u8],
        original_tx: String,
    ) -> Result<TxReceipt, FlowError> {
        let lookup = abi::encode_call(
            "registeredValidators(bytes)",
            &[Token::Bytes(node_id.to_vec())],
        );
        let result = self.evm.call(&self.manager_address, &lookup).await?;
        let validation_id = abi::decode_bytes32_word(&result)?;

        if validation_id == [0u8; 32] {
            // No prior registration: the revert stands.
            return Err(FlowError::TransactionReverted {
                tx_hash: original_tx,
            });
        }

        info!(
            "Node already registered under validation {}; resending the registration message",
            hex::encode(validation_id)
        );
        let resend = abi::encode_call(
            "resendRegisterValidatorMessage(bytes32)",
            &[Token::FixedBytes32(validation_id)],
        );
        let receipt = self.submit_manager_call(resend, None).await?;
        if !receipt.status {
            return Err(FlowError::TransactionReverted {
                tx_hash: receipt.tx_hash,
            });
        }
        self.ctx.used_resend_fallback = true;
        Ok(receipt)
    }

    /// Step: issue the registering ledger transaction through the wallet,
    /// optionally watching a ledger address for the resulting balance change.
    async fn submit_ledger_registration(&mut self) -> Result<(), FlowError> {
        let signed = Self::require(&self.ctx.signed_message, "signed message")?.clone();
        let watch = self.add_params()?.pchain_address.clone();
        let previous = match &watch {
            Some(address) => self.pchain.get_balance(address).await.ok(),
            None => None,
        };

        let tx_id = self.wallet.issue_register_validator(&signed).await?;
        info!("Ledger registration transaction issued: {}", tx_id);
        self.ctx.ledger_tx_id = Some(tx_id);

        if let (Some(address), Some(previous)) = (watch, previous) {
            // Feedback only; not observing the change is not a failure.
            let _ = self
                .pchain
                .wait_for_balance_change(&address, previous)
                .await?;
        }
        Ok(())
    }

    /// Step: find the original registration envelope in historical warp logs
    /// to justify the acknowledgement aggregation.
    async fn locate_registration_justification(&mut self) -> Result<(), FlowError> {
        let node_id = self.add_params()?.node_id.clone();
        let target = JustificationTarget::NodeId(node_id);
        let found = JustificationLocator::new(&self.evm)
            .find_registration(&self.subnet_id, &target)
            .await?;
        match found {
            Some(bytes) => {
                self.ctx.justification = Some(bytes);
                Ok(())
            }
            None => Err(FlowError::JustificationNotFound {
                target: target.to_string(),
            }),
        }
    }
}

fn owner_token(owner: &warp_codec::PChainOwner) -> Token {
    Token::Tuple(vec![
        Token::Uint(owner.threshold as u64),
        Token::AddressArray(owner.addresses.clone()),
    ])
}
