//! Remove-Validator Flow Steps
//!
//! Eight steps. On the ledger side removal is a weight-zero update, so the
//! middle of the flow reuses the change-weight machinery; unlike a weight
//! change, though, the acknowledgement aggregation needs the original
//! registration envelope as justification, located here by validation
//! identifier.

use anyhow::anyhow;

use crate::abi::{self, Token};
use crate::error::FlowError;
use crate::justification::{JustificationLocator, JustificationTarget};

use super::runner::FlowRunner;
use super::{FlowParams, LedgerWallet, RemoveParams};

impl<W: LedgerWallet> FlowRunner<W> {
    pub(super) async fn execute_remove_step(&mut self, index: usize) -> Result<(), FlowError> {
        match index {
            0 => self.resolve_ownership_step().await,
            1 => self.initiate_removal().await,
            2 => self.aggregate_initiating_message().await,
            3 => self.submit_ledger_weight_update().await,
            4 => self.extract_ledger_message().await,
            5 => self.locate_removal_justification().await,
            6 => self.aggregate_ledger_message(true).await,
            7 => self.complete_on_evm("completeValidatorRemoval(uint32)").await,
            other => Err(FlowError::Other(anyhow!(
                "remove flow has no step {}",
                other
            ))),
        }
    }

    fn remove_params(&self) -> Result<&RemoveParams, FlowError> {
        match &self.params {
            FlowParams::Remove(params) => Ok(params),
            _ => Err(FlowError::Other(anyhow!(
                "flow parameters do not match the remove flow"
            ))),
        }
    }

    /// Step: submit the initiating removal call and capture the warp message
    /// it emits.
    async fn initiate_removal(&mut self) -> Result<(), FlowError> {
        let params = self.remove_params()?.clone();
        let calldata = abi::encode_call(
            "initiateValidatorRemoval(bytes32)",
            &[Token::FixedBytes32(params.validation_id)],
        );

        let receipt = self.submit_manager_call(calldata, None).await?;
        if !receipt.status {
            return Err(FlowError::TransactionReverted {
                tx_hash: receipt.tx_hash,
            });
        }

        let message = Self::warp_message_from_receipt(&receipt)?;
        self.ctx.validation_id = Some(params.validation_id);
        self.ctx.unsigned_message = Some(message);
        Ok(())
    }

    /// Step: find the original registration envelope for this validation in
    /// historical warp logs.
    async fn locate_removal_justification(&mut self) -> Result<(), FlowError> {
        let validation_id = self.remove_params()?.validation_id;
        let target = JustificationTarget::ValidationId(validation_id);
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
