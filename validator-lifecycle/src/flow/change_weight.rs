//! Change-Weight Flow Steps
//!
//! Seven steps: weight messages need no justification, so the locate step of
//! the other flows is absent. A revert on the initiating call is terminal
//! here — there is no equivalent of the registration resend fallback.

use anyhow::anyhow;

use crate::abi::{self, Token};
use crate::error::FlowError;

use super::runner::FlowRunner;
use super::{ChangeWeightParams, FlowParams, LedgerWallet};

impl<W: LedgerWallet> FlowRunner<W> {
    pub(super) async fn execute_change_weight_step(
        &mut self,
        index: usize,
    ) -> Result<(), FlowError> {
        match index {
            0 => self.resolve_ownership_step().await,
            1 => self.initiate_weight_update().await,
            2 => self.aggregate_initiating_message().await,
            3 => self.submit_ledger_weight_update().await,
            4 => self.extract_ledger_message().await,
            5 => self.aggregate_ledger_message(false).await,
            6 => {
                self.complete_on_evm("completeValidatorWeightUpdate(uint32)")
                    .await
            }
            other => Err(FlowError::Other(anyhow!(
                "change-weight flow has no step {}",
                other
            ))),
        }
    }

    fn change_weight_params(&self) -> Result<&ChangeWeightParams, FlowError> {
        match &self.params {
            FlowParams::ChangeWeight(params) => Ok(params),
            _ => Err(FlowError::Other(anyhow!(
                "flow parameters do not match the change-weight flow"
            ))),
        }
    }

    /// Step: submit the initiating weight-update call and capture the warp
    /// message it emits.
    async fn initiate_weight_update(&mut self) -> Result<(), FlowError> {
        let params = self.change_weight_params()?.clone();
        let calldata = abi::encode_call(
            "initiateValidatorWeightUpdate(bytes32,uint64)",
            &[
                Token::FixedBytes32(params.validation_id),
                Token::Uint(params.new_weight),
            ],
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
}
