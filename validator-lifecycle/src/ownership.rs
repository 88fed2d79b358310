//! Ownership Resolution Module
//!
//! Before a flow touches the chain it resolves how the caller may drive the
//! validator-manager contract. Three outcomes:
//!
//! 1. The manager's owner is the caller — calls go straight to the manager.
//! 2. The owner is a contract implementing the delegated-authority
//!    (multisig-proposal) pattern — calls are wrapped in proposals instead
//!    of executed directly.
//! 3. The owner is some other externally owned address — the flow is blocked
//!    with a permission error before any step executes.

use anyhow::Result;
use tracing::info;

use crate::abi;
use crate::error::FlowError;
use crate::evm_client::EvmClient;

/// How the caller is allowed to drive the validator manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipMode {
    /// The caller owns the manager and calls it directly.
    Direct,
    /// The manager is owned by a multisig contract the caller can propose
    /// through; calls target this address wrapped in `propose`.
    Multisig { multisig_address: String },
}

/// Resolves the caller's authority over the validator-manager contract.
pub async fn resolve_ownership(
    evm: &EvmClient,
    manager_address: &str,
    caller_address: &str,
) -> Result<OwnershipMode, FlowError> {
    let owner_result = evm
        .call(manager_address, &abi::encode_call("owner()", &[]))
        .await?;
    let owner = abi::decode_address_word(&owner_result)?;
    let owner_hex = format!("0x{}", hex::encode(owner));

    if addresses_equal(&owner_hex, caller_address) {
        info!("Caller owns the validator manager directly");
        return Ok(OwnershipMode::Direct);
    }

    // Not the owner: a contract owner may still offer the proposal path.
    let code = evm.get_code(&owner_hex).await?;
    let has_code = code.len() > 2 && code != "0x0";
    if has_code {
        let calldata = abi::encode_call(
            "isProposer(address)",
            &[abi::Token::Address(parse_address(caller_address)?)],
        );
        let result = evm.call(&owner_hex, &calldata).await?;
        let word = abi::decode_bytes32_word(&result)?;
        if word[31] == 1 {
            info!("Caller proposes through multisig {}", owner_hex);
            return Ok(OwnershipMode::Multisig {
                multisig_address: owner_hex,
            });
        }
    }

    Err(FlowError::OwnershipPermission { owner: owner_hex })
}

fn addresses_equal(a: &str, b: &str) -> bool {
    let clean = |addr: &str| {
        addr.strip_prefix("0x")
            .unwrap_or(addr)
            .to_ascii_lowercase()
    };
    clean(a) == clean(b)
}

/// Parses a 0x-prefixed 20-byte hex address.
pub fn parse_address(address: &str) -> Result<[u8; 20]> {
    let clean = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(clean)?;
    if bytes.len() != 20 {
        anyhow::bail!("invalid address length: {} bytes", bytes.len());
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}
