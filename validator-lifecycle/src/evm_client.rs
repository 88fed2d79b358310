//! EVM Client Module
//!
//! This module provides a client for communicating with EVM-compatible
//! blockchain nodes via their JSON-RPC API. It handles log queries, read
//! calls, and locally signed write transactions — both legacy EIP-155
//! transactions and EIP-2930 (type-1) transactions carrying an access list,
//! which is how signed warp messages are injected for the precompile to read.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::access_list::AccessListEntry;
use crate::crypto::CryptoService;
use crate::rlp;

// ============================================================================
// API RESPONSE STRUCTURES
// ============================================================================

/// EVM event log entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmLog {
    /// Address of the contract that emitted the event
    pub address: String,
    /// Array of topics (indexed event parameters)
    pub topics: Vec<String>,
    /// Event data (non-indexed parameters)
    pub data: String,
    /// Transaction hash (JSON-RPC uses camelCase: transactionHash)
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: Option<String>,
}

/// Transaction receipt as returned by eth_getTransactionReceipt.
#[derive(Debug, Clone, Deserialize)]
struct RawReceipt {
    status: Option<String>,
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(default)]
    logs: Vec<EvmLog>,
}

/// A mined transaction's outcome: success flag plus emitted logs.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: String,
    /// True when the transaction executed without reverting.
    pub status: bool,
    pub logs: Vec<EvmLog>,
}

// ============================================================================
// EVM CLIENT IMPLEMENTATION
// ============================================================================

/// Client for communicating with EVM-compatible blockchain nodes via JSON-RPC.
pub struct EvmClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    base_url: String,
    /// Chain ID used when signing transactions
    chain_id: u64,
}

impl EvmClient {
    /// Creates a new EVM client for the given node URL and chain ID.
    pub fn new(node_url: &str, chain_id: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: node_url.to_string(),
            chain_id,
        })
    }

    /// Sends a JSON-RPC request and deserializes the `result` field.
    async fn json_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let rpc_future = async {
            let resp = self
                .client
                .post(&self.base_url)
                .json(&request)
                .send()
                .await
                .with_context(|| {
                    format!("Failed to send {} request to {}", method, self.base_url)
                })?;
            resp.json::<serde_json::Value>()
                .await
                .with_context(|| {
                    format!("Failed to parse {} response from {}", method, self.base_url)
                })
        };

        let response: serde_json::Value = tokio::time::timeout(Duration::from_secs(15), rpc_future)
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Timed out after 15s waiting for {} from {}",
                    method,
                    self.base_url
                )
            })??;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            anyhow::bail!(
                "JSON-RPC error from {} ({}): {} (code: {})",
                self.base_url,
                method,
                message,
                code
            );
        }

        let result = response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No result in {} response", method))?;
        serde_json::from_value(result)
            .with_context(|| format!("Failed to deserialize {} result", method))
    }

    /// Gets the current block number.
    pub async fn get_block_number(&self) -> Result<u64> {
        let hex: String = self.json_rpc("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&hex).context("Failed to parse block number")
    }

    /// Queries event logs for one contract address and topic over a block
    /// range ("earliest"/"latest" accepted).
    pub async fn get_logs(
        &self,
        address: &str,
        topic0: &str,
        from_block: &str,
        to_block: &str,
    ) -> Result<Vec<EvmLog>> {
        let filter = serde_json::json!({
            "address": address,
            "topics": [topic0],
            "fromBlock": from_block,
            "toBlock": to_block,
        });
        self.json_rpc("eth_getLogs", vec![filter]).await
    }

    /// Executes a read-only contract call and returns the hex result.
    pub async fn call(&self, to: &str, calldata: &[u8]) -> Result<String> {
        self.json_rpc(
            "eth_call",
            vec![
                serde_json::json!({
                    "to": to,
                    "data": format!("0x{}", hex::encode(calldata)),
                }),
                serde_json::json!("latest"),
            ],
        )
        .await
    }

    /// Returns the deployed code at an address ("0x" when none).
    pub async fn get_code(&self, address: &str) -> Result<String> {
        self.json_rpc(
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }

    /// Sends a locally signed contract call and returns the transaction hash.
    ///
    /// Builds a legacy EIP-155 transaction, or an EIP-2930 (type-1)
    /// transaction when `access_list` is provided — the access-list entries
    /// are how a signed warp message travels to the precompile.
    pub async fn sign_and_send(
        &self,
        crypto: &CryptoService,
        to: &str,
        calldata: &[u8],
        access_list: Option<&AccessListEntry>,
    ) -> Result<String> {
        let from = crypto.ethereum_address()?;

        let nonce_hex: String = self
            .json_rpc(
                "eth_getTransactionCount",
                vec![serde_json::json!(from), serde_json::json!("pending")],
            )
            .await
            .context("eth_getTransactionCount failed")?;
        let nonce = parse_hex_u64(&nonce_hex).context("Failed to parse nonce")?;

        let gas_price_hex: String = self
            .json_rpc("eth_gasPrice", vec![])
            .await
            .context("eth_gasPrice failed")?;
        let gas_price = parse_hex_u64(&gas_price_hex).context("Failed to parse gas price")?;

        let gas_limit: u64 = 2_000_000;

        let to_bytes =
            hex::decode(to.strip_prefix("0x").unwrap_or(to)).context("Failed to decode EVM 'to' address")?;

        let raw_tx = match access_list {
            None => self.build_legacy_tx(crypto, nonce, gas_price, gas_limit, &to_bytes, calldata)?,
            Some(entry) => self.build_access_list_tx(
                crypto, nonce, gas_price, gas_limit, &to_bytes, calldata, entry,
            )?,
        };

        debug!(
            "EVM raw tx: nonce={}, gas_price={}, chain_id={}, from={}, access_list={}",
            nonce,
            gas_price,
            self.chain_id,
            from,
            access_list.is_some()
        );

        self.json_rpc(
            "eth_sendRawTransaction",
            vec![serde_json::json!(format!("0x{}", hex::encode(raw_tx)))],
        )
        .await
        .context("eth_sendRawTransaction failed")
    }

    /// Builds a signed legacy transaction with EIP-155 replay protection.
    fn build_legacy_tx(
        &self,
        crypto: &CryptoService,
        nonce: u64,
        gas_price: u64,
        gas_limit: u64,
        to: &[u8],
        calldata: &[u8],
    ) -> Result<Vec<u8>> {
        // Unsigned preimage: [nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]
        let unsigned_items: Vec<Vec<u8>> = vec![
            rlp::encode_u64(nonce),
            rlp::encode_u64(gas_price),
            rlp::encode_u64(gas_limit),
            to.to_vec(),
            vec![], // value = 0
            calldata.to_vec(),
            rlp::encode_u64(self.chain_id),
            vec![],
            vec![],
        ];
        let tx_hash = keccak256(&rlp::encode_list(&unsigned_items));

        let (r, s, recovery_id) = crypto
            .sign_evm_transaction_hash(&tx_hash)
            .context("Failed to sign EVM transaction")?;
        let v = (recovery_id as u64) + self.chain_id * 2 + 35;

        let signed_items: Vec<Vec<u8>> = vec![
            rlp::encode_u64(nonce),
            rlp::encode_u64(gas_price),
            rlp::encode_u64(gas_limit),
            to.to_vec(),
            vec![],
            calldata.to_vec(),
            rlp::encode_u64(v),
            trim_leading_zeros(&r),
            trim_leading_zeros(&s),
        ];
        Ok(rlp::encode_list(&signed_items))
    }

    /// Builds a signed EIP-2930 (type-1) transaction carrying an access list.
    fn build_access_list_tx(
        &self,
        crypto: &CryptoService,
        nonce: u64,
        gas_price: u64,
        gas_limit: u64,
        to: &[u8],
        calldata: &[u8],
        entry: &AccessListEntry,
    ) -> Result<Vec<u8>> {
        // accessList = [[address, [storageKey, ...]]]
        let keys_encoded: Vec<Vec<u8>> = entry
            .storage_keys
            .iter()
            .map(|key| rlp::encode_item(key))
            .collect();
        let entry_encoded = rlp::encode_list_from_encoded(&[
            rlp::encode_item(&entry.address),
            rlp::encode_list_from_encoded(&keys_encoded),
        ]);
        let access_list_encoded = rlp::encode_list_from_encoded(&[entry_encoded]);

        // Preimage: 0x01 || rlp([chainId, nonce, gasPrice, gasLimit, to,
        // value, data, accessList])
        let head: Vec<Vec<u8>> = vec![
            rlp::encode_item(&rlp::encode_u64(self.chain_id)),
            rlp::encode_item(&rlp::encode_u64(nonce)),
            rlp::encode_item(&rlp::encode_u64(gas_price)),
            rlp::encode_item(&rlp::encode_u64(gas_limit)),
            rlp::encode_item(to),
            rlp::encode_item(&[]),
            rlp::encode_item(calldata),
            access_list_encoded,
        ];
        let unsigned = rlp::encode_list_from_encoded(&head);

        let mut preimage = Vec::with_capacity(1 + unsigned.len());
        preimage.push(0x01);
        preimage.extend_from_slice(&unsigned);
        let tx_hash = keccak256(&preimage);

        let (r, s, recovery_id) = crypto
            .sign_evm_transaction_hash(&tx_hash)
            .context("Failed to sign EVM transaction")?;

        let mut signed_parts = head;
        signed_parts.push(rlp::encode_item(&rlp::encode_u64(recovery_id as u64)));
        signed_parts.push(rlp::encode_item(&trim_leading_zeros(&r)));
        signed_parts.push(rlp::encode_item(&trim_leading_zeros(&s)));
        let signed = rlp::encode_list_from_encoded(&signed_parts);

        let mut raw = Vec::with_capacity(1 + signed.len());
        raw.push(0x01);
        raw.extend_from_slice(&signed);
        Ok(raw)
    }

    /// Waits for a transaction receipt, polling with a bounded loop.
    ///
    /// Returns the receipt whether the transaction succeeded or reverted; the
    /// caller decides what a revert means (the initiating lifecycle step has
    /// a fallback path, everything else treats it as terminal).
    pub async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt> {
        for _ in 0..30 {
            let receipt: Option<RawReceipt> = self
                .json_rpc(
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(tx_hash)],
                )
                .await?;

            if let Some(receipt) = receipt {
                let status = receipt.status.as_deref() == Some("0x1");
                return Ok(TxReceipt {
                    tx_hash: receipt.transaction_hash,
                    status,
                    logs: receipt.logs,
                });
            }

            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        anyhow::bail!("Timed out waiting for EVM transaction receipt: {}", tx_hash)
    }

    /// Returns the base URL of this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    Keccak256::digest(data).into()
}

fn parse_hex_u64(value: &str) -> Result<u64> {
    Ok(u64::from_str_radix(
        value.strip_prefix("0x").unwrap_or(value),
        16,
    )?)
}

fn trim_leading_zeros(word: &[u8; 32]) -> Vec<u8> {
    let start = word.iter().position(|&b| b != 0).unwrap_or(31);
    word[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoService;

    #[test]
    fn legacy_tx_is_valid_rlp_with_eip155_v() {
        let crypto = CryptoService::from_private_key_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let client = EvmClient::new("http://127.0.0.1:0", 43113).unwrap();
        let raw = client
            .build_legacy_tx(&crypto, 0, 1_000_000_000, 2_000_000, &[0x11; 20], &[0xab, 0xcd])
            .unwrap();
        // Must be a list header and contain the EIP-155 v value 43113*2+35(+recid).
        assert!(raw[0] >= 0xc0);
        let v_lo = 43113u64 * 2 + 35;
        let found = raw
            .windows(3)
            .any(|w| w == rlp::encode_u64(v_lo).as_slice() || w == rlp::encode_u64(v_lo + 1).as_slice());
        assert!(found, "EIP-155 v value not present in signed tx");
    }

    #[test]
    fn access_list_tx_starts_with_type_byte() {
        let crypto = CryptoService::from_private_key_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let client = EvmClient::new("http://127.0.0.1:0", 43113).unwrap();
        let entry = AccessListEntry {
            address: [0x02; 20],
            storage_keys: vec![[0xaa; 32], [0xbb; 32]],
        };
        let raw = client
            .build_access_list_tx(&crypto, 1, 25_000_000_000, 2_000_000, &[0x11; 20], &[], &entry)
            .unwrap();
        assert_eq!(raw[0], 0x01);
        // Both storage keys appear verbatim in the payload.
        assert!(raw.windows(32).any(|w| w == [0xaa; 32]));
        assert!(raw.windows(32).any(|w| w == [0xbb; 32]));
    }
}
