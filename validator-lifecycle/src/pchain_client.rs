//! Ledger Chain Client Module
//!
//! Client for the native ledger chain's platform API: transaction lookup
//! (the source of embedded warp message bytes), transaction issuance, and a
//! bounded balance poll used to notice externally visible UTXO changes after
//! a transfer.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Path of the platform API on the ledger node.
const PLATFORM_API_PATH: &str = "/ext/bc/P";

/// Client for the ledger chain's JSON-RPC platform API.
pub struct PChainClient {
    client: Client,
    base_url: String,
}

impl PChainClient {
    /// Creates a new ledger chain client for the given node URL.
    pub fn new(node_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: node_url.trim_end_matches('/').to_string(),
        })
    }

    async fn json_rpc(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, PLATFORM_API_PATH);
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let response: serde_json::Value = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, url))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response from {}", method, url))?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            anyhow::bail!("JSON-RPC error from {} ({}): {}", url, method, message);
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No result in {} response", method))
    }

    /// Fetches a transaction by identifier in JSON encoding and returns the
    /// embedded warp message bytes, if the transaction carries any.
    ///
    /// Pure fetch and decode; safe to retry.
    pub async fn get_tx_warp_message(&self, tx_id: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .json_rpc(
                "platform.getTx",
                serde_json::json!({ "txID": tx_id, "encoding": "json" }),
            )
            .await?;

        let message_hex = result
            .get("tx")
            .and_then(|tx| tx.get("unsignedTx"))
            .and_then(|unsigned| unsigned.get("message"))
            .and_then(|m| m.as_str());

        match message_hex {
            Some(value) => {
                let clean = value.strip_prefix("0x").unwrap_or(value);
                let bytes = hex::decode(clean)
                    .with_context(|| format!("Invalid warp message hex in transaction {}", tx_id))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    /// Issues a pre-signed transaction and returns its identifier.
    pub async fn issue_tx(&self, tx_bytes: &[u8]) -> Result<String> {
        let result = self
            .json_rpc(
                "platform.issueTx",
                serde_json::json!({
                    "tx": format!("0x{}", hex::encode(tx_bytes)),
                    "encoding": "hex",
                }),
            )
            .await?;

        result
            .get("txID")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("No txID in platform.issueTx response"))
    }

    /// Returns the spendable balance for an address, in the chain's smallest
    /// unit.
    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let result = self
            .json_rpc(
                "platform.getBalance",
                serde_json::json!({ "addresses": [address] }),
            )
            .await?;

        let balance = result
            .get("balance")
            .and_then(|b| b.as_str().map(str::to_string).or_else(|| b.as_u64().map(|v| v.to_string())))
            .ok_or_else(|| anyhow::anyhow!("No balance in platform.getBalance response"))?;
        balance
            .parse::<u64>()
            .context("Failed to parse balance value")
    }

    /// Polls for an externally visible balance change after a transfer.
    ///
    /// Issues up to 10 attempts with linearly increasing backoff (1s, 2s, …,
    /// 10s) and gives up silently after the last attempt: "state not yet
    /// observed" is non-fatal for the flows, which only use the balance for
    /// operator feedback.
    pub async fn wait_for_balance_change(
        &self,
        address: &str,
        previous_balance: u64,
    ) -> Result<Option<u64>> {
        for attempt in 1..=10u64 {
            tokio::time::sleep(Duration::from_secs(attempt)).await;

            match self.get_balance(address).await {
                Ok(balance) if balance != previous_balance => {
                    info!(
                        "Balance change observed for {} after {} attempt(s): {} -> {}",
                        address, attempt, previous_balance, balance
                    );
                    return Ok(Some(balance));
                }
                Ok(_) => {
                    debug!(
                        "Balance unchanged for {} (attempt {}/10)",
                        address, attempt
                    );
                }
                Err(e) => {
                    debug!("Balance query failed for {} (attempt {}/10): {}", address, attempt, e);
                }
            }
        }

        debug!("Giving up waiting for balance change for {}", address);
        Ok(None)
    }

    /// Returns the base URL of this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
