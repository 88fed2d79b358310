//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the lifecycle
//! orchestrator. Configuration includes the network selector, chain
//! endpoints, the validator-manager contract address, aggregation service
//! settings, and the operator wallet key.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which network the flows target (test or production).
    pub network: NetworkKind,
    /// EVM-style chain configuration (where the validator manager lives).
    pub evm_chain: EvmChainConfig,
    /// Ledger chain (P-Chain) configuration.
    pub pchain: PChainConfig,
    /// Quorum signature-aggregation service configuration.
    pub aggregator: AggregatorConfig,
    /// Operator wallet configuration.
    pub wallet: WalletConfig,
}

/// The two supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Production network.
    Mainnet,
    /// Test network.
    Testnet,
}

impl NetworkKind {
    /// Network identifier carried in every unsigned message envelope.
    pub fn network_id(&self) -> u32 {
        match self {
            NetworkKind::Mainnet => 1,
            NetworkKind::Testnet => 5,
        }
    }
}

/// Configuration for the EVM-style chain connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmChainConfig {
    /// RPC endpoint URL.
    pub rpc_url: String,
    /// EVM chain ID used for transaction signing.
    pub chain_id: u64,
    /// Address of the validator-manager contract.
    pub validator_manager_address: String,
    /// Subnet identifier the manager controls (hex, 32 bytes).
    pub subnet_id: String,
}

/// Configuration for the ledger chain connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PChainConfig {
    /// RPC endpoint URL (the platform API is served under /ext/bc/P).
    pub rpc_url: String,
}

/// Configuration for the external quorum signature-aggregation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Base URL of the aggregation service.
    pub url: String,
    /// Required quorum percentage.
    #[serde(default = "default_quorum_percentage")]
    pub quorum_percentage: u32,
    /// Optional signing-subnet selector (hex subnet ID).
    #[serde(default)]
    pub signing_subnet_id: Option<String>,
}

fn default_quorum_percentage() -> u32 {
    67
}

/// Operator wallet configuration.
///
/// The private key signs EVM transactions locally; it must be kept secure
/// and never logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// ECDSA (secp256k1) private key, hex encoded.
    pub private_key: String,
}

// ============================================================================
// CONFIGURATION LOADING
// ============================================================================

impl Config {
    /// Loads configuration from the TOML file.
    ///
    /// The path defaults to `config/lifecycle.toml` and can be overridden
    /// with the `LIFECYCLE_CONFIG_PATH` environment variable (used by tests).
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("LIFECYCLE_CONFIG_PATH")
            .unwrap_or_else(|_| "config/lifecycle.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/lifecycle.template.toml config/lifecycle.toml\n\
                Then edit config/lifecycle.toml with your actual values.",
                config_path
            ))
        }
    }
}
