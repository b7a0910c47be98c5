//! Configuration types for the wallet core
//!
//! Cluster and RPC endpoint selection, account derivation index, and the
//! dApp-connect polling bounds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid cluster '{0}'. Use: devnet, testnet, or mainnet-beta")]
    InvalidCluster(String),
}

/// Solana cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Cluster {
    /// Public RPC endpoint for the cluster
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }
}

impl std::str::FromStr for Cluster {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet-beta" | "mainnet" => Ok(Cluster::MainnetBeta),
            _ => Err(ConfigError::InvalidCluster(s.to_string())),
        }
    }
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cluster::Devnet => write!(f, "devnet"),
            Cluster::Testnet => write!(f, "testnet"),
            Cluster::MainnetBeta => write!(f, "mainnet-beta"),
        }
    }
}

/// Ledger endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub cluster: Cluster,
    pub rpc_url: String,
}

/// Bounds on the dApp-connect unlock wait
///
/// The handshake polls the keyring at a fixed interval and gives up
/// after a fixed number of attempts; the product is the hard ceiling on
/// how long a dApp waits for the user to unlock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConnectSettings {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl ConnectSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConnectSettings {
    fn default() -> Self {
        // ~one minute for the user to unlock
        Self {
            poll_interval_ms: 1_000,
            max_poll_attempts: 60,
        }
    }
}

/// Global wallet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub ledger: LedgerConfig,

    /// Account level of the derivation path
    pub account_index: u32,

    pub connect: ConnectSettings,

    /// Optional custom data directory
    pub data_dir: Option<String>,
}

/// Configuration overrides from CLI arguments and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cluster: Option<Cluster>,
    pub rpc_url: Option<String>,
    pub data_dir: Option<String>,
}

impl WalletConfig {
    /// Default configuration for a cluster
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            ledger: LedgerConfig {
                cluster,
                rpc_url: cluster.default_rpc_url().to_string(),
            },
            account_index: 0,
            connect: ConnectSettings::default(),
            data_dir: None,
        }
    }

    /// Default configuration (devnet)
    pub fn default_devnet() -> Self {
        Self::for_cluster(Cluster::Devnet)
    }

    /// Apply CLI/environment overrides
    ///
    /// Explicit overrides win over `VANDAL_CLUSTER` / `VANDAL_RPC_URL`
    /// environment variables, which win over the defaults.
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let env_cluster = std::env::var("VANDAL_CLUSTER")
            .ok()
            .map(|s| s.parse::<Cluster>())
            .transpose()?;

        if let Some(cluster) = overrides.cluster.or(env_cluster) {
            self.ledger.cluster = cluster;
            self.ledger.rpc_url = cluster.default_rpc_url().to_string();
        }

        let env_rpc_url = std::env::var("VANDAL_RPC_URL").ok();
        if let Some(rpc_url) = overrides.rpc_url.clone().or(env_rpc_url) {
            self.ledger.rpc_url = rpc_url;
        }

        if let Some(data_dir) = overrides.data_dir.clone() {
            self.data_dir = Some(data_dir);
        }

        Ok(self)
    }
}
