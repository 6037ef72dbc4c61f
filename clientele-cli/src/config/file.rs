//! TOML file configuration structures.
//!
//! These structs directly map to the `clientele.toml` file format. Every
//! section is optional at this level; each subcommand checks for the
//! sections it needs when the file is converted into runtime settings.

use clientele_sdk::config::DEFAULT_SCOPES;
use serde::Deserialize;
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub clientele: Option<ClienteleConfig>,
    pub wallet: Option<WalletConfig>,
    pub network: Option<NetworkConfig>,
    #[serde(default)]
    pub transaction: TransactionConfig,
    pub contract: Option<ContractConfig>,
    pub ether: Option<EtherConfig>,
    #[serde(default)]
    pub polling: PollingConfig,
    pub webhook: Option<WebhookConfig>,
}

/// Clientele API credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ClienteleConfig {
    /// API root, e.g. `https://api.playground.upvest.co/1.0/`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    pub username: String,
    pub password: String,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

/// The Upvest-managed wallet used for signing.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub id: String,
    pub address: String,
    /// Wallet password. Defaults to the Clientele user password.
    pub password: Option<String>,
}

/// Which Ethereum network to talk to.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// One of `mainnet`, `ropsten`, `rinkeby`, `goerli`, `kovan`, `sepolia`.
    pub name: String,
    pub infura_project_id: Option<String>,
    /// Explicit JSON-RPC endpoint, takes precedence over Infura.
    pub rpc_url: Option<String>,
}

/// Gas and funding parameters shared by both transaction flows.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionConfig {
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Price per gas unit in wei (not gwei).
    #[serde(default = "default_gas_price")]
    pub gas_price: WeiAmount,
    /// Ether sent along with a contract call, in wei.
    #[serde(default)]
    pub value: WeiAmount,
    /// Let the Upvest funding service cover `gas_limit * gas_price`.
    #[serde(default = "default_fund")]
    pub fund: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            gas_price: default_gas_price(),
            value: WeiAmount::default(),
            fund: default_fund(),
        }
    }
}

fn default_gas_limit() -> u64 {
    60_000
}

fn default_gas_price() -> WeiAmount {
    WeiAmount::Number(3_500_000_000)
}

fn default_fund() -> bool {
    true
}

/// A contract function call.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    /// ABI fragment of the single function being called.
    pub abi: serde_json::Value,
    /// One value per ABI input.
    #[serde(default)]
    pub parameters: Vec<serde_json::Value>,
}

/// A plain Ether transfer.
#[derive(Debug, Clone, Deserialize)]
pub struct EtherConfig {
    pub recipient_address: String,
    pub value: WeiAmount,
}

/// Polling for the transaction hash or receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_max_total_seconds")]
    pub max_total_seconds: f64,
    #[serde(default = "default_max_interval_seconds")]
    pub max_interval_seconds: f64,
    #[serde(default = "default_initial_interval_seconds")]
    pub initial_interval_seconds: f64,
    #[serde(default = "default_back_off_factor")]
    pub back_off_factor: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_total_seconds: default_max_total_seconds(),
            max_interval_seconds: default_max_interval_seconds(),
            initial_interval_seconds: default_initial_interval_seconds(),
            back_off_factor: default_back_off_factor(),
        }
    }
}

fn default_max_total_seconds() -> f64 {
    480.0
}

fn default_max_interval_seconds() -> f64 {
    30.0
}

fn default_initial_interval_seconds() -> f64 {
    1.0
}

fn default_back_off_factor() -> f64 {
    2.0
}

/// Webhook receiver settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared HMAC secret configured in the Upvest account.
    pub secret: String,
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// A wei quantity written as a TOML integer, a whole-number float such as
/// `3.5e9`, or a decimal / `0x` hex string (TOML integers stop at
/// `i64::MAX`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WeiAmount {
    Number(u64),
    Float(f64),
    Text(String),
}

impl Default for WeiAmount {
    fn default() -> Self {
        WeiAmount::Number(0)
    }
}
