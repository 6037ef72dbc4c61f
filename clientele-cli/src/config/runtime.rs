//! Validated runtime settings for each subcommand.
//!
//! Built from [`FileConfig`](super::file::FileConfig) by the
//! [`ConfigLoader`](super::ConfigLoader); every value here has already
//! been parsed into its strong type.

use alloy_primitives::{Address, U256};
use clientele_core::config::PollConfig;
use clientele_sdk::config::{ClienteleCredentials, WalletConfig};
use clientele_sdk::objects::Network;
use clientele_sdk::signature::WebhookSecret;
use std::net::SocketAddr;
use url::Url;

/// Gas parameters of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSettings {
    pub gas_limit: u64,
    /// Wei per gas unit.
    pub gas_price: U256,
}

/// Call of a single contract function.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub address: Address,
    pub abi: serde_json::Value,
    pub parameters: Vec<serde_json::Value>,
}

/// Plain Ether transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtherTransfer {
    pub recipient: Address,
    /// Amount in wei.
    pub value: U256,
}

/// What a GPSI transaction does. Exactly one kind per configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionPayload {
    Contract(ContractCall),
    Ether(EtherTransfer),
}

/// Settings for `clientele complex`.
#[derive(Debug)]
pub struct ComplexSettings {
    pub credentials: ClienteleCredentials,
    pub wallet: WalletConfig,
    pub contract: ContractCall,
    /// Ether sent along with the call, in wei.
    pub value: U256,
    pub gas: GasSettings,
    pub fund: bool,
    /// Only used for explorer links.
    pub network: Option<Network>,
    pub poll: PollConfig,
}

/// Settings for `clientele gpsi`.
#[derive(Debug)]
pub struct GpsiSettings {
    pub credentials: ClienteleCredentials,
    pub wallet: WalletConfig,
    pub payload: TransactionPayload,
    pub gas: GasSettings,
    pub network: Network,
    pub rpc_url: Url,
    pub poll: PollConfig,
}

/// Settings for `clientele webhook`.
#[derive(Debug)]
pub struct WebhookSettings {
    pub secret: WebhookSecret,
    pub listen: SocketAddr,
}
