//! Configuration module for the clientele CLI.
//!
//! Handles loading configuration from the TOML file and CLI arguments,
//! validating it, and turning it into the runtime settings each
//! subcommand needs.

pub mod file;
pub mod runtime;

use crate::config::file::{
    ClienteleConfig, ContractConfig, EtherConfig, FileConfig, NetworkConfig, PollingConfig,
    TransactionConfig, WalletConfig as FileWalletConfig, WeiAmount,
};
use crate::config::runtime::{
    ComplexSettings, ContractCall, EtherTransfer, GasSettings, GpsiSettings, TransactionPayload,
    WebhookSettings,
};
use alloy_primitives::{Address, U256};
use clientele_core::config::{PollConfig, PollConfigError};
use clientele_sdk::config::{ClienteleCredentials, WalletConfig};
use clientele_sdk::objects::Network;
use clientele_sdk::signature::WebhookSecret;
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("missing [{0}] section")]
    MissingSection(&'static str),

    #[error("invalid polling configuration: {0}")]
    PollError(#[from] PollConfigError),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read and parse the TOML file.
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        Ok(toml::from_str(&config_content)?)
    }

    pub fn load_complex(&self) -> Result<ComplexSettings, ConfigError> {
        complex_settings(self.load()?)
    }

    pub fn load_gpsi(&self) -> Result<GpsiSettings, ConfigError> {
        gpsi_settings(self.load()?)
    }

    /// Load the webhook settings, applying the `--listen` override.
    pub fn load_webhook(&self) -> Result<WebhookSettings, ConfigError> {
        let mut settings = webhook_settings(self.load()?)?;
        if let Some(listen) = self.listen_override {
            settings.listen = listen;
        }
        Ok(settings)
    }
}

fn complex_settings(config: FileConfig) -> Result<ComplexSettings, ConfigError> {
    if config.ether.is_some() {
        return Err(ConfigError::ValidationError(
            "complex transactions are contract calls, remove the [ether] section".into(),
        ));
    }
    let contract = config
        .contract
        .ok_or(ConfigError::MissingSection("contract"))?;
    let clientele = config
        .clientele
        .ok_or(ConfigError::MissingSection("clientele"))?;
    let wallet = config.wallet.ok_or(ConfigError::MissingSection("wallet"))?;

    let network = config
        .network
        .as_ref()
        .map(|n| parse_network(&n.name))
        .transpose()?;

    Ok(ComplexSettings {
        wallet: convert_wallet(wallet, &clientele)?,
        credentials: convert_credentials(clientele)?,
        contract: convert_contract(contract)?,
        value: parse_wei("transaction.value", &config.transaction.value)?,
        gas: convert_gas(&config.transaction)?,
        fund: config.transaction.fund,
        network,
        poll: convert_polling(&config.polling)?,
    })
}

fn gpsi_settings(config: FileConfig) -> Result<GpsiSettings, ConfigError> {
    let payload = match (config.contract, config.ether) {
        (Some(contract), None) => TransactionPayload::Contract(convert_contract(contract)?),
        (None, Some(ether)) => TransactionPayload::Ether(convert_ether(ether)?),
        (Some(_), Some(_)) => {
            return Err(ConfigError::ValidationError(
                "configure either [contract] or [ether], not both".into(),
            ));
        }
        (None, None) => {
            return Err(ConfigError::ValidationError(
                "configure one of [contract] or [ether]".into(),
            ));
        }
    };
    let clientele = config
        .clientele
        .ok_or(ConfigError::MissingSection("clientele"))?;
    let wallet = config.wallet.ok_or(ConfigError::MissingSection("wallet"))?;
    let network_config = config
        .network
        .ok_or(ConfigError::MissingSection("network"))?;
    let network = parse_network(&network_config.name)?;

    Ok(GpsiSettings {
        wallet: convert_wallet(wallet, &clientele)?,
        credentials: convert_credentials(clientele)?,
        payload,
        gas: convert_gas(&config.transaction)?,
        network,
        rpc_url: rpc_url(network, &network_config)?,
        poll: convert_polling(&config.polling)?,
    })
}

fn webhook_settings(config: FileConfig) -> Result<WebhookSettings, ConfigError> {
    let webhook = config
        .webhook
        .ok_or(ConfigError::MissingSection("webhook"))?;
    let secret = WebhookSecret::new(webhook.secret)
        .map_err(|_| ConfigError::ValidationError("webhook.secret must not be empty".into()))?;
    Ok(WebhookSettings {
        secret,
        listen: webhook.listen,
    })
}

fn convert_credentials(c: ClienteleConfig) -> Result<ClienteleCredentials, ConfigError> {
    let base_url = Url::parse(&c.base_url).map_err(|e| {
        ConfigError::ValidationError(format!("clientele.base_url {:?}: {e}", c.base_url))
    })?;
    if c.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "clientele.timeout_secs must be positive".into(),
        ));
    }
    Ok(ClienteleCredentials {
        base_url,
        client_id: c.client_id,
        client_secret: SecretString::from(c.client_secret),
        username: c.username,
        password: SecretString::from(c.password),
        scopes: c.scopes,
        timeout: Duration::from_secs(c.timeout_secs),
    })
}

fn convert_wallet(
    w: FileWalletConfig,
    clientele: &ClienteleConfig,
) -> Result<WalletConfig, ConfigError> {
    let id = Uuid::parse_str(&w.id)
        .map_err(|e| ConfigError::ValidationError(format!("wallet.id {:?}: {e}", w.id)))?;
    let address = parse_address("wallet.address", &w.address)?;
    let password = w.password.unwrap_or_else(|| clientele.password.clone());
    Ok(WalletConfig::new(id, address, password))
}

fn convert_contract(c: ContractConfig) -> Result<ContractCall, ConfigError> {
    if !c.abi.is_object() {
        return Err(ConfigError::ValidationError(
            "contract.abi must be the ABI of a single function, not a list".into(),
        ));
    }
    Ok(ContractCall {
        address: parse_address("contract.address", &c.address)?,
        abi: c.abi,
        parameters: c.parameters,
    })
}

fn convert_ether(e: EtherConfig) -> Result<EtherTransfer, ConfigError> {
    Ok(EtherTransfer {
        recipient: parse_address("ether.recipient_address", &e.recipient_address)?,
        value: parse_wei("ether.value", &e.value)?,
    })
}

fn convert_gas(t: &TransactionConfig) -> Result<GasSettings, ConfigError> {
    if t.gas_limit == 0 {
        return Err(ConfigError::ValidationError(
            "transaction.gas_limit must be positive".into(),
        ));
    }
    Ok(GasSettings {
        gas_limit: t.gas_limit,
        gas_price: parse_wei("transaction.gas_price", &t.gas_price)?,
    })
}

fn convert_polling(p: &PollingConfig) -> Result<PollConfig, ConfigError> {
    Ok(PollConfig::from_secs(
        p.max_total_seconds,
        p.max_interval_seconds,
        p.initial_interval_seconds,
        p.back_off_factor,
    )?)
}

fn rpc_url(network: Network, n: &NetworkConfig) -> Result<Url, ConfigError> {
    let raw = match (&n.rpc_url, &n.infura_project_id) {
        (Some(url), _) => url.clone(),
        (None, Some(project_id)) if !project_id.is_empty() => network.infura_url(project_id),
        _ => {
            return Err(ConfigError::ValidationError(
                "network needs either rpc_url or infura_project_id".into(),
            ));
        }
    };
    Url::parse(&raw).map_err(|e| ConfigError::ValidationError(format!("rpc url {raw:?}: {e}")))
}

fn parse_network(name: &str) -> Result<Network, ConfigError> {
    name.parse()
        .map_err(|e| ConfigError::ValidationError(format!("network.name: {e}")))
}

fn parse_address(field: &str, value: &str) -> Result<Address, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("{field} {value:?}: {e}")))
}

/// Wei quantities accept decimal or `0x` hex strings. Floats must hold a
/// whole number below 2^128; past 2^53 they are only as exact as `f64`.
fn parse_wei(field: &str, amount: &WeiAmount) -> Result<U256, ConfigError> {
    match amount {
        WeiAmount::Number(n) => Ok(U256::from(*n)),
        WeiAmount::Float(f) => {
            if f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f < 2f64.powi(128) {
                Ok(U256::from(*f as u128))
            } else {
                Err(ConfigError::ValidationError(format!(
                    "{field} {f}: must be a whole number of wei; quote large or exact values"
                )))
            }
        }
        WeiAmount::Text(text) => text
            .trim()
            .parse::<U256>()
            .map_err(|e| ConfigError::ValidationError(format!("{field} {text:?}: {e}"))),
    }
}
