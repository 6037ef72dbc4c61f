use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Ethereum networks the toolkit knows how to reach.
pub enum Network {
    Mainnet,
    Ropsten,
    Rinkeby,
    Goerli,
    Kovan,
    Sepolia,
}

/// Error returned when parsing an unknown network name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl Network {
    /// EIP-155 chain id.
    pub fn chain_id(self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Ropsten => 3,
            Network::Rinkeby => 4,
            Network::Goerli => 5,
            Network::Kovan => 42,
            Network::Sepolia => 11155111,
        }
    }

    /// Lowercase network name as used in Infura and Etherscan host names.
    pub fn name(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Ropsten => "ropsten",
            Network::Rinkeby => "rinkeby",
            Network::Goerli => "goerli",
            Network::Kovan => "kovan",
            Network::Sepolia => "sepolia",
        }
    }

    /// Infura HTTPS JSON-RPC endpoint for this network.
    pub fn infura_url(self, project_id: &str) -> String {
        format!("https://{}.infura.io/v3/{project_id}", self.name())
    }

    /// Etherscan page for a transaction hash.
    pub fn explorer_tx_url(self, tx_hash: &str) -> String {
        match self {
            Network::Mainnet => format!("https://etherscan.io/tx/{tx_hash}"),
            other => format!("https://{}.etherscan.io/tx/{tx_hash}", other.name()),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "ropsten" => Ok(Network::Ropsten),
            "rinkeby" => Ok(Network::Rinkeby),
            "goerli" => Ok(Network::Goerli),
            "kovan" => Ok(Network::Kovan),
            "sepolia" => Ok(Network::Sepolia),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}
