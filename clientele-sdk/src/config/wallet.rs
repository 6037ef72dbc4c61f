//! Wallet configuration.

use alloy_primitives::Address;
use secrecy::SecretString;
use uuid::Uuid;

/// An Upvest-managed wallet that signs transactions on our behalf.
#[derive(Debug)]
pub struct WalletConfig {
    /// Wallet id as assigned by the Clientele API.
    pub id: Uuid,
    /// On-chain address of the wallet.
    pub address: Address,
    /// Password unlocking the wallet for signing.
    pub password: SecretString,
}

impl WalletConfig {
    /// Create a new WalletConfig.
    pub fn new(id: Uuid, address: Address, password: impl Into<SecretString>) -> Self {
        Self {
            id,
            address,
            password: password.into(),
        }
    }
}
