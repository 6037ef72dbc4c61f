//! Transaction endpoint bodies.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// `type` of a smart contract function call transaction.
pub const ETHEREUM_FUNCTION_CALL: &str = "ethereum_function_call";

/// A "complex" transaction, built and signed by the Clientele API.
///
/// Integer quantities are sent as base-10 strings because 256-bit values do
/// not survive a round trip through JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexTransaction {
    #[serde(rename = "type")]
    pub kind: String,
    /// Contract address the function is called on.
    pub to: String,
    /// Wei sent along with the call (`0` for non-payable functions).
    pub value: String,
    pub gas_limit: String,
    /// Price per gas unit in wei (not gwei).
    pub gas_price: String,
    /// ABI of the single function being called, not the whole contract.
    pub abi: serde_json::Value,
    /// One value per ABI input.
    pub parameters: Vec<serde_json::Value>,
}

impl ComplexTransaction {
    /// Build an `ethereum_function_call` transaction.
    pub fn function_call(
        to: Address,
        value: U256,
        gas_limit: u64,
        gas_price: U256,
        abi: serde_json::Value,
        parameters: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            kind: ETHEREUM_FUNCTION_CALL.to_string(),
            to: to.to_string(),
            value: value.to_string(),
            gas_limit: gas_limit.to_string(),
            gas_price: gas_price.to_string(),
            abi,
            parameters,
        }
    }
}

/// Request body of `POST kms/wallets/{wallet_id}/transactions/complex`.
#[derive(Debug, Clone, Serialize)]
pub struct ComplexTransactionRequest<'a> {
    pub tx: &'a ComplexTransaction,
    pub password: &'a str,
    pub input_format: &'static str,
    /// Whether the funding service covers the fee (`gas_limit * gas_price`).
    pub fund: bool,
}

/// A transaction as reported by the Clientele API.
///
/// `txhash` stays empty until the transaction has been broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: String,
    #[serde(default)]
    pub txhash: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TransactionResponse {
    /// The transaction hash, once the transaction has been broadcast.
    pub fn tx_hash(&self) -> Option<&str> {
        self.txhash.as_deref().filter(|hash| !hash.is_empty())
    }
}
