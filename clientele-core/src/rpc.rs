//! Ethereum JSON-RPC over HTTP.
//!
//! Only the handful of methods needed to broadcast a signed transaction and
//! follow it to its receipt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256, U64};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("rpc json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Receipt as returned by `eth_getTransactionReceipt`.
///
/// Only the fields the CLI reports on are typed; everything else is kept
/// in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U64>,
    /// 1 = success, 0 = reverted. Absent on pre-Byzantium receipts.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionReceipt {
    pub const STATUS_SUCCESS: u64 = 1;

    /// `None` when the receipt carries no status field.
    pub fn succeeded(&self) -> Option<bool> {
        self.status
            .map(|status| status == U64::from(Self::STATUS_SUCCESS))
    }
}

/// JSON-RPC client bound to one node URL.
#[derive(Debug, Clone)]
pub struct RpcProvider {
    http: reqwest::Client,
    url: Url,
    next_id: Arc<AtomicU64>,
}

impl RpcProvider {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(url, http))
    }

    pub fn with_http_client(url: Url, http: reqwest::Client) -> Self {
        Self {
            http,
            url,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Call `method` and decode its `result`.
    ///
    /// A `null` result decodes into `None` when `T` is an `Option`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        tracing::trace!(method, id, "Sending JSON-RPC request");

        let response = self.http.post(self.url.clone()).json(&request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() && body.is_empty() {
            return Err(RpcError::InvalidResponse(format!("http status {status}")));
        }

        let result = decode_response(&body)?;
        serde_json::from_value(result).map_err(RpcError::Json)
    }

    /// Nonce for the next transaction from `address`, counting pending ones.
    pub async fn get_transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        let count: String = self
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_quantity(&count)
    }

    /// Broadcast a signed transaction, returning its hash.
    pub async fn send_raw_transaction(&self, raw_hex: &str) -> Result<B256, RpcError> {
        self.call("eth_sendRawTransaction", json!([raw_hex])).await
    }

    /// `None` while the transaction is not yet mined.
    pub async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.call("eth_getTransactionReceipt", json!([hash])).await
    }

    pub async fn get_transaction_by_hash(&self, hash: B256) -> Result<Option<Value>, RpcError> {
        self.call("eth_getTransactionByHash", json!([hash])).await
    }
}

/// Extract the `result` of a JSON-RPC response body. A missing result is
/// returned as `null`.
fn decode_response(body: &[u8]) -> Result<Value, RpcError> {
    let response: RpcResponse = serde_json::from_slice(body)?;
    if let Some(error) = response.error {
        return Err(RpcError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(quantity: &str) -> Result<u64, RpcError> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::InvalidResponse(format!("quantity without 0x prefix: {quantity:?}")))?;
    if digits.is_empty() {
        return Err(RpcError::InvalidResponse("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("quantity {quantity:?}: {e}")))
}
