//! General Purpose Signing Interface (GPSI) bodies.

use serde::{Deserialize, Serialize};

/// Request body of `POST kms/wallets/{wallet_id}/sign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignDigestRequest<'a> {
    pub password: &'a str,
    /// The digest to sign, encoded as described by `input_format`.
    pub to_sign: &'a str,
    pub input_format: &'static str,
    pub output_format: &'static str,
}

impl<'a> SignDigestRequest<'a> {
    /// A request for a hex digest with hex encoded output.
    pub fn hex(password: &'a str, hex_digest: &'a str) -> Self {
        Self {
            password,
            to_sign: hex_digest,
            input_format: "hex",
            output_format: "hex",
        }
    }
}

/// ECDSA signature returned by the signing endpoint.
///
/// `r` and `s` are hex strings, possibly `0x`-prefixed and possibly shorter
/// than 32 bytes; `recover` is the recovery id (0 or 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSignature {
    pub r: String,
    pub s: String,
    #[serde(deserialize_with = "recovery_id")]
    pub recover: u8,
    #[serde(default)]
    pub public_key: Option<serde_json::Value>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub curve: Option<String>,
}

/// The recovery id is sent as a number by some API versions and as a
/// string by others.
fn recovery_id<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u8),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
