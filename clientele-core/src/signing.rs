//! Signing strategies.
//!
//! Transactions are built locally but signed elsewhere. A [`DigestSigner`]
//! takes the 32-byte signing hash and returns an ECDSA signature with its
//! recovery id; the transaction builder assembles the rest.

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use clientele_sdk::client::{ClientError, ClienteleClient};
use clientele_sdk::objects::DigestSignature;
use secrecy::SecretString;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while obtaining a signature.
#[derive(Debug, Error)]
pub enum SignError {
    /// The remote signing service could not be reached or refused.
    #[error("remote signer error: {0}")]
    Remote(#[from] ClientError),

    /// The signer answered with something that is not a usable signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// A secp256k1 signature over a prehashed digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: U256,
    pub s: U256,
    /// 0 or 1.
    pub recovery_id: u8,
}

impl RecoverableSignature {
    pub fn new(r: U256, s: U256, recovery_id: u8) -> Result<Self, SignError> {
        if recovery_id > 1 {
            return Err(SignError::InvalidSignature(format!(
                "recovery id must be 0 or 1, got {recovery_id}"
            )));
        }
        if r.is_zero() || s.is_zero() {
            return Err(SignError::InvalidSignature("r and s must be non-zero".into()));
        }
        Ok(Self { r, s, recovery_id })
    }

    /// Parse hex `r`/`s` values, with or without `0x` prefix and leading
    /// zeros.
    pub fn from_hex_parts(r: &str, s: &str, recovery_id: u8) -> Result<Self, SignError> {
        Self::new(parse_scalar("r", r)?, parse_scalar("s", s)?, recovery_id)
    }
}

impl TryFrom<DigestSignature> for RecoverableSignature {
    type Error = SignError;

    fn try_from(sig: DigestSignature) -> Result<Self, Self::Error> {
        Self::from_hex_parts(&sig.r, &sig.s, sig.recover)
    }
}

fn parse_scalar(name: &str, value: &str) -> Result<U256, SignError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() || digits.len() > 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SignError::InvalidSignature(format!(
            "{name} is not a 256-bit hex value: {value:?}"
        )));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| SignError::InvalidSignature(format!("{name}: {e}")))
}

/// Capability to sign a 32-byte digest.
#[async_trait]
pub trait DigestSigner: Send + Sync {
    async fn sign_digest(&self, digest: B256) -> Result<RecoverableSignature, SignError>;
}

/// Signs digests with an Upvest-managed wallet through the General Purpose
/// Signing Interface.
#[derive(Debug)]
pub struct GpsiSigner {
    client: ClienteleClient,
    wallet_id: Uuid,
    password: SecretString,
}

impl GpsiSigner {
    pub fn new(client: ClienteleClient, wallet_id: Uuid, password: impl Into<SecretString>) -> Self {
        Self {
            client,
            wallet_id,
            password: password.into(),
        }
    }
}

#[async_trait]
impl DigestSigner for GpsiSigner {
    async fn sign_digest(&self, digest: B256) -> Result<RecoverableSignature, SignError> {
        let hex_digest = hex::encode(digest);
        let signature = self
            .client
            .sign_digest(self.wallet_id, &self.password, &hex_digest)
            .await?;
        tracing::debug!(wallet_id = %self.wallet_id, recover = signature.recover, "Digest signed");
        signature.try_into()
    }
}
