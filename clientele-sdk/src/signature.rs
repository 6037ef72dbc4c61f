//! Webhook signature verification.
//!
//! The Clientele API signs every webhook it delivers with the HMAC secret
//! shared with the receiver. The wire format for the header is:
//!
//! ```text
//! X-UP-Signature: sha256={lowercase_hex(HMAC-SHA256(raw_body, secret))}
//! ```
//!
//! The digest covers the exact bytes of the request body. Re-serializing a
//! parsed JSON body before verification will break the signature.

use bytes::Bytes;
use ring::hmac;
use secrecy::{ExposeSecret, SecretSlice};

/// Canonical (normalized) name of the signature header.
pub const SIGNATURE_HEADER: &str = "x-up-signature";

/// Scheme prefix of the signature header value.
pub const SIGNATURE_SCHEME: &str = "sha256=";

/// Prefix some gateways put in front of forwarded header names
/// (`HTTP_X_UP_SIGNATURE` in CGI-style environments).
const GATEWAY_PREFIX: &str = "http-";

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Errors produced by signature operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("no X-UP-Signature header")]
    MissingSignature,
    #[error("invalid X-UP-Signature header format")]
    InvalidFormat,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("webhook secret must not be empty")]
    EmptySecret,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

// ---------------------------------------------------------------------------
// WebhookSecret
// ---------------------------------------------------------------------------

/// The HMAC secret shared with the Clientele API.
///
/// The bytes are zeroized on drop and never show up in `Debug` output.
pub struct WebhookSecret(SecretSlice<u8>);

impl WebhookSecret {
    /// Wrap a secret, rejecting an empty one.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, SignatureError> {
        let secret: Vec<u8> = secret.into();
        if secret.is_empty() {
            return Err(SignatureError::EmptySecret);
        }
        Ok(Self(SecretSlice::from(secret)))
    }

    fn key(&self) -> hmac::Key {
        hmac::Key::new(hmac::HMAC_SHA256, self.0.expose_secret())
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// WebhookRequest
// ---------------------------------------------------------------------------

/// An inbound webhook request as received by the transport.
///
/// Headers are kept in arrival order; lookups are case-insensitive and
/// tolerant of separator quirks (see [`normalize_header_name`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    headers: Vec<(String, String)>,
    raw_body: Bytes,
}

impl WebhookRequest {
    /// Create a request with no headers.
    pub fn new(raw_body: impl Into<Bytes>) -> Self {
        Self {
            headers: Vec::new(),
            raw_body: raw_body.into(),
        }
    }

    /// Build a request from `(name, value)` pairs and the raw body.
    pub fn from_parts<I, K, V>(headers: I, raw_body: impl Into<Bytes>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            raw_body: raw_body.into(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Iterate over the headers in arrival order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The exact body bytes the signature was computed over.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// Value of the signature header, if present.
    ///
    /// When several headers normalize to the canonical name the first one
    /// wins, so the result depends on header order for such input.
    pub fn signature_header(&self) -> Option<&str> {
        self.headers()
            .find(|(name, _)| is_signature_header(name))
            .map(|(_, value)| value)
    }
}

// ---------------------------------------------------------------------------
// Header name normalization
// ---------------------------------------------------------------------------

/// Normalize a header name: lowercase it, collapse every run of
/// non-alphabetic characters into a single `-` and trim leading and
/// trailing dashes.
///
/// `X-UP-Signature`, `x_up_signature` and ` X--UP  signature ` all become
/// `x-up-signature`. The function is idempotent.
pub fn normalize_header_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut separator = false;
    for c in name.chars() {
        if c.is_ascii_alphabetic() {
            if separator && !normalized.is_empty() {
                normalized.push('-');
            }
            separator = false;
            normalized.push(c.to_ascii_lowercase());
        } else {
            separator = true;
        }
    }
    normalized
}

/// Whether `name` refers to the `X-UP-Signature` header, allowing for an
/// `HTTP_` gateway prefix.
pub fn is_signature_header(name: &str) -> bool {
    let normalized = normalize_header_name(name);
    normalized == SIGNATURE_HEADER
        || normalized.strip_prefix(GATEWAY_PREFIX) == Some(SIGNATURE_HEADER)
}

// ---------------------------------------------------------------------------
// Signing / verification
// ---------------------------------------------------------------------------

/// Compute the full header value (`sha256={hex}`) for `raw_body`.
pub fn sign_body(raw_body: &[u8], secret: &WebhookSecret) -> String {
    let tag = hmac::sign(&secret.key(), raw_body);
    format!("{SIGNATURE_SCHEME}{}", hex::encode(tag.as_ref()))
}

/// Verify a webhook, reporting why it was rejected.
///
/// The header value must be exactly `sha256=` followed by 64 lowercase hex
/// characters. The digest itself is compared in constant time.
pub fn verify_signature(
    request: &WebhookRequest,
    secret: &WebhookSecret,
) -> Result<(), SignatureError> {
    let header = request
        .signature_header()
        .ok_or(SignatureError::MissingSignature)?;
    let digest = parse_signature_header(header)?;
    hmac::verify(&secret.key(), request.raw_body(), &digest)?;
    Ok(())
}

/// Verify a webhook. Any failure, including a missing header, is `false`.
pub fn verify(request: &WebhookRequest, secret: &WebhookSecret) -> bool {
    match verify_signature(request, secret) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Webhook signature rejected");
            false
        }
    }
}

/// Parse `sha256={hex}` into the raw digest bytes.
pub fn parse_signature_header(value: &str) -> Result<Vec<u8>, SignatureError> {
    let hex_digest = value
        .strip_prefix(SIGNATURE_SCHEME)
        .ok_or(SignatureError::InvalidFormat)?;
    let lowercase_hex = hex_digest
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if hex_digest.len() != DIGEST_HEX_LEN || !lowercase_hex {
        return Err(SignatureError::InvalidFormat);
    }
    hex::decode(hex_digest).map_err(|_| SignatureError::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"id":"a1b2","type":"ecdsa.signed","data":{"txhash":"0xabc"}}"#;

    fn secret() -> WebhookSecret {
        WebhookSecret::new("webhook-secret").unwrap()
    }

    fn signed_request(body: &[u8]) -> WebhookRequest {
        WebhookRequest::new(body.to_vec()).with_header("X-UP-Signature", sign_body(body, &secret()))
    }

    #[test]
    fn test_sign_body_known_vector() {
        let secret = WebhookSecret::new("key").unwrap();
        assert_eq!(
            sign_body(b"The quick brown fox jumps over the lazy dog", &secret),
            "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_valid_signature_accepted() {
        let request = signed_request(BODY);
        assert!(verify(&request, &secret()));
        assert_eq!(verify_signature(&request, &secret()), Ok(()));
    }

    #[test]
    fn test_altered_body_rejected() {
        let header = sign_body(BODY, &secret());
        for i in 0..BODY.len() {
            let mut tampered = BODY.to_vec();
            tampered[i] ^= 0x01;
            let request = WebhookRequest::new(tampered).with_header("X-UP-Signature", &header);
            assert!(!verify(&request, &secret()), "byte {i} flip went unnoticed");
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let request = signed_request(BODY);
        let other = WebhookSecret::new("another-secret").unwrap();
        assert_eq!(
            verify_signature(&request, &other),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_missing_header_is_false() {
        let request = WebhookRequest::new(BODY.to_vec())
            .with_header("Content-Type", "application/json")
            .with_header("X-UP-Signature-Version", "1");
        assert!(!verify(&request, &secret()));
        assert_eq!(
            verify_signature(&request, &secret()),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn test_header_name_variants_resolve() {
        let header = sign_body(BODY, &secret());
        for name in [
            "X-UP-Signature",
            "x-up-signature",
            "x_up_signature",
            "HTTP_X_UP_SIGNATURE",
            "-x--UP..signature-",
        ] {
            let request = WebhookRequest::new(BODY.to_vec()).with_header(name, &header);
            assert!(verify(&request, &secret()), "{name} not recognised");
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for name in ["X-UP-Signature", "x_up_signature", "HTTP_X_UP_SIGNATURE", "__a1b__"] {
            let once = normalize_header_name(name);
            assert_eq!(normalize_header_name(&once), once);
        }
        assert_eq!(normalize_header_name("X-UP-Signature"), SIGNATURE_HEADER);
        assert_eq!(normalize_header_name("x_up_signature"), SIGNATURE_HEADER);
        assert_eq!(normalize_header_name("HTTP_X_UP_SIGNATURE"), "http-x-up-signature");
        assert!(is_signature_header("HTTP_X_UP_SIGNATURE"));
        assert!(!is_signature_header("x-up-signatures"));
        assert!(!is_signature_header("x-signature"));
    }

    #[test]
    fn test_uppercase_digest_rejected() {
        let header = sign_body(BODY, &secret()).to_uppercase().replacen("SHA256=", "sha256=", 1);
        let request = WebhookRequest::new(BODY.to_vec()).with_header("X-UP-Signature", header);
        assert_eq!(
            verify_signature(&request, &secret()),
            Err(SignatureError::InvalidFormat)
        );
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let digest = sign_body(BODY, &secret());
        let bare = digest.trim_start_matches(SIGNATURE_SCHEME).to_owned();
        for value in [
            bare.clone(),
            format!("sha1={bare}"),
            format!("{digest}00"),
            digest[..digest.len() - 2].to_owned(),
            format!(" {digest}"),
            String::new(),
        ] {
            let request = WebhookRequest::new(BODY.to_vec()).with_header("X-UP-Signature", value);
            assert!(!verify(&request, &secret()));
        }
    }

    #[test]
    fn test_duplicate_headers_use_a_match() {
        let good = sign_body(BODY, &secret());
        let request = WebhookRequest::new(BODY.to_vec())
            .with_header("X-UP-Signature", &good)
            .with_header("x_up_signature", &good);
        assert!(verify(&request, &secret()));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert_eq!(
            WebhookSecret::new(Vec::new()).unwrap_err(),
            SignatureError::EmptySecret
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let debug = format!("{:?}", secret());
        assert!(!debug.contains("webhook-secret"));
    }
}
