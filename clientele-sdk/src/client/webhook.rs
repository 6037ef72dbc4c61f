//! Webhook verification helper.
//!
//! Convenience wrapper around [`verify_signature`] that also decodes the
//! authenticated JSON payload.

use crate::signature::{verify_signature, SignatureError, WebhookRequest, WebhookSecret};

/// Why an incoming webhook was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum WebhookRejection {
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Verify and deserialize an incoming Clientele webhook.
///
/// The body is only parsed after the signature over the raw bytes has been
/// checked.
///
/// # Example
///
/// ```ignore
/// use clientele_sdk::client::verify_webhook;
/// use clientele_sdk::objects::WebhookEvent;
///
/// let event: WebhookEvent = verify_webhook(&request, &secret)?;
/// ```
pub fn verify_webhook<T: serde::de::DeserializeOwned>(
    request: &WebhookRequest,
    secret: &WebhookSecret,
) -> Result<T, WebhookRejection> {
    verify_signature(request, secret)?;
    Ok(serde_json::from_slice(request.raw_body())?)
}
