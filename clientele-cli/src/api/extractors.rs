//! Custom Axum extractors for request authentication.
//!
//! Provides `VerifiedWebhook<T>`, which checks the `X-UP-Signature` header
//! against the raw request body before deserializing it.
//!
//! All cryptographic operations are delegated to
//! [`clientele_sdk::signature`].

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use clientele_sdk::client::{WebhookRejection, verify_webhook};
use clientele_sdk::signature::{SignatureError, WebhookRequest};
use serde::de::DeserializeOwned;

use crate::state::AppState;

/// Largest webhook body we are willing to buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// An Axum extractor that verifies the `X-UP-Signature` header and
/// deserializes the authenticated JSON body.
///
/// # Header format
///
/// ```text
/// X-UP-Signature: sha256={lowercase_hex_hmac}
/// ```
///
/// The signature is computed as `HMAC-SHA256(raw_body, webhook_secret)`.
/// Header names are matched after normalization, so proxies that rewrite
/// them (e.g. `HTTP_X_UP_SIGNATURE`) are accepted.
pub struct VerifiedWebhook<T>(pub T);

/// Errors that can occur during webhook verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifiedWebhookError {
    #[error("failed to read request body")]
    BodyReadError,
    #[error("signature verification failed: {0}")]
    Signature(SignatureError),
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
}

impl From<WebhookRejection> for VerifiedWebhookError {
    fn from(err: WebhookRejection) -> Self {
        match err {
            WebhookRejection::Signature(e) => Self::Signature(e),
            WebhookRejection::Json(e) => Self::JsonError(e),
        }
    }
}

impl IntoResponse for VerifiedWebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Missing, malformed and wrong signatures all look the same
            // from the outside.
            VerifiedWebhookError::Signature(_) => {
                (StatusCode::UNAUTHORIZED, "signature verification failed")
            }
            VerifiedWebhookError::BodyReadError => {
                (StatusCode::BAD_REQUEST, "failed to read request body")
            }
            VerifiedWebhookError::JsonError(_) => (StatusCode::BAD_REQUEST, "invalid JSON body"),
        };
        (status, message).into_response()
    }
}

impl<T: DeserializeOwned + Send> FromRequest<AppState> for VerifiedWebhook<T> {
    type Rejection = VerifiedWebhookError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| VerifiedWebhookError::BodyReadError)?;

        // Non-UTF-8 header values cannot carry a valid signature anyway.
        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));
        let request = WebhookRequest::from_parts(headers, body_bytes);

        let payload = verify_webhook(&request, &state.secret).map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook");
            VerifiedWebhookError::from(e)
        })?;

        Ok(VerifiedWebhook(payload))
    }
}
