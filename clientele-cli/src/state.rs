//! Application state shared across all request handlers.

use clientele_sdk::signature::WebhookSecret;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Shared secret webhook signatures are checked against.
    pub secret: Arc<WebhookSecret>,
}

impl AppState {
    pub fn new(secret: WebhookSecret) -> Self {
        Self {
            secret: Arc::new(secret),
        }
    }
}
