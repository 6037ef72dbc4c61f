//! Webhook payload envelope.

use serde::{Deserialize, Serialize};

/// Envelope of a webhook delivered by the Clientele API.
///
/// Only used for logging after the signature has been verified. Every field
/// is optional and unknown top-level fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "type")]
    pub action: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}
