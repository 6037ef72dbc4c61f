//! Webhook receiver.
//!
//! # Endpoints
//!
//! - `POST /webhook` – receive a signed callback from the Clientele API

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use clientele_sdk::objects::WebhookEvent;
use serde::Serialize;

use crate::api::extractors::VerifiedWebhook;
use crate::state::AppState;

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_webhook))
}

#[derive(Serialize)]
struct Ack {
    status: &'static str,
}

/// `POST /webhook`: log an authenticated callback.
async fn receive_webhook(VerifiedWebhook(event): VerifiedWebhook<WebhookEvent>) -> impl IntoResponse {
    tracing::info!(
        id = event.id.as_deref().unwrap_or("-"),
        action = event.action.as_deref().unwrap_or("-"),
        "Webhook received"
    );
    match serde_json::to_string(&event) {
        Ok(payload) => tracing::info!(%payload, "Webhook payload"),
        Err(e) => tracing::warn!("Failed to serialize webhook payload: {}", e),
    }
    (StatusCode::OK, Json(Ack { status: "ok" }))
}
