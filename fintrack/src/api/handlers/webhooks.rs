//! Purchase-platform webhook.
//!
//! The body is read raw so the signature is checked over the exact bytes that were sent.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use tracing::{info, warn};

use crate::{
    AppState,
    api::models::webhooks::WebhookAck,
    errors::{Error, Result},
    webhooks::{EventKind, parse_purchase_event, process_purchase_event, verify_signature},
};

fn check_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let config = &state.config.webhook;
    let Some(secret) = config.secret.as_deref() else {
        warn!("No webhook secret configured, accepting unsigned purchase webhook");
        return Ok(());
    };

    let signature = headers
        .get(config.signature_header.as_str())
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::Unauthenticated {
            message: Some("Missing webhook signature".to_string()),
        })?;

    if !verify_signature(body, signature, secret) {
        return Err(Error::Unauthenticated {
            message: Some("Invalid webhook signature".to_string()),
        });
    }
    Ok(())
}

/// Receive a purchase notification
///
/// Approvals create or reactivate the buyer's account, refunds and cancellations cancel it.
/// Unknown event names are acknowledged without changes.
#[utoipa::path(
    post,
    path = "/webhooks/purchases",
    tag = "webhooks",
    summary = "Purchase webhook",
    request_body(content = serde_json::Value, description = "Purchase notification in any of the supported shapes"),
    responses(
        (status = 200, description = "Event processed", body = WebhookAck),
        (status = 401, description = "Missing or invalid signature"),
        (status = 422, description = "Unrecognized payload"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn purchase_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<WebhookAck>> {
    check_signature(&state, &headers, &body)?;

    let event = parse_purchase_event(&body)?;
    let kind = EventKind::classify(&event.event, &state.config.webhook);
    info!(event = %event.event, kind = ?kind, "Purchase webhook received");

    let ack = process_purchase_event(&state.db, &state.email, kind, &event).await?;
    Ok(Json(ack))
}
