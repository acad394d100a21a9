//! Shopify webhook ingress.
//!
//! The signature is verified over the raw body bytes before the payload is
//! parsed or any task is dispatched; a mismatch is a 401, never retried.
//! Byte-identical duplicate deliveries are dropped by the idempotency
//! marker, but the real duplicate-order guarantee lives in the order
//! forwarder's dedup lookup - a redelivery with any byte changed still
//! cannot create a second sales order.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use metrics::counter;
use serde_json::json;
use tracing::{info, instrument};

use saltbridge_sync::SyncCommand;
use saltbridge_sync::metrics::SHOPIFY_WEBHOOKS_RECEIVED_TOTAL;
use saltbridge_sync::orders::OrderPayload;
use saltbridge_sync::store::idempotency_key_for;

use crate::error::{AppError, Result};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "X-Shopify-Hmac-Sha256";
const TOPIC_HEADER: &str = "X-Shopify-Topic";

/// Receive one webhook delivery.
#[instrument(skip_all)]
pub async fn shopify_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !state.shopify().verify_webhook_signature(signature, &body) {
        return Err(AppError::Unauthorized("invalid webhook signature".into()));
    }

    let topic = headers
        .get(TOPIC_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();
    counter!(SHOPIFY_WEBHOOKS_RECEIVED_TOTAL, "topic" => topic.clone()).increment(1);

    let key = idempotency_key_for(&body);
    if !state.store().ensure_once(&key, &topic).await? {
        info!(topic, "duplicate webhook delivery dropped");
        return Ok(Json(json!({"ok": true, "duplicate": true})));
    }

    if topic == "orders/create" {
        let payload: OrderPayload = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("malformed order payload: {e}")))?;
        state
            .commands()
            .send(SyncCommand::PushOrder { payload })
            .await
            .map_err(|_| AppError::Internal("sync worker unavailable".into()))?;
    }

    Ok(Json(json!({"ok": true})))
}
