//! Manually-triggered sync operations.
//!
//! Each trigger enqueues a command for the sync worker and returns
//! immediately; results are reported via the log stream and metrics, not
//! to the waiting caller. All routes require the admin bearer token.

use axum::Json;
use axum::extract::State;
use serde_json::json;

use saltbridge_sync::SyncCommand;
use saltbridge_sync::orders::OrderPayload;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminToken;
use crate::state::AppState;

/// Enqueue a bulk catalog upsert.
pub async fn trigger_products_bulk(
    _: RequireAdminToken,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>> {
    enqueue(&state, SyncCommand::BulkUpsertProducts).await
}

/// Enqueue a full-catalog inventory sync.
pub async fn trigger_inventory_sync(
    _: RequireAdminToken,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>> {
    enqueue(
        &state,
        SyncCommand::SyncInventory {
            item_numbers: Vec::new(),
        },
    )
    .await
}

/// Enqueue an order push with an explicit payload.
pub async fn push_order(
    _: RequireAdminToken,
    State(state): State<AppState>,
    Json(payload): Json<OrderPayload>,
) -> Result<Json<serde_json::Value>> {
    enqueue(&state, SyncCommand::PushOrder { payload }).await
}

async fn enqueue(state: &AppState, command: SyncCommand) -> Result<Json<serde_json::Value>> {
    let label = command.label();
    state
        .commands()
        .send(command)
        .await
        .map_err(|_| AppError::Internal("sync worker unavailable".into()))?;
    Ok(Json(json!({ "queued": label })))
}
