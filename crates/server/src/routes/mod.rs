//! HTTP route handlers.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};

use crate::state::AppState;

pub mod health;
pub mod oauth;
pub mod sync;
pub mod webhooks;

/// All server routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics))
        .route("/webhooks/shopify", post(webhooks::shopify_webhook))
        .route("/oauth/install", get(oauth::install))
        .route("/oauth/callback", get(oauth::callback))
        .route("/sync/products/bulk", post(sync::trigger_products_bulk))
        .route("/sync/inventory", post(sync::trigger_inventory_sync))
        .route("/sync/orders/push", post(sync::push_order))
}

/// Prometheus text exposition.
async fn metrics(State(state): State<AppState>) -> String {
    state.prometheus().render()
}
