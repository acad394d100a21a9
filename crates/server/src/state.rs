//! Application state shared across handlers.

use std::collections::HashSet;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use tokio::sync::{Mutex, mpsc};

use saltbridge_sync::shopify::ShopifyClient;
use saltbridge_sync::store::SyncStore;
use saltbridge_sync::SyncCommand;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the database pool, the
/// two API clients, the command channel into the worker, and the
/// Prometheus render handle.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    store: SyncStore,
    shopify: ShopifyClient,
    commands: mpsc::Sender<SyncCommand>,
    prometheus: PrometheusHandle,
    /// OAuth state nonces awaiting their callback. In-memory, so the
    /// install flow only works on single-instance deployments.
    oauth_nonces: Mutex<HashSet<String>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
        shopify: ShopifyClient,
        commands: mpsc::Sender<SyncCommand>,
        prometheus: PrometheusHandle,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store: SyncStore::new(pool.clone()),
                config,
                pool,
                shopify,
                commands,
                prometheus,
                oauth_nonces: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Shop-token and idempotency-key store.
    #[must_use]
    pub fn store(&self) -> &SyncStore {
        &self.inner.store
    }

    /// The configured store's Shopify client.
    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }

    /// Sender feeding the sync worker.
    #[must_use]
    pub fn commands(&self) -> &mpsc::Sender<SyncCommand> {
        &self.inner.commands
    }

    /// Prometheus render handle for the metrics endpoint.
    #[must_use]
    pub fn prometheus(&self) -> &PrometheusHandle {
        &self.inner.prometheus
    }

    /// Record a fresh OAuth state nonce.
    pub async fn insert_oauth_nonce(&self, nonce: String) {
        self.inner.oauth_nonces.lock().await.insert(nonce);
    }

    /// Consume an OAuth state nonce; `true` when it was outstanding.
    pub async fn take_oauth_nonce(&self, nonce: &str) -> bool {
        self.inner.oauth_nonces.lock().await.remove(nonce)
    }
}
