//! Saltbridge Server - webhook ingress, OAuth install flow, and schedulers.
//!
//! This binary serves the synchronization service on port 8000.
//!
//! # Architecture
//!
//! - Axum routes for webhook ingress, the OAuth install flow, manual sync
//!   triggers, health, and Prometheus metrics
//! - An in-process worker draining the typed sync command channel; each
//!   command runs as its own concurrent unit under the task retry policy
//! - Fixed-interval schedules feeding the same channel
//! - `PostgreSQL` for the two small lookup tables (shop tokens,
//!   idempotency markers)
//!
//! All actual synchronization logic lives in `saltbridge-sync`; this
//! binary only wires it to HTTP, the scheduler, and observability.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

mod config;
mod error;
mod middleware;
mod routes;
mod scheduler;
mod state;

use config::ServerConfig;
use sentry::integrations::tracing as sentry_tracing;
use state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saltbridge_sync::bc365::Bc365Client;
use saltbridge_sync::dispatch::run_worker;
use saltbridge_sync::shopify::ShopifyClient;
use saltbridge_sync::{SyncCommand, SyncContext};

/// Commands buffered between ingress and the worker.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env in development; absent files are fine
    dotenvy::dotenv().ok();

    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "saltbridge_server=info,saltbridge_sync=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Install the Prometheus recorder before anything emits a metric
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");
    saltbridge_sync::metrics::describe();

    // Initialize database connection pool and run migrations
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.expose_secret())
        .await
        .expect("Failed to create database pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Database pool created");

    // Build the two API clients and the sync pipeline
    let shopify = ShopifyClient::new(&config.sync.shopify).expect("Failed to build Shopify client");
    let bc365 = Bc365Client::new(&config.sync.bc365).expect("Failed to build BC365 client");
    let context = SyncContext::new(shopify.clone(), bc365, config.sync.sku_map.clone());

    // Start the sync worker and the periodic schedules
    let (commands_tx, commands_rx) =
        tokio::sync::mpsc::channel::<SyncCommand>(COMMAND_CHANNEL_CAPACITY);
    tokio::spawn(run_worker(context, commands_rx));
    scheduler::spawn_schedules(commands_tx.clone());

    // Build application state
    let state = AppState::new(config.clone(), pool, shopify, commands_tx, prometheus);

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("saltbridge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
