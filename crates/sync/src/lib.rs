//! Saltbridge Sync - the Shopify/Business Central reconciliation pipeline.
//!
//! This crate contains everything that moves data between the two systems:
//!
//! - [`shopify`] - REST Admin API client (variants, locations, inventory
//!   levels, products, webhooks) with rate-limit-aware pacing
//! - [`bc365`] - Business Central API client (companies, items, sales
//!   orders) with OAuth client-credential token caching
//! - [`retry`] - transient/permanent failure classification and the shared
//!   exponential-backoff retry wrapper
//! - [`inventory`] - the BC -> Shopify inventory level reconciler
//! - [`orders`] - the Shopify -> BC order forwarder with external-document-
//!   number dedup
//! - [`products`] - the BC -> Shopify catalog bulk upsert
//! - [`dispatch`] - the typed sync command set and its worker loop
//! - [`store`] - shop OAuth tokens and idempotency markers in Postgres
//! - [`metrics`] - the exported metric name contract
//!
//! # Architecture
//!
//! Each sync operation is an independently dispatched unit of work; units
//! run concurrently but each unit is internally sequential. Every write is
//! idempotent by value (inventory set) or guarded by a dedup lookup (order
//! push), so no ordering is required between units.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bc365;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod reconciliation;
pub mod retry;
pub mod shopify;
pub mod store;

pub use config::{Bc365Config, ConfigError, ShopifyConfig, SyncConfig};
pub use dispatch::{SyncCommand, SyncContext, TaskResult};
pub use error::SyncError;
pub use retry::{Classify, FailureClass, RetryPolicy};
