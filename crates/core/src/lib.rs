//! Saltbridge Core - Shared types library.
//!
//! This crate provides common types used across all Saltbridge components:
//! - `sync` - Shopify/Business Central synchronization library
//! - `server` - Webhook ingress, OAuth install flow, and schedulers
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, SKUs, and sync outcomes
//! - [`sku_map`] - The configured SKU override table and its inverse

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod sku_map;
pub mod types;

pub use sku_map::{SkuMap, SkuMapError};
pub use types::*;
