//! Core types for Saltbridge.
//!
//! Newtype wrappers keep the two external identity schemes apart: Shopify
//! hands out numeric IDs (variants, products, inventory items, locations)
//! while Business Central keys everything by string item numbers and GUID
//! company ids. Mixing them up is a compile error here, not a 404 in
//! production.

mod document;
mod id;
mod outcome;
mod sku;

pub use document::ExternalDocumentNumber;
pub use id::{InventoryItemId, LocationId, ProductId, VariantId, WebhookId};
pub use outcome::{
    InventorySetResult, ItemSyncOutcome, OrderPushOutcome, ReconciliationReport, SkipReason,
    SyncCounts, UpsertOutcome,
};
pub use sku::{CompanyId, ItemNumber, Sku};
