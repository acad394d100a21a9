//! Result payloads produced by sync operations.
//!
//! These are the task results reported back to dispatchers and dashboards.
//! None of them are persisted; metrics carry the long-lived counterparts.

use serde::{Deserialize, Serialize};

use super::{InventoryItemId, LocationId, Sku};

/// Counters accumulated over one inventory reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    /// Items considered by the run.
    pub attempted: u64,
    /// Items whose inventory level was pushed successfully.
    pub updated: u64,
    /// Items skipped or failed non-fatally.
    pub failed: u64,
}

/// Classified result of a single item inside a bulk inventory run.
///
/// The aggregator decides what each classification means for the run as a
/// whole: `Skipped` increments the failed counter and the loop continues,
/// while a `Transient` anywhere converts the entire run into a retryable
/// failure once the loop has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSyncOutcome {
    /// The inventory level was set.
    Updated,
    /// The item could not be processed; not worth retrying the run for.
    Skipped(SkipReason),
    /// A rate-limit or upstream availability problem; the run should be
    /// re-executed by the outer retry policy.
    Transient(String),
}

/// Why a single item was skipped during a bulk inventory run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No Shopify variant carries the mapped SKU.
    VariantNotFound(Sku),
    /// Any other non-transient per-item failure.
    Other(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VariantNotFound(sku) => write!(f, "no variant with SKU {sku}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

/// Result of setting a single SKU's inventory level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InventorySetResult {
    /// The level was written to Shopify.
    Updated {
        sku: Sku,
        inventory_item_id: InventoryItemId,
        location_id: LocationId,
        available: i64,
    },
    /// No variant matched the SKU; non-fatal by policy.
    VariantNotFound { sku: Sku },
}

/// Result of forwarding one order to Business Central.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPushOutcome {
    /// Business Central sales order id.
    pub bc_id: String,
    /// Business Central sales order number.
    pub bc_no: String,
    /// Whether an existing order was found and no write happened.
    pub deduped: bool,
}

/// Result of a bulk product upsert run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// Products fetched from Business Central.
    pub total: u64,
    /// Products created or updated in Shopify.
    pub updated: u64,
}

/// Output of the periodic reconciliation report job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Records compared across the two systems.
    pub compared: u64,
    /// Records that disagreed.
    pub mismatches: u64,
    /// Agreement ratio.
    pub accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_counts_default_to_zero() {
        let counts = SyncCounts::default();
        assert_eq!(counts.attempted, 0);
        assert_eq!(counts.updated, 0);
        assert_eq!(counts.failed, 0);
    }

    #[test]
    fn inventory_set_result_tags_by_status() {
        let result = InventorySetResult::VariantNotFound {
            sku: Sku::new("MISSING"),
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["status"], "variant_not_found");
        assert_eq!(json["sku"], "MISSING");
    }
}
