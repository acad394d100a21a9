//! The exported metric name contract.
//!
//! Dashboards and alerts reference these names, so they are part of the
//! external interface: rename one and somebody's panel goes blank.
//! Counters are process-wide and monotonic; they never reset within the
//! process lifetime.

use metrics::{describe_counter, describe_histogram};

/// Inventory updates pushed to Shopify.
pub const SHOPIFY_INVENTORY_UPDATES_TOTAL: &str = "shopify_inventory_updates_total";
/// Latency of one Shopify inventory-set call.
pub const INVENTORY_UPDATE_SECONDS: &str = "inventory_update_seconds";
/// Per-item attempts inside inventory runs (labeled by `source`).
pub const INVENTORY_UPDATES_ATTEMPTED: &str = "inventory_updates_attempted_total";
/// Per-item successes inside inventory runs (labeled by `source`).
pub const INVENTORY_UPDATES_SUCCEEDED: &str = "inventory_updates_succeeded_total";
/// Per-item failures inside inventory runs (labeled by `source`).
pub const INVENTORY_UPDATES_FAILED: &str = "inventory_updates_failed_total";
/// Latency of a whole inventory reconciliation run.
pub const INVENTORY_SYNC_SECONDS: &str = "inventory_sync_seconds";

/// Webhook deliveries received (labeled by `topic`).
pub const SHOPIFY_WEBHOOKS_RECEIVED_TOTAL: &str = "shopify_webhooks_received_total";

/// Sales orders created in Business Central.
pub const BC_ORDERS_PUSHED_TOTAL: &str = "bc_orders_pushed_total";
/// Order pushes answered by the external-document-number dedup lookup.
pub const BC_ORDERS_DEDUPED_TOTAL: &str = "bc_orders_deduped_total";
/// Latency of one order push to Business Central.
pub const BC_ORDER_PUSH_SECONDS: &str = "bc_order_push_seconds";

/// Value of the `source` label on inventory counters.
pub const SOURCE_BC_TO_SHOPIFY: &str = "bc_to_shopify";

/// Register descriptions with the installed recorder.
///
/// Call once at startup, after the exporter is installed.
pub fn describe() {
    describe_counter!(
        SHOPIFY_INVENTORY_UPDATES_TOTAL,
        "Inventory updates pushed to Shopify"
    );
    describe_histogram!(
        INVENTORY_UPDATE_SECONDS,
        "Latency updating inventory in Shopify (seconds)"
    );
    describe_counter!(INVENTORY_UPDATES_ATTEMPTED, "Inventory update attempts");
    describe_counter!(
        INVENTORY_UPDATES_SUCCEEDED,
        "Successful inventory level updates"
    );
    describe_counter!(INVENTORY_UPDATES_FAILED, "Failed inventory level updates");
    describe_histogram!(INVENTORY_SYNC_SECONDS, "Latency syncing inventory");
    describe_counter!(SHOPIFY_WEBHOOKS_RECEIVED_TOTAL, "Shopify webhooks received");
    describe_counter!(BC_ORDERS_PUSHED_TOTAL, "BC sales orders created");
    describe_counter!(
        BC_ORDERS_DEDUPED_TOTAL,
        "BC orders deduped by externalDocumentNumber"
    );
    describe_histogram!(BC_ORDER_PUSH_SECONDS, "Latency pushing order to BC");
}
