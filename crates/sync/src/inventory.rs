//! The Business Central to Shopify inventory reconciler.
//!
//! Pulls BC stock levels, matches them to Shopify variants by SKU (through
//! the override map), and pushes the deltas. Per-item failures are
//! classified explicitly: an unmapped variant is skipped and counted, any
//! other permanent failure is skipped and counted, but a transient failure
//! escalates to the whole run so the outer retry policy re-executes it end
//! to end. Re-running is safe because the inventory write is idempotent by
//! value.

use std::time::Instant;

use metrics::{counter, histogram};
use rust_decimal::prelude::ToPrimitive;
use tracing::{error, info, instrument, warn};

use saltbridge_core::{
    InventorySetResult, ItemNumber, ItemSyncOutcome, LocationId, SkipReason, Sku, SkuMap,
    SyncCounts,
};

use crate::bc365::{Bc365Client, Item};
use crate::error::SyncError;
use crate::metrics::{
    INVENTORY_SYNC_SECONDS, INVENTORY_UPDATE_SECONDS, INVENTORY_UPDATES_ATTEMPTED,
    INVENTORY_UPDATES_FAILED, INVENTORY_UPDATES_SUCCEEDED, SHOPIFY_INVENTORY_UPDATES_TOTAL,
    SOURCE_BC_TO_SHOPIFY,
};
use crate::retry::Classify;
use crate::shopify::ShopifyClient;

/// Reconciles BC item stock into Shopify inventory levels.
#[derive(Clone)]
pub struct InventoryReconciler {
    shopify: ShopifyClient,
    bc365: Bc365Client,
    sku_map: SkuMap,
}

impl InventoryReconciler {
    /// Create a reconciler over the two adapters and the override map.
    #[must_use]
    pub fn new(shopify: ShopifyClient, bc365: Bc365Client, sku_map: SkuMap) -> Self {
        Self {
            shopify,
            bc365,
            sku_map,
        }
    }

    /// Sync BC item inventory into Shopify levels, by SKU.
    ///
    /// An empty `item_numbers` filter syncs the full catalog window. One
    /// target location is resolved for the whole run.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NoLocation`] when no location can be resolved;
    /// - [`SyncError::TransientRun`] when any single item hit a transient
    ///   upstream failure - callers are expected to re-run;
    /// - adapter errors from the initial item fetch.
    #[instrument(skip(self, item_numbers))]
    pub async fn sync_inventory_levels(
        &self,
        item_numbers: Option<&[ItemNumber]>,
    ) -> Result<SyncCounts, SyncError> {
        let run_start = Instant::now();

        let location_id = self
            .shopify
            .resolve_location_id()
            .await?
            .ok_or(SyncError::NoLocation)?;
        let items = self.bc365.fetch_items(item_numbers).await?;

        let mut counts = SyncCounts::default();
        for item in &items {
            counts.attempted += 1;
            match self.sync_one(item, location_id).await {
                ItemSyncOutcome::Updated => {
                    counts.updated += 1;
                    counter!(INVENTORY_UPDATES_SUCCEEDED, "source" => SOURCE_BC_TO_SHOPIFY)
                        .increment(1);
                }
                ItemSyncOutcome::Skipped(reason) => {
                    counts.failed += 1;
                    counter!(INVENTORY_UPDATES_FAILED, "source" => SOURCE_BC_TO_SHOPIFY)
                        .increment(1);
                    warn!(item = %item.number, %reason, "inventory item skipped");
                }
                ItemSyncOutcome::Transient(message) => {
                    histogram!(INVENTORY_SYNC_SECONDS).record(run_start.elapsed().as_secs_f64());
                    return Err(SyncError::TransientRun {
                        item: item.number.clone(),
                        message,
                    });
                }
            }
        }

        histogram!(INVENTORY_SYNC_SECONDS).record(run_start.elapsed().as_secs_f64());
        info!(
            attempted = counts.attempted,
            updated = counts.updated,
            failed = counts.failed,
            location_id = %location_id,
            "inventory sync finished"
        );
        Ok(counts)
    }

    /// Process one BC item; never returns an error, only a classification.
    async fn sync_one(&self, item: &Item, location_id: LocationId) -> ItemSyncOutcome {
        let sku = self.sku_map.to_sku(&item.number);
        counter!(INVENTORY_UPDATES_ATTEMPTED, "source" => SOURCE_BC_TO_SHOPIFY).increment(1);

        let variant = match self.shopify.find_variant_by_sku(&sku).await {
            Ok(Some(variant)) => variant,
            Ok(None) => {
                warn!(sku = %sku, bc_number = %item.number, "shopify variant not found");
                return ItemSyncOutcome::Skipped(SkipReason::VariantNotFound(sku));
            }
            Err(err) if err.is_transient() => return ItemSyncOutcome::Transient(err.to_string()),
            Err(err) => return ItemSyncOutcome::Skipped(SkipReason::Other(err.to_string())),
        };

        let qty = available_quantity(item);
        let update_start = Instant::now();
        match self
            .shopify
            .set_inventory_level(variant.inventory_item_id, location_id, qty)
            .await
        {
            Ok(_) => {
                histogram!(INVENTORY_UPDATE_SECONDS)
                    .record(update_start.elapsed().as_secs_f64());
                counter!(SHOPIFY_INVENTORY_UPDATES_TOTAL).increment(1);
                info!(sku = %sku, bc_number = %item.number, location_id = %location_id, qty, "inventory set");
                ItemSyncOutcome::Updated
            }
            Err(err) if err.is_transient() => {
                error!(sku = %sku, bc_number = %item.number, error = %err, "transient inventory update failure");
                ItemSyncOutcome::Transient(err.to_string())
            }
            Err(err) => {
                error!(sku = %sku, bc_number = %item.number, error = %err, "inventory update failure");
                ItemSyncOutcome::Skipped(SkipReason::Other(err.to_string()))
            }
        }
    }

    /// Set a single variant's available inventory by SKU.
    ///
    /// A missing variant is a structured non-fatal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoLocation`] when no location can be resolved,
    /// or an adapter error from the lookup or write.
    #[instrument(skip(self))]
    pub async fn set_inventory_for_sku(
        &self,
        sku: &Sku,
        available: i64,
        location_id: Option<LocationId>,
    ) -> Result<InventorySetResult, SyncError> {
        let Some(variant) = self.shopify.find_variant_by_sku(sku).await? else {
            warn!(sku = %sku, "variant not found for single-SKU set");
            return Ok(InventorySetResult::VariantNotFound { sku: sku.clone() });
        };

        let location_id = match location_id {
            Some(id) => id,
            None => self
                .shopify
                .resolve_location_id()
                .await?
                .ok_or(SyncError::NoLocation)?,
        };

        let update_start = Instant::now();
        self.shopify
            .set_inventory_level(variant.inventory_item_id, location_id, available)
            .await?;
        histogram!(INVENTORY_UPDATE_SECONDS).record(update_start.elapsed().as_secs_f64());
        counter!(SHOPIFY_INVENTORY_UPDATES_TOTAL).increment(1);

        Ok(InventorySetResult::Updated {
            sku: sku.clone(),
            inventory_item_id: variant.inventory_item_id,
            location_id,
            available,
        })
    }
}

/// On-hand quantity of a BC item, truncated to whole units.
fn available_quantity(item: &Item) -> i64 {
    item.inventory
        .as_ref()
        .and_then(|qty| qty.trunc().to_i64())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_inventory(inventory: Option<f64>) -> Item {
        serde_json::from_value(serde_json::json!({
            "id": "guid-1",
            "number": "BC-100",
            "inventory": inventory,
        }))
        .expect("item")
    }

    #[test]
    fn quantity_truncates_to_whole_units() {
        assert_eq!(available_quantity(&item_with_inventory(Some(12.9))), 12);
        assert_eq!(available_quantity(&item_with_inventory(Some(12.0))), 12);
    }

    #[test]
    fn missing_inventory_counts_as_zero() {
        assert_eq!(available_quantity(&item_with_inventory(None)), 0);
    }
}
