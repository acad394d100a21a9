//! Typed sync commands and their worker loop.
//!
//! Every sync operation is a [`SyncCommand`] variant routed through one
//! [`SyncContext::execute`] function, so the whole pipeline is testable
//! without any queue. At runtime the server feeds commands through an mpsc
//! channel into [`run_worker`], which spawns each command as its own unit
//! of work: units run concurrently with each other, each unit is
//! internally sequential, and no ordering holds between units - tolerable
//! because every write is idempotent by value or dedup-guarded.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

use saltbridge_core::{
    InventorySetResult, ItemNumber, LocationId, OrderPushOutcome, ReconciliationReport, Sku,
    SkuMap, SyncCounts, UpsertOutcome,
};

use crate::bc365::Bc365Client;
use crate::error::SyncError;
use crate::inventory::InventoryReconciler;
use crate::orders::{OrderForwarder, OrderPayload};
use crate::products::CatalogPublisher;
use crate::reconciliation;
use crate::retry::RetryPolicy;
use crate::shopify::ShopifyClient;

/// One dispatchable unit of sync work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SyncCommand {
    /// Bulk inventory reconciliation; empty filter means the full catalog.
    SyncInventory { item_numbers: Vec<ItemNumber> },
    /// Single-SKU inventory set.
    SetInventory {
        sku: Sku,
        available: i64,
        location_id: Option<LocationId>,
    },
    /// Forward one order to Business Central.
    PushOrder { payload: OrderPayload },
    /// Bulk catalog upsert.
    BulkUpsertProducts,
    /// Periodic reconciliation report.
    RunReconciliation,
}

impl SyncCommand {
    /// Stable name for logs and retry labels.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SyncInventory { .. } => "sync_inventory",
            Self::SetInventory { .. } => "set_inventory_for_sku",
            Self::PushOrder { .. } => "push_order",
            Self::BulkUpsertProducts => "bulk_upsert_products",
            Self::RunReconciliation => "run_reconciliation",
        }
    }

    /// Task-layer retry policy for this command.
    ///
    /// Bulk runs and order pushes get the open-ended task policy; the
    /// single-SKU set uses the bounded fixed-backoff policy instead.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::SetInventory { .. } => RetryPolicy::single_item(),
            _ => RetryPolicy::task(),
        }
    }
}

/// Result payload of one executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Inventory(SyncCounts),
    InventorySet(InventorySetResult),
    Order(OrderPushOutcome),
    Upsert(UpsertOutcome),
    Reconciliation(ReconciliationReport),
}

/// The wired-up pipeline: both adapters plus the mapping table.
#[derive(Clone)]
pub struct SyncContext {
    reconciler: InventoryReconciler,
    forwarder: OrderForwarder,
    publisher: CatalogPublisher,
}

impl SyncContext {
    /// Wire the pipeline over the two adapters and the override map.
    #[must_use]
    pub fn new(shopify: ShopifyClient, bc365: Bc365Client, sku_map: SkuMap) -> Self {
        Self {
            reconciler: InventoryReconciler::new(shopify.clone(), bc365.clone(), sku_map.clone()),
            forwarder: OrderForwarder::new(bc365.clone(), sku_map),
            publisher: CatalogPublisher::new(shopify, bc365),
        }
    }

    /// The inventory reconciler, for callers that bypass dispatch.
    #[must_use]
    pub const fn reconciler(&self) -> &InventoryReconciler {
        &self.reconciler
    }

    /// The order forwarder, for callers that bypass dispatch.
    #[must_use]
    pub const fn forwarder(&self) -> &OrderForwarder {
        &self.forwarder
    }

    /// Route one command to its operation, without task-layer retry.
    ///
    /// # Errors
    ///
    /// Propagates the operation's [`SyncError`].
    pub async fn execute(&self, command: &SyncCommand) -> Result<TaskResult, SyncError> {
        match command {
            SyncCommand::SyncInventory { item_numbers } => {
                let filter = (!item_numbers.is_empty()).then_some(item_numbers.as_slice());
                self.reconciler
                    .sync_inventory_levels(filter)
                    .await
                    .map(TaskResult::Inventory)
            }
            SyncCommand::SetInventory {
                sku,
                available,
                location_id,
            } => self
                .reconciler
                .set_inventory_for_sku(sku, *available, *location_id)
                .await
                .map(TaskResult::InventorySet),
            SyncCommand::PushOrder { payload } => self
                .forwarder
                .push_order(payload)
                .await
                .map(TaskResult::Order),
            SyncCommand::BulkUpsertProducts => self
                .publisher
                .bulk_upsert_products()
                .await
                .map(TaskResult::Upsert),
            SyncCommand::RunReconciliation => {
                Ok(TaskResult::Reconciliation(reconciliation::run_reconciliation()))
            }
        }
    }

    /// Execute one command under its task-layer retry policy.
    ///
    /// # Errors
    ///
    /// Returns the final error once the policy gives up on a transient
    /// failure, or immediately for permanent ones.
    pub async fn execute_with_retry(&self, command: &SyncCommand) -> Result<TaskResult, SyncError> {
        command
            .retry_policy()
            .run(command.label(), || self.execute(command))
            .await
    }
}

/// Drain the command channel, spawning each command as its own unit.
///
/// Runs until every sender is dropped. Failures are reported via the log
/// stream, not to any waiting caller.
pub async fn run_worker(ctx: SyncContext, mut rx: mpsc::Receiver<SyncCommand>) {
    while let Some(command) = rx.recv().await {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let label = command.label();
            match ctx.execute_with_retry(&command).await {
                Ok(result) => info!(task = label, result = ?result, "task finished"),
                Err(err) => error!(task = label, error = %err, "task failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_round_trips_through_serde() {
        let command = SyncCommand::SetInventory {
            sku: Sku::new("X1"),
            available: 5,
            location_id: Some(LocationId::new(9)),
        };
        let json = serde_json::to_string(&command).expect("serialize");
        let back: SyncCommand = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.label(), "set_inventory_for_sku");
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(SyncCommand::BulkUpsertProducts.label(), "bulk_upsert_products");
        assert_eq!(SyncCommand::RunReconciliation.label(), "run_reconciliation");
        assert_eq!(
            SyncCommand::SyncInventory {
                item_numbers: Vec::new()
            }
            .label(),
            "sync_inventory"
        );
    }
}
