//! The Shopify to Business Central order forwarder.
//!
//! Maps an `orders/create` webhook payload to a BC sales order document and
//! pushes it, deduplicating on the external document number. Duplicate
//! webhook deliveries therefore never create two BC orders: the dedup rests
//! entirely on the lookup-before-create, not on any queue-level guarantee.

use std::str::FromStr;
use std::time::Instant;

use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use saltbridge_core::{ExternalDocumentNumber, OrderPushOutcome, Sku, SkuMap};

use crate::bc365::{Bc365Client, NewSalesOrder, NewSalesOrderLine};
use crate::error::SyncError;
use crate::metrics::{BC_ORDER_PUSH_SECONDS, BC_ORDERS_DEDUPED_TOTAL, BC_ORDERS_PUSHED_TOTAL};

/// An `orders/create` webhook payload, reduced to the fields we map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Shopify order id; numeric in webhooks but tolerated as a string.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub line_items: Vec<OrderLine>,
}

/// One line item of an incoming order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub variant_id: Option<i64>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Decimal string in webhooks ("9.99"), tolerated as a number.
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
}

impl OrderPayload {
    /// The source order identifier as a string; empty when absent.
    #[must_use]
    pub fn source_id(&self) -> String {
        match &self.id {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

impl OrderLine {
    /// The raw identity of this line: SKU, else variant id, else product id.
    fn raw_sku(&self) -> Option<Sku> {
        self.sku
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Sku::new)
            .or_else(|| self.variant_id.map(|id| Sku::new(id.to_string())))
            .or_else(|| self.product_id.map(|id| Sku::new(id.to_string())))
    }

    /// Quantity, defaulting zero or missing values to 1.
    fn effective_quantity(&self) -> i64 {
        self.quantity.filter(|qty| *qty != 0).unwrap_or(1)
    }

    /// Unit price parsed from either representation; `None` when absent or
    /// unparsable (the BC line then omits the field).
    fn unit_price(&self) -> Option<Decimal> {
        match &self.price {
            Some(serde_json::Value::String(s)) => Decimal::from_str(s).ok(),
            Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }
}

/// Forwards storefront orders into Business Central.
#[derive(Clone)]
pub struct OrderForwarder {
    bc365: Bc365Client,
    sku_map: SkuMap,
}

impl OrderForwarder {
    /// Create a forwarder over the BC adapter and the override map.
    #[must_use]
    pub fn new(bc365: Bc365Client, sku_map: SkuMap) -> Self {
        Self { bc365, sku_map }
    }

    /// Push one order, deduplicating on the external document number.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoMappableLines`] when no line could be mapped
    /// to a BC item (no partial orders are ever created), or an adapter
    /// error from the lookup or push.
    #[instrument(skip(self, order), fields(order_id = %order.source_id()))]
    pub async fn push_order(&self, order: &OrderPayload) -> Result<OrderPushOutcome, SyncError> {
        let source_id = order.source_id();
        let ext_no = ExternalDocumentNumber::from_source_id(&source_id);

        if let Some(ext) = &ext_no
            && let Some(existing) = self.bc365.find_sales_order_by_external_no(ext).await?
        {
            counter!(BC_ORDERS_DEDUPED_TOTAL).increment(1);
            info!(
                bc_id = %existing.id,
                bc_no = %existing.number,
                ext_no = %ext,
                "order already exists"
            );
            return Ok(OrderPushOutcome {
                bc_id: existing.id,
                bc_no: existing.number,
                deduped: true,
            });
        }

        let document = self.map_order(order, ext_no.as_ref(), &source_id).await?;

        let push_start = Instant::now();
        let created = self.bc365.push_order(&document).await?;
        histogram!(BC_ORDER_PUSH_SECONDS).record(push_start.elapsed().as_secs_f64());
        counter!(BC_ORDERS_PUSHED_TOTAL).increment(1);

        info!(
            shopify_id = %source_id,
            bc_id = %created.id,
            bc_no = %created.number,
            "order pushed"
        );
        Ok(OrderPushOutcome {
            bc_id: created.id,
            bc_no: created.number,
            deduped: false,
        })
    }

    /// Map the payload to a sales order document.
    ///
    /// The document stores the *same* truncated external document number
    /// the dedup lookup used; any divergence here would silently break
    /// future dedup.
    async fn map_order(
        &self,
        order: &OrderPayload,
        ext_no: Option<&ExternalDocumentNumber>,
        source_id: &str,
    ) -> Result<NewSalesOrder, SyncError> {
        let mut lines = Vec::new();
        for line in &order.line_items {
            let Some(raw) = line.raw_sku() else {
                continue;
            };
            let mapped = self.sku_map.to_item_number(&raw);
            let Some(item) = self.bc365.find_item_by_number(&mapped).await? else {
                warn!(
                    sku = %raw,
                    mapped_to = %mapped,
                    title = line.title.as_deref().unwrap_or_default(),
                    "BC item not found, dropping line"
                );
                continue;
            };
            lines.push(NewSalesOrderLine {
                line_type: "Item",
                item_id: item.id,
                quantity: line.effective_quantity(),
                unit_price: line.unit_price(),
            });
        }

        if lines.is_empty() {
            return Err(SyncError::NoMappableLines {
                order_id: source_id.to_owned(),
            });
        }

        Ok(NewSalesOrder {
            customer_number: self.bc365.default_customer().to_owned(),
            external_document_number: ext_no.map(|e| e.as_str().to_owned()).unwrap_or_default(),
            sales_order_lines: lines,
        })
    }
}
