//! The Business Central to Shopify catalog bulk upsert.

use tracing::{info, instrument, warn};

use saltbridge_core::UpsertOutcome;

use crate::bc365::{Bc365Client, Item};
use crate::error::SyncError;
use crate::shopify::{ProductPayload, ShopifyClient, VariantPayload};

/// Items processed per progress batch.
const UPSERT_CHUNK: usize = 100;

/// Pushes the BC item catalog into Shopify products.
#[derive(Clone)]
pub struct CatalogPublisher {
    shopify: ShopifyClient,
    bc365: Bc365Client,
}

impl CatalogPublisher {
    /// Create a publisher over the two adapters.
    #[must_use]
    pub fn new(shopify: ShopifyClient, bc365: Bc365Client) -> Self {
        Self { shopify, bc365 }
    }

    /// Upsert every BC item as a Shopify product.
    ///
    /// Unlike the inventory reconciler, a per-item failure here aborts the
    /// batch and propagates: the task-level retry policy re-runs the whole
    /// upsert, which is safe because product updates are last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns the first adapter error encountered.
    #[instrument(skip(self))]
    pub async fn bulk_upsert_products(&self) -> Result<UpsertOutcome, SyncError> {
        let items = self.bc365.fetch_items(None).await?;

        let mut outcome = UpsertOutcome::default();
        for batch in items.chunks(UPSERT_CHUNK) {
            for item in batch {
                outcome.total += 1;
                let payload = product_payload(item);
                let result = match payload.id {
                    Some(product_id) => self.shopify.update_product(product_id, &payload).await,
                    None => self.shopify.create_product(&payload).await,
                };
                if let Err(err) = result {
                    warn!(number = %item.number, error = %err, "product upsert failed");
                    return Err(err.into());
                }
                outcome.updated += 1;
            }
        }

        info!(
            total = outcome.total,
            updated = outcome.updated,
            "bulk upsert done"
        );
        Ok(outcome)
    }
}

/// Map one BC item to a Shopify product payload.
fn product_payload(item: &Item) -> ProductPayload {
    let sku = item.number.clone().into_sku();
    let title = item
        .display_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| item.number.to_string());
    let price = item
        .unit_price
        .map_or_else(|| "0.00".to_owned(), |price| format!("{price:.2}"));

    ProductPayload {
        id: None,
        title,
        status: "active".to_owned(),
        variants: vec![VariantPayload { sku, price }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(json: serde_json::Value) -> Item {
        serde_json::from_value(json).expect("item")
    }

    #[test]
    fn payload_uses_display_name_and_two_decimal_price() {
        let payload = product_payload(&item(serde_json::json!({
            "id": "guid-1",
            "number": "BC-100",
            "displayName": "Widget",
            "unitPrice": 9.5,
        })));
        assert_eq!(payload.title, "Widget");
        assert_eq!(payload.variants.first().map(|v| v.price.as_str()), Some("9.50"));
        assert_eq!(payload.status, "active");
    }

    #[test]
    fn payload_falls_back_to_item_number_and_zero_price() {
        let payload = product_payload(&item(serde_json::json!({
            "id": "guid-2",
            "number": "BC-200",
        })));
        assert_eq!(payload.title, "BC-200");
        assert_eq!(payload.variants.first().map(|v| v.sku.as_str()), Some("BC-200"));
        assert_eq!(payload.variants.first().map(|v| v.price.as_str()), Some("0.00"));
    }
}
