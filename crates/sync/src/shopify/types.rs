//! Serde types for the Shopify REST Admin API.
//!
//! Only the fields the pipeline reads are modeled; everything else in the
//! API responses is ignored.

use serde::{Deserialize, Serialize};

use saltbridge_core::{InventoryItemId, LocationId, ProductId, Sku, VariantId, WebhookId};

/// A product variant, the sellable unit identified by SKU.
#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    /// Variants without a SKU exist; they can never match an item number.
    pub sku: Option<Sku>,
    pub inventory_item_id: InventoryItemId,
    /// Decimal string as Shopify serves it, e.g. "9.99".
    pub price: Option<String>,
}

/// A fulfillment location.
#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

/// An inventory level at one location.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLevel {
    pub inventory_item_id: InventoryItemId,
    pub location_id: LocationId,
    /// Null while an item is stocked at a location but untracked.
    pub available: Option<i64>,
}

/// A registered webhook subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct Webhook {
    pub id: WebhookId,
    pub topic: String,
    pub address: String,
    #[serde(default)]
    pub format: String,
}

/// A product create/update payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPayload {
    /// Present when updating an existing product.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub title: String,
    pub status: String,
    pub variants: Vec<VariantPayload>,
}

/// A variant inside a [`ProductPayload`].
#[derive(Debug, Clone, Serialize)]
pub struct VariantPayload {
    pub sku: Sku,
    /// Decimal string with two places, as Shopify expects.
    pub price: String,
}

/// A created/updated product as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
}

// Response envelopes: the REST Admin API wraps everything in a named key.

#[derive(Debug, Deserialize)]
pub(crate) struct VariantsEnvelope {
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationsEnvelope {
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InventoryLevelsEnvelope {
    #[serde(default)]
    pub inventory_levels: Vec<InventoryLevel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InventoryLevelEnvelope {
    pub inventory_level: InventoryLevel,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebhooksEnvelope {
    #[serde(default)]
    pub webhooks: Vec<Webhook>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebhookEnvelope {
    pub webhook: Webhook,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductEnvelope {
    pub product: Product,
}
