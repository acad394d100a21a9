//! The configured SKU override table.
//!
//! Most installations never need this: Shopify SKUs and Business Central
//! item numbers are usually the same string, and both conversion directions
//! fall back to identity. Where the two catalogs disagree, the operator
//! supplies a JSON object mapping Shopify SKU to item number, e.g.
//! `{"SHOPIFY-A": "BC-100"}`.
//!
//! The inverse direction (item number back to SKU) is derived at load time,
//! which is only well-defined when the forward map is injective. A map where
//! two SKUs point at the same item number is rejected as a configuration
//! error instead of silently picking one of them.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{ItemNumber, Sku};

/// Errors parsing the configured SKU map.
#[derive(Debug, Error)]
pub enum SkuMapError {
    /// The configured value is not a JSON object of strings.
    #[error("SKU map is not a JSON string-to-string object: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two SKUs map to the same item number, so the inverse is ambiguous.
    #[error("SKU map is not injective: {first} and {second} both map to item number {item}")]
    DuplicateItemNumber {
        item: ItemNumber,
        first: Sku,
        second: Sku,
    },
}

/// Immutable SKU/item-number override table with identity fallback.
///
/// Pure and side-effect-free; loaded once from configuration and shared.
#[derive(Debug, Clone, Default)]
pub struct SkuMap {
    forward: HashMap<Sku, ItemNumber>,
    inverse: HashMap<ItemNumber, Sku>,
}

impl SkuMap {
    /// Parse the map from its serialized configuration form.
    ///
    /// # Errors
    ///
    /// Returns [`SkuMapError::Parse`] for malformed JSON and
    /// [`SkuMapError::DuplicateItemNumber`] when the forward map is not
    /// injective.
    pub fn from_json(raw: &str) -> Result<Self, SkuMapError> {
        let parsed: HashMap<String, String> = serde_json::from_str(raw)?;

        let mut forward = HashMap::with_capacity(parsed.len());
        let mut inverse: HashMap<ItemNumber, Sku> = HashMap::with_capacity(parsed.len());

        for (sku, item) in parsed {
            let sku = Sku::new(sku);
            let item = ItemNumber::new(item);
            if let Some(existing) = inverse.get(&item) {
                return Err(SkuMapError::DuplicateItemNumber {
                    item,
                    first: existing.clone(),
                    second: sku,
                });
            }
            inverse.insert(item.clone(), sku.clone());
            forward.insert(sku, item);
        }

        Ok(Self { forward, inverse })
    }

    /// Build an empty map (identity everywhere).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of configured overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether any overrides are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Map a Shopify SKU to its Business Central item number.
    ///
    /// Falls back to the identity mapping when no override exists.
    #[must_use]
    pub fn to_item_number(&self, sku: &Sku) -> ItemNumber {
        self.forward
            .get(sku)
            .cloned()
            .unwrap_or_else(|| sku.clone().into_item_number())
    }

    /// Map a Business Central item number to its Shopify SKU.
    ///
    /// Falls back to the identity mapping when no override exists.
    #[must_use]
    pub fn to_sku(&self, item: &ItemNumber) -> Sku {
        self.inverse
            .get(item)
            .cloned()
            .unwrap_or_else(|| item.clone().into_sku())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_inverse_lookups_agree() {
        let map = SkuMap::from_json(r#"{"SHOPIFY-A": "BC-100"}"#).expect("valid map");
        assert_eq!(
            map.to_item_number(&Sku::new("SHOPIFY-A")),
            ItemNumber::new("BC-100")
        );
        assert_eq!(map.to_sku(&ItemNumber::new("BC-100")), Sku::new("SHOPIFY-A"));
    }

    #[test]
    fn unmapped_values_fall_back_to_identity() {
        let map = SkuMap::from_json(r#"{"SHOPIFY-A": "BC-100"}"#).expect("valid map");
        assert_eq!(map.to_sku(&ItemNumber::new("BC-999")), Sku::new("BC-999"));
        assert_eq!(
            map.to_item_number(&Sku::new("PLAIN")),
            ItemNumber::new("PLAIN")
        );
    }

    #[test]
    fn empty_map_is_identity_everywhere() {
        let map = SkuMap::empty();
        assert!(map.is_empty());
        assert_eq!(map.to_sku(&ItemNumber::new("X1")), Sku::new("X1"));
    }

    #[test]
    fn non_injective_map_is_rejected_at_load() {
        let err = SkuMap::from_json(r#"{"A": "BC-1", "B": "BC-1"}"#)
            .expect_err("duplicate item numbers must fail");
        assert!(matches!(err, SkuMapError::DuplicateItemNumber { .. }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            SkuMap::from_json("not json"),
            Err(SkuMapError::Parse(_))
        ));
    }
}
