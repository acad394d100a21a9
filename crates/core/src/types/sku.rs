//! String-keyed identity types shared by both external systems.
//!
//! A Shopify SKU and a Business Central item number live in different
//! identifier spaces that happen to coincide when no override mapping is
//! configured. Keeping them as separate newtypes makes every crossing of
//! that boundary explicit - conversions only happen through
//! [`crate::SkuMap`].

use serde::{Deserialize, Serialize};

macro_rules! define_string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new value from any string-like input.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the underlying string is empty.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_string_id!(Sku, "A Shopify variant SKU - the storefront half of the join key.");
define_string_id!(
    ItemNumber,
    "A Business Central item number - the ERP half of the join key."
);
define_string_id!(
    CompanyId,
    "A Business Central company id (GUID, but treated as opaque)."
);

impl Sku {
    /// Reinterpret this SKU as an item number (identity mapping).
    #[must_use]
    pub fn into_item_number(self) -> ItemNumber {
        ItemNumber(self.0)
    }
}

impl ItemNumber {
    /// Reinterpret this item number as a SKU (identity mapping).
    #[must_use]
    pub fn into_sku(self) -> Sku {
        Sku(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_round_trips_through_serde() {
        let sku = Sku::new("SHOPIFY-A");
        let json = serde_json::to_string(&sku).expect("serialize");
        assert_eq!(json, r#""SHOPIFY-A""#);
        let back: Sku = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, sku);
    }

    #[test]
    fn identity_conversions_preserve_the_string() {
        let item = ItemNumber::new("BC-999");
        assert_eq!(item.into_sku().as_str(), "BC-999");
    }
}
