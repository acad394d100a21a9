//! Serde types for the Business Central API (v2.0).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use saltbridge_core::{CompanyId, ItemNumber};

/// Generic OData collection envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A Business Central company.
#[derive(Debug, Clone, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

/// A Business Central item (product).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item GUID, referenced by sales order lines.
    pub id: String,
    /// Item number - the ERP half of the SKU join key.
    pub number: ItemNumber,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub unit_price: Option<Decimal>,
    /// On-hand quantity; BC reports decimals for items tracked by weight.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub inventory: Option<Decimal>,
}

/// An existing sales order, as returned by lookups and creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrder {
    pub id: String,
    pub number: String,
    #[serde(default)]
    pub external_document_number: Option<String>,
}

/// A sales order document to create.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalesOrder {
    pub customer_number: String,
    pub external_document_number: String,
    pub sales_order_lines: Vec<NewSalesOrderLine>,
}

/// One line of a [`NewSalesOrder`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalesOrderLine {
    /// Always "Item" for catalog lines.
    pub line_type: &'static str,
    /// The BC item GUID resolved from the mapped SKU.
    pub item_id: String,
    pub quantity: i64,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_price: Option<Decimal>,
}

/// Response from the Microsoft identity token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_deserializes_from_bc_casing() {
        let item: Item = serde_json::from_str(
            r#"{"id": "guid-1", "number": "BC-100", "displayName": "Widget", "unitPrice": 9.5, "inventory": 12.0}"#,
        )
        .expect("item");
        assert_eq!(item.number, ItemNumber::new("BC-100"));
        assert_eq!(item.unit_price, Some(Decimal::new(95, 1)));
    }

    #[test]
    fn order_line_omits_missing_unit_price() {
        let line = NewSalesOrderLine {
            line_type: "Item",
            item_id: "guid-1".into(),
            quantity: 2,
            unit_price: None,
        };
        let json = serde_json::to_value(&line).expect("serialize");
        assert!(json.get("unitPrice").is_none());
        assert_eq!(json["lineType"], "Item");
    }

    #[test]
    fn token_response_defaults_expiry() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc"}"#).expect("token");
        assert_eq!(token.expires_in, 3600);
    }
}
