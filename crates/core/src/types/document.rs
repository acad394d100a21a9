//! The Business Central external document number.
//!
//! Business Central stores the originating Shopify order id in the sales
//! order's `externalDocumentNumber` field, which is capped at 35 characters.
//! That truncated value is the sole deduplication key for order pushes, so
//! the truncation must happen in exactly one place: here, at construction.
//! Both the dedup lookup and the created document carry the same value by
//! construction.

use serde::{Deserialize, Serialize};

/// Field length limit of `externalDocumentNumber` in Business Central.
pub const EXTERNAL_DOCUMENT_NUMBER_MAX_LEN: usize = 35;

/// A source order identifier truncated to Business Central's field limit.
///
/// Construction from an empty source id yields `None`; an order without an
/// id cannot participate in dedup and is pushed unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalDocumentNumber(String);

impl ExternalDocumentNumber {
    /// Build the dedup key from a raw source order identifier.
    ///
    /// Truncates to [`EXTERNAL_DOCUMENT_NUMBER_MAX_LEN`] characters. Returns
    /// `None` for an empty id.
    #[must_use]
    pub fn from_source_id(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self(raw.chars().take(EXTERNAL_DOCUMENT_NUMBER_MAX_LEN).collect()))
    }

    /// Borrow the truncated value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalDocumentNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_pass_through_unchanged() {
        let ext = ExternalDocumentNumber::from_source_id("abc123").expect("non-empty");
        assert_eq!(ext.as_str(), "abc123");
    }

    #[test]
    fn long_ids_truncate_to_the_field_limit() {
        let forty = "a".repeat(40);
        let ext = ExternalDocumentNumber::from_source_id(&forty).expect("non-empty");
        assert_eq!(ext.as_str().len(), EXTERNAL_DOCUMENT_NUMBER_MAX_LEN);
    }

    #[test]
    fn a_long_id_and_its_prefix_share_a_dedup_slot() {
        let long = format!("{}{}", "x".repeat(35), "tail-that-gets-dropped");
        let prefix = "x".repeat(35);
        assert_eq!(
            ExternalDocumentNumber::from_source_id(&long),
            ExternalDocumentNumber::from_source_id(&prefix),
        );
    }

    #[test]
    fn empty_ids_produce_no_dedup_key() {
        assert!(ExternalDocumentNumber::from_source_id("").is_none());
    }
}
