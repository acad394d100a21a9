//! The sync pipeline error taxonomy.
//!
//! Adapter errors carry their own classification; this type adds the
//! operation-level failures (no location, no mappable lines, a transient
//! per-item failure escalated to the whole run) and delegates everything
//! else. The server's status mapping and the dispatcher's retry decision
//! both key off [`Classify::class`].

use thiserror::Error;

use saltbridge_core::ItemNumber;

use crate::bc365::Bc365Error;
use crate::retry::{Classify, FailureClass};
use crate::shopify::ShopifyError;

/// Pipeline-level error type for sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Business Central API operation failed.
    #[error("Business Central error: {0}")]
    Bc365(#[from] Bc365Error),

    /// No target location could be resolved for an inventory run.
    #[error("no Shopify location available; set SHOPIFY_LOCATION_ID or create a location")]
    NoLocation,

    /// Every line of an order failed to map to a Business Central item.
    #[error("order {order_id}: no lines could be mapped to Business Central items")]
    NoMappableLines { order_id: String },

    /// A transient per-item failure escalated to the whole inventory run
    /// so the outer retry policy re-executes it end to end.
    #[error("inventory run aborted on item {item}: {message}")]
    TransientRun { item: ItemNumber, message: String },

    /// Lookup-table store operation failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl Classify for SyncError {
    fn class(&self) -> FailureClass {
        match self {
            Self::Shopify(err) => err.class(),
            Self::Bc365(err) => err.class(),
            Self::NoLocation => FailureClass::Configuration,
            Self::NoMappableLines { .. } => FailureClass::Mapping,
            Self::TransientRun { .. } => FailureClass::Transient,
            Self::Store(err) => match err {
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => FailureClass::Transient,
                _ => FailureClass::Permanent,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_level_failures_classify_per_taxonomy() {
        assert_eq!(SyncError::NoLocation.class(), FailureClass::Configuration);
        assert_eq!(
            SyncError::NoMappableLines {
                order_id: "abc".into()
            }
            .class(),
            FailureClass::Mapping
        );
        assert!(
            SyncError::TransientRun {
                item: ItemNumber::new("BC-1"),
                message: "502".into()
            }
            .is_transient()
        );
    }
}
