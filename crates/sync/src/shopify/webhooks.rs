//! Webhook signature verification and idempotent registration.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info};

use super::{ShopifyClient, ShopifyError};

type HmacSha256 = Hmac<Sha256>;

/// Topics every installed shop is subscribed to.
pub const DEFAULT_TOPICS: &[&str] = &["orders/create", "products/update", "inventory_levels/update"];

/// Verify a Shopify webhook signature.
///
/// Shopify signs the raw request body with HMAC-SHA256 and sends the
/// base64-encoded digest in `X-Shopify-Hmac-Sha256`. Verification must use
/// the unparsed bytes and a constant-time comparison; a mismatch is an
/// authentication failure, never a retryable condition.
#[must_use]
pub fn verify_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let Ok(expected) = BASE64.decode(signature) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

/// Register the default webhook topics for a shop, idempotently.
///
/// Lists the existing subscriptions first and only creates the ones
/// missing for this address, so re-running an install never duplicates a
/// subscription and genuine registration failures still surface.
///
/// # Errors
///
/// Returns an error if listing or creating a subscription fails.
pub async fn register_default_webhooks(
    client: &ShopifyClient,
    public_base: &str,
) -> Result<(), ShopifyError> {
    let address = format!("{}/webhooks/shopify", public_base.trim_end_matches('/'));
    let existing = client.list_webhooks().await?;

    for topic in DEFAULT_TOPICS {
        let already = existing
            .iter()
            .any(|hook| hook.topic == *topic && hook.address == address);
        if already {
            debug!(topic, address, "webhook already registered");
            continue;
        }
        let created = client.create_webhook(topic, &address).await?;
        info!(topic, address, webhook_id = %created.id, "webhook registered");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "hush";

    fn sign(body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).expect("hmac key");
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"id": 1}"#;
        assert!(verify_signature(SECRET, &sign(body), body));
    }

    #[test]
    fn altered_body_is_rejected() {
        let body = br#"{"id": 1}"#;
        let signature = sign(body);
        let tampered = br#"{"id": 2}"#;
        assert!(!verify_signature(SECRET, &signature, tampered));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"payload";
        assert!(!verify_signature("other", &sign(body), body));
    }

    #[test]
    fn non_base64_signature_is_rejected() {
        assert!(!verify_signature(SECRET, "%%% not base64 %%%", b"payload"));
    }
}
