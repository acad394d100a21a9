//! Shopify REST Admin API client.
//!
//! Token-authenticated client for the handful of Admin API resources the
//! pipeline touches: variants, locations, inventory levels, products, and
//! webhook subscriptions. Every call goes through the shared adapter retry
//! policy, and responses feed the advisory rate-limit pacing described on
//! [`ShopifyClient::maybe_throttle`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use saltbridge_core::{InventoryItemId, LocationId, ProductId, Sku};

use crate::config::ShopifyConfig;
use crate::retry::{Classify, FailureClass, RetryPolicy};

pub mod types;
pub mod webhooks;

pub use types::{InventoryLevel, Location, Product, ProductPayload, Variant, VariantPayload, Webhook};

use types::{
    InventoryLevelEnvelope, InventoryLevelsEnvelope, LocationsEnvelope, ProductEnvelope,
    VariantsEnvelope, WebhookEnvelope, WebhooksEnvelope,
};

/// Header carrying bucket utilization, e.g. `32/40`.
const CALL_LIMIT_HEADER: &str = "X-Shopify-Shop-Api-Call-Limit";

/// Utilization percentage above which the client pauses briefly.
const CALL_LIMIT_THRESHOLD_PCT: u64 = 80;

/// Advisory pause once the threshold is exceeded.
const THROTTLE_PAUSE: Duration = Duration::from_millis(500);

/// Timeout applied to every outbound call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP transport failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limited or temporarily unavailable upstream.
    #[error("Shopify unavailable ({status}): {body}")]
    Transient { status: u16, body: String },

    /// API rejected the request.
    #[error("Shopify API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Failed to parse a response body.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Access token cannot be carried in a header.
    #[error("invalid access token: {0}")]
    InvalidToken(String),
}

impl Classify for ShopifyError {
    fn class(&self) -> FailureClass {
        match self {
            // Connection-level failures and timeouts are retry-eligible.
            Self::Http(_) | Self::Transient { .. } => FailureClass::Transient,
            Self::Api { .. } | Self::Parse(_) | Self::InvalidToken(_) => FailureClass::Permanent,
        }
    }
}

/// Shopify REST Admin API client.
///
/// Cheaply cloneable; all clones share one connection pool and retry
/// policy.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    client: reqwest::Client,
    base: String,
    location_override: Option<LocationId>,
    webhook_secret: Option<SecretString>,
    retry: RetryPolicy,
    throttle_pause: Duration,
}

impl ShopifyClient {
    /// Create a client for the configured store.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidToken`] when the access token cannot
    /// be used as a header value, or [`ShopifyError::Http`] if the HTTP
    /// client fails to build.
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        Self::with_base_url(config, config.api_base())
    }

    /// Create a client against an explicit base URL.
    ///
    /// Used by tests to point the client at a local mock server; production
    /// code goes through [`ShopifyClient::new`].
    ///
    /// # Errors
    ///
    /// Same as [`ShopifyClient::new`].
    pub fn with_base_url(
        config: &ShopifyConfig,
        base: impl Into<String>,
    ) -> Result<Self, ShopifyError> {
        Self::with_base_url_and_policy(config, base, RetryPolicy::adapter())
    }

    /// Create a client with an explicit retry policy.
    ///
    /// Lets tests shrink the backoff window; production code keeps the
    /// adapter default.
    ///
    /// # Errors
    ///
    /// Same as [`ShopifyClient::new`].
    pub fn with_base_url_and_policy(
        config: &ShopifyConfig,
        base: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, ShopifyError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(config.access_token.expose_secret())
            .map_err(|e| ShopifyError::InvalidToken(e.to_string()))?;
        token.set_sensitive(true);
        headers.insert("X-Shopify-Access-Token", token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ShopifyClientInner {
                client,
                base: base.into().trim_end_matches('/').to_owned(),
                location_override: config.location_id,
                webhook_secret: config.webhook_secret.clone(),
                retry,
                throttle_pause: THROTTLE_PAUSE,
            }),
        })
    }

    /// Find the first variant carrying the given SKU.
    ///
    /// Within one store a SKU identifies one variant; if duplicates exist
    /// the first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_variant_by_sku(&self, sku: &Sku) -> Result<Option<Variant>, ShopifyError> {
        let envelope: VariantsEnvelope = self
            .request(
                Method::GET,
                "/variants.json",
                &[("sku", sku.as_str().to_owned())],
                None,
            )
            .await?;
        Ok(envelope.variants.into_iter().next())
    }

    /// List the store's locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_locations(&self) -> Result<Vec<Location>, ShopifyError> {
        let envelope: LocationsEnvelope = self
            .request(Method::GET, "/locations.json", &[], None)
            .await?;
        Ok(envelope.locations)
    }

    /// Resolve the target location for inventory writes.
    ///
    /// Prefers the configured override and falls back to the first listed
    /// location. `None` when the store has no locations at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the location listing fails.
    pub async fn resolve_location_id(&self) -> Result<Option<LocationId>, ShopifyError> {
        if let Some(id) = self.inner.location_override {
            return Ok(Some(id));
        }
        Ok(self.list_locations().await?.first().map(|loc| loc.id))
    }

    /// Read the available quantity for one inventory item at one location.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_inventory_level(
        &self,
        inventory_item_id: InventoryItemId,
        location_id: LocationId,
    ) -> Result<Option<i64>, ShopifyError> {
        let envelope: InventoryLevelsEnvelope = self
            .request(
                Method::GET,
                "/inventory_levels.json",
                &[
                    ("inventory_item_ids", inventory_item_id.to_string()),
                    ("location_ids", location_id.to_string()),
                ],
                None,
            )
            .await?;
        Ok(envelope
            .inventory_levels
            .into_iter()
            .next()
            .and_then(|level| level.available))
    }

    /// Set the available quantity for one inventory item at one location.
    ///
    /// Idempotent by value: re-setting the same quantity is harmless, which
    /// is what makes whole-run retries of bulk inventory syncs safe.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn set_inventory_level(
        &self,
        inventory_item_id: InventoryItemId,
        location_id: LocationId,
        available: i64,
    ) -> Result<InventoryLevel, ShopifyError> {
        let body = serde_json::json!({
            "inventory_item_id": inventory_item_id,
            "location_id": location_id,
            "available": available,
        });
        let envelope: InventoryLevelEnvelope = self
            .request(Method::POST, "/inventory_levels/set.json", &[], Some(&body))
            .await?;
        Ok(envelope.inventory_level)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn create_product(&self, payload: &ProductPayload) -> Result<Product, ShopifyError> {
        let body = serde_json::json!({ "product": payload });
        let envelope: ProductEnvelope = self
            .request(Method::POST, "/products.json", &[], Some(&body))
            .await?;
        Ok(envelope.product)
    }

    /// Update an existing product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn update_product(
        &self,
        product_id: ProductId,
        payload: &ProductPayload,
    ) -> Result<Product, ShopifyError> {
        let body = serde_json::json!({ "product": payload });
        let envelope: ProductEnvelope = self
            .request(
                Method::PUT,
                &format!("/products/{product_id}.json"),
                &[],
                Some(&body),
            )
            .await?;
        Ok(envelope.product)
    }

    /// List registered webhook subscriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_webhooks(&self) -> Result<Vec<Webhook>, ShopifyError> {
        let envelope: WebhooksEnvelope = self
            .request(Method::GET, "/webhooks.json", &[], None)
            .await?;
        Ok(envelope.webhooks)
    }

    /// Register a webhook subscription for a topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn create_webhook(
        &self,
        topic: &str,
        address: &str,
    ) -> Result<Webhook, ShopifyError> {
        let body = serde_json::json!({
            "webhook": { "topic": topic, "address": address, "format": "json" }
        });
        let envelope: WebhookEnvelope = self
            .request(Method::POST, "/webhooks.json", &[], Some(&body))
            .await?;
        Ok(envelope.webhook)
    }

    /// Verify a webhook delivery's HMAC signature against the raw body.
    ///
    /// Must be called on the unparsed request bytes. Returns `false` when
    /// no webhook secret is configured.
    #[must_use]
    pub fn verify_webhook_signature(&self, signature: &str, body: &[u8]) -> bool {
        match &self.inner.webhook_secret {
            Some(secret) => webhooks::verify_signature(secret.expose_secret(), signature, body),
            None => {
                warn!("webhook received but SHOPIFY_WEBHOOK_SECRET is not configured");
                false
            }
        }
    }

    /// One API request with retry, pacing, and status classification.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T, ShopifyError> {
        let url = format!("{}{path}", self.inner.base);
        let url = url.as_str();
        let value = self
            .inner
            .retry
            .run("shopify_request", || {
                let method = method.clone();
                async move {
                    let mut request = self.inner.client.request(method, url);
                    if !query.is_empty() {
                        request = request.query(query);
                    }
                    if let Some(body) = body {
                        request = request.json(body);
                    }

                    let response = request.send().await?;
                    self.maybe_throttle(&response).await;

                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        return Err(ShopifyError::Transient {
                            status: status.as_u16(),
                            body: response.text().await.unwrap_or_default(),
                        });
                    }
                    if !status.is_success() {
                        return Err(ShopifyError::Api {
                            status: status.as_u16(),
                            body: response.text().await.unwrap_or_default(),
                        });
                    }

                    let text = response.text().await?;
                    if text.trim().is_empty() {
                        Ok(serde_json::Value::Null)
                    } else {
                        Ok(serde_json::from_str(&text)?)
                    }
                }
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Advisory pacing from the call-limit header.
    ///
    /// When the reported bucket utilization exceeds 80%, pause briefly
    /// before returning control. Not a backpressure gate; a malformed or
    /// absent header is ignored.
    async fn maybe_throttle(&self, response: &Response) {
        let Some(raw) = response
            .headers()
            .get(CALL_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        let Some((used, bucket)) = parse_call_limit(raw) else {
            return;
        };
        if bucket > 0 && used.saturating_mul(100) > bucket.saturating_mul(CALL_LIMIT_THRESHOLD_PCT)
        {
            debug!(used, bucket, "call limit above threshold, pacing");
            tokio::time::sleep(self.inner.throttle_pause).await;
        }
    }
}

/// Parse a `used/bucket` call-limit header value.
fn parse_call_limit(raw: &str) -> Option<(u64, u64)> {
    let (used, bucket) = raw.split_once('/')?;
    Some((used.trim().parse().ok()?, bucket.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ShopifyConfig {
        ShopifyConfig {
            store: "example.myshopify.com".into(),
            api_version: "2024-10".into(),
            access_token: "shpat_test".into(),
            location_id: None,
            webhook_secret: Some("test-secret".into()),
        }
    }

    #[test]
    fn client_is_clone_send_sync() {
        fn assert_clone_send_sync<T: Clone + Send + Sync>() {}
        assert_clone_send_sync::<ShopifyClient>();
    }

    #[test]
    fn call_limit_header_parses() {
        assert_eq!(parse_call_limit("32/40"), Some((32, 40)));
        assert_eq!(parse_call_limit(" 85 / 100 "), Some((85, 100)));
        assert_eq!(parse_call_limit("garbage"), None);
        assert_eq!(parse_call_limit("1/2/3"), None);
    }

    #[test]
    fn errors_classify_for_retry() {
        let transient = ShopifyError::Transient {
            status: 429,
            body: String::new(),
        };
        let permanent = ShopifyError::Api {
            status: 422,
            body: String::new(),
        };
        assert!(transient.is_transient());
        assert!(!permanent.is_transient());
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_trimmed() {
        let client =
            ShopifyClient::with_base_url(&test_config(), "http://127.0.0.1:1/").expect("client");
        assert_eq!(client.inner.base, "http://127.0.0.1:1");
    }
}
