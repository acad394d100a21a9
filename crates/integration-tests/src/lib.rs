//! Shared test support for the integration tests.
//!
//! Builds adapter clients pointed at local `wiremock` servers standing in
//! for the Shopify Admin API, the Business Central API, and the Microsoft
//! identity endpoint.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use saltbridge_core::CompanyId;
use saltbridge_sync::bc365::Bc365Client;
use saltbridge_sync::shopify::ShopifyClient;
use saltbridge_sync::{Bc365Config, RetryPolicy, ShopifyConfig};

/// Company id baked into [`bc365_config`], skipping name resolution.
pub const TEST_COMPANY_ID: &str = "11111111-2222-3333-4444-555555555555";

/// A Shopify config suitable for pointing at a mock server.
#[must_use]
pub fn shopify_config() -> ShopifyConfig {
    ShopifyConfig {
        store: "example.myshopify.com".into(),
        api_version: "2024-10".into(),
        access_token: "shpat_test".into(),
        location_id: None,
        webhook_secret: Some("test-webhook-secret".into()),
    }
}

/// A BC365 config with the company id pre-resolved.
#[must_use]
pub fn bc365_config() -> Bc365Config {
    Bc365Config {
        tenant_id: "tenant-guid".into(),
        client_id: "client-id".into(),
        client_secret: "client-secret".into(),
        environment: "sandbox".into(),
        company_id: Some(CompanyId::new(TEST_COMPANY_ID)),
        company_name: None,
        default_customer: "10000".into(),
    }
}

/// Adapter retry policy with millisecond backoff, keeping tests fast.
#[must_use]
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::exponential(Some(6), Duration::from_millis(1), Duration::from_millis(10))
}

/// Build a Shopify client against a mock server.
#[must_use]
pub fn shopify_client(server: &MockServer) -> ShopifyClient {
    ShopifyClient::with_base_url_and_policy(&shopify_config(), server.uri(), fast_retry())
        .expect("shopify client")
}

/// Build a BC365 client against a mock server (API and token endpoint).
#[must_use]
pub fn bc365_client(server: &MockServer) -> Bc365Client {
    Bc365Client::with_base_urls_and_policy(
        &bc365_config(),
        server.uri(),
        format!("{}/token", server.uri()),
        fast_retry(),
    )
    .expect("bc365 client")
}

/// Mount a token endpoint issuing long-lived tokens.
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "bearer-token",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
}

/// The items collection path under the test company.
#[must_use]
pub fn items_path() -> String {
    format!("/companies({TEST_COMPANY_ID})/items")
}

/// The sales orders collection path under the test company.
#[must_use]
pub fn sales_orders_path() -> String {
    format!("/companies({TEST_COMPANY_ID})/salesOrders")
}
