//! Shopify adapter behavior: retry classification and rate-limit pacing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use saltbridge_sync::shopify::ShopifyError;
use saltbridge_sync::{Classify, FailureClass};

use saltbridge_integration_tests::{shopify_client, shopify_config};

use saltbridge_sync::shopify::ShopifyClient;

fn locations_body() -> serde_json::Value {
    json!({"locations": [{"id": 900, "name": "Warehouse", "active": true}]})
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);
    Mock::given(method("GET"))
        .and(path("/locations.json"))
        .respond_with(move |_: &Request| {
            // Two failures, then recovery.
            if attempts_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_json(locations_body())
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let locations = shopify_client(&server)
        .list_locations()
        .await
        .expect("retried call succeeds");
    assert_eq!(locations.len(), 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations.json"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unprocessable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = shopify_client(&server)
        .list_locations()
        .await
        .expect_err("permanent failure");
    assert!(matches!(err, ShopifyError::Api { status: 422, .. }));
    assert_eq!(err.class(), FailureClass::Permanent);
}

#[tokio::test]
async fn high_call_limit_utilization_introduces_a_pause() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(locations_body())
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "85/100"),
        )
        .mount(&server)
        .await;

    let client = shopify_client(&server);
    let start = Instant::now();
    client.list_locations().await.expect("call succeeds");
    assert!(
        start.elapsed() >= Duration::from_millis(400),
        "85% utilization should pace the client"
    );
}

#[tokio::test]
async fn low_call_limit_utilization_does_not_pause() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(locations_body())
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "50/100"),
        )
        .mount(&server)
        .await;

    let client = shopify_client(&server);
    let start = Instant::now();
    client.list_locations().await.expect("call succeeds");
    assert!(
        start.elapsed() < Duration::from_millis(400),
        "50% utilization must not pace the client"
    );
}

#[tokio::test]
async fn configured_location_override_wins_over_the_listing() {
    let server = MockServer::start().await;
    // No /locations.json mock: resolving must not call the API.
    let mut config = shopify_config();
    config.location_id = Some(saltbridge_core::LocationId::new(4242));
    let client = ShopifyClient::with_base_url(&config, server.uri()).expect("client");

    let resolved = client.resolve_location_id().await.expect("resolve");
    assert_eq!(resolved, Some(saltbridge_core::LocationId::new(4242)));
    assert!(server.received_requests().await.expect("requests").is_empty());
}
