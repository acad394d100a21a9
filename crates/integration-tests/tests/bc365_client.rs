//! BC365 adapter behavior: token caching and company resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use saltbridge_core::CompanyId;
use saltbridge_sync::bc365::{Bc365Client, Bc365Error};
use saltbridge_sync::{Classify, FailureClass};

use saltbridge_integration_tests::{bc365_client, bc365_config, fast_retry, items_path};

async fn mount_empty_items(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(items_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(server)
        .await;
}

fn counting_token_endpoint(expires_in: u64, calls: Arc<AtomicU32>) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |_: &Request| {
        calls.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bearer-token",
            "expires_in": expires_in,
        }))
    }
}

#[tokio::test]
async fn long_lived_tokens_are_fetched_once() {
    let server = MockServer::start().await;
    let token_calls = Arc::new(AtomicU32::new(0));
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(counting_token_endpoint(3600, Arc::clone(&token_calls)))
        .mount(&server)
        .await;
    mount_empty_items(&server).await;

    let client = bc365_client(&server);
    client.fetch_items(None).await.expect("first call");
    client.fetch_items(None).await.expect("second call");

    assert_eq!(token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tokens_inside_the_refresh_margin_are_refetched() {
    let server = MockServer::start().await;
    let token_calls = Arc::new(AtomicU32::new(0));
    // 30 seconds of validity is inside the 60-second proactive margin, so
    // every call sees a stale cache.
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(counting_token_endpoint(30, Arc::clone(&token_calls)))
        .mount(&server)
        .await;
    mount_empty_items(&server).await;

    let client = bc365_client(&server);
    client.fetch_items(None).await.expect("first call");
    client.fetch_items(None).await.expect("second call");

    assert_eq!(token_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn configured_company_name_resolves_and_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bearer-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/companies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [
            {"id": "guid-fabrikam", "name": "Fabrikam"},
            {"id": "guid-cronus", "name": "CRONUS"},
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = bc365_config();
    config.company_id = None;
    config.company_name = Some("CRONUS".into());
    let client = Bc365Client::with_base_urls_and_policy(
        &config,
        server.uri(),
        format!("{}/token", server.uri()),
        fast_retry(),
    )
    .expect("client");

    let first = client.resolve_company_id().await.expect("resolution");
    assert_eq!(first, CompanyId::new("guid-cronus"));

    // Second resolution must come from the cache (the mock expects one hit).
    let second = client.resolve_company_id().await.expect("cached resolution");
    assert_eq!(second, first);
}

#[tokio::test]
async fn configured_company_name_not_found_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bearer-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/companies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [
            {"id": "guid-fabrikam", "name": "Fabrikam"},
        ]})))
        .mount(&server)
        .await;

    let mut config = bc365_config();
    config.company_id = None;
    config.company_name = Some("Contoso".into());
    let client = Bc365Client::with_base_urls_and_policy(
        &config,
        server.uri(),
        format!("{}/token", server.uri()),
        fast_retry(),
    )
    .expect("client");

    let err = client
        .resolve_company_id()
        .await
        .expect_err("missing configured company must fail");
    assert!(matches!(err, Bc365Error::CompanyNotFound { ref name, .. } if name == "Contoso"));
    assert_eq!(err.class(), FailureClass::Configuration);
}

#[tokio::test]
async fn item_number_filters_escape_single_quotes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bearer-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(items_path()))
        .and(wiremock::matchers::query_param(
            "$filter",
            "number eq 'O''BRIEN-1'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [
            {"id": "guid-ob", "number": "O'BRIEN-1"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let item = bc365_client(&server)
        .find_item_by_number(&saltbridge_core::ItemNumber::new("O'BRIEN-1"))
        .await
        .expect("lookup succeeds");
    assert!(item.is_some());
}
