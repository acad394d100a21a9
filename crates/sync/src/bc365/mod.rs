//! Business Central API client.
//!
//! Authenticates with OAuth2 client credentials against the Microsoft
//! identity endpoint and talks to the Business Central API v2.0. Two pieces
//! of process state live here, both as explicit cache objects rather than
//! ambient globals:
//!
//! - [`TokenCache`]: the bearer token with its expiry timestamp, refreshed
//!   proactively 60 seconds before it lapses, single-flight behind a mutex
//!   so a cold cache triggers exactly one upstream fetch;
//! - the resolved company id in a `OnceCell`, also single-flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, instrument};

use saltbridge_core::{CompanyId, ExternalDocumentNumber, ItemNumber};

use crate::config::Bc365Config;
use crate::retry::{Classify, FailureClass, RetryPolicy};

pub mod types;

pub use types::{Company, Item, NewSalesOrder, NewSalesOrderLine, SalesOrder};

use types::{ODataList, TokenResponse};

/// OAuth scope for the Business Central API.
const DEFAULT_SCOPE: &str = "https://api.businesscentral.dynamics.com/.default";

/// Refresh the token this long before its reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Timeout applied to every outbound call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when interacting with Business Central.
#[derive(Debug, Error)]
pub enum Bc365Error {
    /// HTTP transport failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limited or temporarily unavailable upstream.
    #[error("Business Central unavailable ({status}): {body}")]
    Transient { status: u16, body: String },

    /// API rejected the request.
    #[error("Business Central API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Failed to parse a response body.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The companies listing came back empty.
    #[error("no companies returned from the Business Central API")]
    NoCompanies,

    /// A company name was configured but does not exist.
    #[error("company '{name}' not found; available: {available:?}")]
    CompanyNotFound { name: String, available: Vec<String> },
}

impl Classify for Bc365Error {
    fn class(&self) -> FailureClass {
        match self {
            Self::Http(_) | Self::Transient { .. } => FailureClass::Transient,
            Self::Api { .. } | Self::Parse(_) => FailureClass::Permanent,
            // A configured company that cannot be resolved is fatal for the
            // calling operation, never silently retried around.
            Self::NoCompanies | Self::CompanyNotFound { .. } => FailureClass::Configuration,
        }
    }
}

/// Bearer token with its expiry, refreshed single-flight.
struct TokenCache {
    cached: RwLock<Option<CachedToken>>,
    refresh: Mutex<()>,
}

#[derive(Clone)]
struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

impl TokenCache {
    fn new() -> Self {
        Self {
            cached: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// The cached token, unless it is within the refresh margin of expiry.
    async fn fresh(&self) -> Option<SecretString> {
        let guard = self.cached.read().await;
        guard
            .as_ref()
            .filter(|cached| Instant::now() + TOKEN_REFRESH_MARGIN < cached.expires_at)
            .map(|cached| cached.token.clone())
    }

    async fn store(&self, token: SecretString, expires_in: Duration) {
        let mut guard = self.cached.write().await;
        *guard = Some(CachedToken {
            token,
            expires_at: Instant::now() + expires_in,
        });
    }
}

/// Business Central API client.
///
/// Cheaply cloneable; all clones share the connection pool, token cache,
/// and resolved company id.
#[derive(Clone)]
pub struct Bc365Client {
    inner: Arc<Bc365ClientInner>,
}

struct Bc365ClientInner {
    client: reqwest::Client,
    api_base: String,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    configured_company_id: Option<CompanyId>,
    configured_company_name: Option<String>,
    default_customer: String,
    company: OnceCell<CompanyId>,
    token: TokenCache,
    retry: RetryPolicy,
}

impl Bc365Client {
    /// Create a client for the configured tenant and environment.
    ///
    /// # Errors
    ///
    /// Returns [`Bc365Error::Http`] if the HTTP client fails to build.
    pub fn new(config: &Bc365Config) -> Result<Self, Bc365Error> {
        Self::with_base_urls(config, config.api_base(), config.token_url())
    }

    /// Create a client against explicit API and token endpoints.
    ///
    /// Used by tests to point the client at a local mock server; production
    /// code goes through [`Bc365Client::new`].
    ///
    /// # Errors
    ///
    /// Returns [`Bc365Error::Http`] if the HTTP client fails to build.
    pub fn with_base_urls(
        config: &Bc365Config,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self, Bc365Error> {
        Self::with_base_urls_and_policy(config, api_base, token_url, RetryPolicy::adapter())
    }

    /// Create a client with an explicit retry policy.
    ///
    /// Lets tests shrink the backoff window; production code keeps the
    /// adapter default.
    ///
    /// # Errors
    ///
    /// Returns [`Bc365Error::Http`] if the HTTP client fails to build.
    pub fn with_base_urls_and_policy(
        config: &Bc365Config,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, Bc365Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            inner: Arc::new(Bc365ClientInner {
                client,
                api_base: api_base.into().trim_end_matches('/').to_owned(),
                token_url: token_url.into(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                configured_company_id: config.company_id.clone(),
                configured_company_name: config.company_name.clone(),
                default_customer: config.default_customer.clone(),
                company: OnceCell::new(),
                token: TokenCache::new(),
                retry,
            }),
        })
    }

    /// Customer number stamped on pushed sales orders.
    #[must_use]
    pub fn default_customer(&self) -> &str {
        &self.inner.default_customer
    }

    /// List the tenant's companies.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_companies(&self) -> Result<Vec<Company>, Bc365Error> {
        let list: ODataList<Company> = self.request(Method::GET, "/companies", &[], None).await?;
        Ok(list.value)
    }

    /// Resolve the company every other operation scopes to.
    ///
    /// A configured company id short-circuits resolution. Otherwise the
    /// companies listing is matched against the configured name - fatal if
    /// the name is configured but absent - or the first company is taken.
    /// The result is cached for the life of the client; concurrent cold
    /// calls share one resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Bc365Error::NoCompanies`] or [`Bc365Error::CompanyNotFound`]
    /// when resolution fails, or an API error from the listing.
    pub async fn resolve_company_id(&self) -> Result<CompanyId, Bc365Error> {
        self.inner
            .company
            .get_or_try_init(|| async {
                if let Some(id) = &self.inner.configured_company_id {
                    return Ok(id.clone());
                }
                let companies = self.list_companies().await?;
                if companies.is_empty() {
                    return Err(Bc365Error::NoCompanies);
                }
                if let Some(name) = &self.inner.configured_company_name {
                    let available: Vec<String> =
                        companies.iter().map(|c| c.name.clone()).collect();
                    return companies
                        .into_iter()
                        .find(|c| &c.name == name)
                        .map(|c| c.id)
                        .ok_or_else(|| Bc365Error::CompanyNotFound {
                            name: name.clone(),
                            available,
                        });
                }
                companies
                    .into_iter()
                    .next()
                    .map(|c| c.id)
                    .ok_or(Bc365Error::NoCompanies)
            })
            .await
            .cloned()
    }

    /// Fetch items, optionally filtered to a set of item numbers.
    ///
    /// The filter is applied client-side over one catalog window read.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, only_numbers))]
    pub async fn fetch_items(
        &self,
        only_numbers: Option<&[ItemNumber]>,
    ) -> Result<Vec<Item>, Bc365Error> {
        let company = self.resolve_company_id().await?;
        let path = format!("/companies({})/items", company.as_str());
        let list: ODataList<Item> = self
            .request(
                Method::GET,
                &path,
                &[(
                    "$select",
                    "id,number,displayName,unitPrice,inventory".to_owned(),
                )],
                None,
            )
            .await?;

        Ok(match only_numbers {
            Some(only) if !only.is_empty() => list
                .value
                .into_iter()
                .filter(|item| only.contains(&item.number))
                .collect(),
            _ => list.value,
        })
    }

    /// Find an item by its number (the ERP half of the SKU join key).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn find_item_by_number(
        &self,
        number: &ItemNumber,
    ) -> Result<Option<Item>, Bc365Error> {
        let company = self.resolve_company_id().await?;
        let path = format!("/companies({})/items", company.as_str());
        let filter = format!("number eq '{}'", escape_odata(number.as_str()));
        let list: ODataList<Item> = self
            .request(Method::GET, &path, &[("$filter", filter)], None)
            .await?;
        Ok(list.value.into_iter().next())
    }

    /// Look up a sales order by its external document number.
    ///
    /// The argument type guarantees the value is already truncated to the
    /// field limit, so this lookup and order creation can never disagree on
    /// the dedup key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn find_sales_order_by_external_no(
        &self,
        ext_no: &ExternalDocumentNumber,
    ) -> Result<Option<SalesOrder>, Bc365Error> {
        let company = self.resolve_company_id().await?;
        let path = format!("/companies({})/salesOrders", company.as_str());
        let filter = format!(
            "externalDocumentNumber eq '{}'",
            escape_odata(ext_no.as_str())
        );
        let list: ODataList<SalesOrder> = self
            .request(Method::GET, &path, &[("$filter", filter)], None)
            .await?;
        Ok(list.value.into_iter().next())
    }

    /// Create a sales order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, order), fields(ext_no = %order.external_document_number))]
    pub async fn push_order(&self, order: &NewSalesOrder) -> Result<SalesOrder, Bc365Error> {
        let company = self.resolve_company_id().await?;
        let path = format!("/companies({})/salesOrders", company.as_str());
        let body = serde_json::to_value(order)?;
        self.request(Method::POST, &path, &[], Some(&body)).await
    }

    /// One API request with bearer auth, retry, and status classification.
    ///
    /// The token fetch happens inside the retry closure, so an expired
    /// token picked up mid-backoff is replaced on the next attempt.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T, Bc365Error> {
        let url = format!("{}{path}", self.inner.api_base);
        let url = url.as_str();
        let value = self
            .inner
            .retry
            .run("bc365_request", || {
                let method = method.clone();
                async move {
                    let token = self.bearer_token().await?;
                    let mut request = self
                        .inner
                        .client
                        .request(method, url)
                        .bearer_auth(token.expose_secret());
                    if !query.is_empty() {
                        request = request.query(query);
                    }
                    if let Some(body) = body {
                        request = request.json(body);
                    }

                    let response = request.send().await?;
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        return Err(Bc365Error::Transient {
                            status: status.as_u16(),
                            body: response.text().await.unwrap_or_default(),
                        });
                    }
                    if !status.is_success() {
                        return Err(Bc365Error::Api {
                            status: status.as_u16(),
                            body: response.text().await.unwrap_or_default(),
                        });
                    }
                    Ok(response.json::<serde_json::Value>().await?)
                }
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// The current bearer token, refreshing proactively when needed.
    async fn bearer_token(&self) -> Result<SecretString, Bc365Error> {
        if let Some(token) = self.inner.token.fresh().await {
            return Ok(token);
        }

        // Single-flight: one refresher fetches while the rest wait, then
        // re-check the cache the winner just filled.
        let _guard = self.inner.token.refresh.lock().await;
        if let Some(token) = self.inner.token.fresh().await {
            return Ok(token);
        }

        let fetched = self.fetch_token().await?;
        let token = SecretString::from(fetched.access_token);
        self.inner
            .token
            .store(token.clone(), Duration::from_secs(fetched.expires_in))
            .await;
        debug!(expires_in = fetched.expires_in, "BC365 token refreshed");
        Ok(token)
    }

    async fn fetch_token(&self) -> Result<TokenResponse, Bc365Error> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("scope", DEFAULT_SCOPE),
        ];
        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Bc365Error::Transient {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(Bc365Error::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }
}

/// Escape a literal for an OData string filter.
fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_is_clone_send_sync() {
        fn assert_clone_send_sync<T: Clone + Send + Sync>() {}
        assert_clone_send_sync::<Bc365Client>();
    }

    #[test]
    fn odata_single_quotes_are_doubled() {
        assert_eq!(escape_odata("O'Brien"), "O''Brien");
        assert_eq!(escape_odata("plain"), "plain");
    }

    #[test]
    fn company_resolution_failures_are_configuration_class() {
        assert_eq!(Bc365Error::NoCompanies.class(), FailureClass::Configuration);
        let not_found = Bc365Error::CompanyNotFound {
            name: "Contoso".into(),
            available: vec!["Fabrikam".into()],
        };
        assert!(!not_found.is_transient());
    }

    #[tokio::test]
    async fn token_cache_reports_stale_within_refresh_margin() {
        let cache = TokenCache::new();
        cache
            .store(SecretString::from("tok"), Duration::from_secs(30))
            .await;
        // 30s of validity is inside the 60s refresh margin.
        assert!(cache.fresh().await.is_none());

        cache
            .store(SecretString::from("tok"), Duration::from_secs(3600))
            .await;
        assert!(cache.fresh().await.is_some());
    }
}
