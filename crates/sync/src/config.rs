//! Sync pipeline configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Shopify
//! - `SHOPIFY_SHOP` - store domain (e.g., your-store.myshopify.com) [required]
//! - `SHOPIFY_ACCESS_TOKEN` - Admin API access token [required]
//! - `SHOPIFY_API_VERSION` - API version (default: 2024-10)
//! - `SHOPIFY_LOCATION_ID` - target location override (default: first listed)
//! - `SHOPIFY_WEBHOOK_SECRET` - webhook HMAC shared secret
//!
//! ## Business Central
//! - `BC365_TENANT_ID` - Entra tenant id [required]
//! - `BC365_CLIENT_ID` - OAuth client id [required]
//! - `BC365_CLIENT_SECRET` - OAuth client secret [required]
//! - `BC365_ENVIRONMENT` - environment name (default: production)
//! - `BC365_COMPANY_ID` - company id (skips name resolution)
//! - `BC365_COMPANY_NAME` - company name to resolve (fatal if not found)
//! - `BC365_DEFAULT_CUSTOMER` - customer number for pushed orders (default: 10000)
//!
//! ## Mapping
//! - `SKU_MAP_JSON` - JSON object mapping Shopify SKU to BC item number;
//!   rejected at load when two SKUs share an item number

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use saltbridge_core::{CompanyId, LocationId, SkuMap, SkuMapError};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid SKU map in SKU_MAP_JSON: {0}")]
    InvalidSkuMap(#[from] SkuMapError),
}

/// Sync pipeline configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Shopify Admin API configuration.
    pub shopify: ShopifyConfig,
    /// Business Central API configuration.
    pub bc365: Bc365Config,
    /// Configured SKU override table (empty means identity mapping).
    pub sku_map: SkuMap,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Store domain (e.g., your-store.myshopify.com).
    pub store: String,
    /// API version (e.g., 2024-10).
    pub api_version: String,
    /// Admin API access token.
    pub access_token: SecretString,
    /// Target location override; first listed location when absent.
    pub location_id: Option<LocationId>,
    /// Webhook HMAC shared secret.
    pub webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .field("location_id", &self.location_id)
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Business Central API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct Bc365Config {
    /// Entra tenant id.
    pub tenant_id: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: SecretString,
    /// Environment name (production, sandbox, ...).
    pub environment: String,
    /// Company id; when present, name resolution is skipped entirely.
    pub company_id: Option<CompanyId>,
    /// Company name to resolve; fatal if configured but not found.
    pub company_name: Option<String>,
    /// Customer number stamped on pushed sales orders.
    pub default_customer: String,
}

impl std::fmt::Debug for Bc365Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bc365Config")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("company_id", &self.company_id)
            .field("company_name", &self.company_name)
            .field("default_customer", &self.default_customer)
            .finish()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let location_id = match optional_env("SHOPIFY_LOCATION_ID") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<i64>()
                    .map(LocationId::new)
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("SHOPIFY_LOCATION_ID".into(), e.to_string())
                    })?,
            ),
            None => None,
        };

        let shopify = ShopifyConfig {
            store: require_env("SHOPIFY_SHOP")?.trim_end_matches('/').to_owned(),
            api_version: optional_env("SHOPIFY_API_VERSION").unwrap_or_else(|| "2024-10".into()),
            access_token: require_env("SHOPIFY_ACCESS_TOKEN")?.into(),
            location_id,
            webhook_secret: optional_env("SHOPIFY_WEBHOOK_SECRET").map(Into::into),
        };

        let bc365 = Bc365Config {
            tenant_id: require_env("BC365_TENANT_ID")?,
            client_id: require_env("BC365_CLIENT_ID")?,
            client_secret: require_env("BC365_CLIENT_SECRET")?.into(),
            environment: optional_env("BC365_ENVIRONMENT")
                .unwrap_or_else(|| "production".into())
                .trim_matches('/')
                .to_owned(),
            company_id: optional_env("BC365_COMPANY_ID").map(CompanyId::new),
            company_name: optional_env("BC365_COMPANY_NAME"),
            default_customer: optional_env("BC365_DEFAULT_CUSTOMER")
                .unwrap_or_else(|| "10000".into()),
        };

        let sku_map = match optional_env("SKU_MAP_JSON") {
            Some(raw) => SkuMap::from_json(&raw)?,
            None => SkuMap::empty(),
        };

        Ok(Self {
            shopify,
            bc365,
            sku_map,
        })
    }
}

impl ShopifyConfig {
    /// Admin API base URL for this store.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("https://{}/admin/api/{}", self.store, self.api_version)
    }

    /// Expose the access token for header construction.
    #[must_use]
    pub fn token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl Bc365Config {
    /// Business Central API base URL for this environment.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!(
            "https://api.businesscentral.dynamics.com/v2.0/{}/api/v2.0",
            self.environment
        )
    }

    /// Microsoft identity token endpoint for this tenant.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_owned()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shopify_api_base_embeds_store_and_version() {
        let config = ShopifyConfig {
            store: "example.myshopify.com".into(),
            api_version: "2024-10".into(),
            access_token: "shpat_test".into(),
            location_id: None,
            webhook_secret: None,
        };
        assert_eq!(
            config.api_base(),
            "https://example.myshopify.com/admin/api/2024-10"
        );
    }

    #[test]
    fn bc365_urls_embed_environment_and_tenant() {
        let config = Bc365Config {
            tenant_id: "tenant-guid".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            environment: "sandbox".into(),
            company_id: None,
            company_name: None,
            default_customer: "10000".into(),
        };
        assert_eq!(
            config.api_base(),
            "https://api.businesscentral.dynamics.com/v2.0/sandbox/api/v2.0"
        );
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/tenant-guid/oauth2/v2.0/token"
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = ShopifyConfig {
            store: "example.myshopify.com".into(),
            api_version: "2024-10".into(),
            access_token: "shpat_super_secret".into(),
            location_id: None,
            webhook_secret: Some("whsec".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("shpat_super_secret"));
        assert!(!debug.contains("whsec"));
        assert!(debug.contains("[REDACTED]"));
    }
}
