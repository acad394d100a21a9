//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `ADMIN_API_TOKEN` - bearer token gating the manual sync triggers
//!
//! ## Optional
//! - `API_HOST` - bind address (default: 127.0.0.1)
//! - `API_PORT` - listen port (default: 8000)
//! - `APP_BASE_URL` - public URL, needed for OAuth and webhook registration
//! - `SHOPIFY_CLIENT_ID` / `SHOPIFY_CLIENT_SECRET` - OAuth app credentials
//! - `OAUTH_SCOPES` - comma-separated scopes (default: read_products)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! The sync pipeline's own variables are documented in
//! [`saltbridge_sync::config`].

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;

use saltbridge_sync::{ConfigError, SyncConfig};

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// `PostgreSQL` database connection URL (contains password).
    pub database_url: SecretString,
    /// Public base URL, used for OAuth redirects and webhook addresses.
    pub app_base_url: Option<String>,
    /// Bearer token gating the manual sync triggers.
    pub admin_api_token: SecretString,
    /// Shopify OAuth app client id.
    pub shopify_client_id: Option<String>,
    /// Shopify OAuth app client secret.
    pub shopify_client_secret: Option<SecretString>,
    /// OAuth scopes requested at install.
    pub oauth_scopes: String,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
    /// Sync pipeline configuration.
    pub sync: SyncConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = match optional_env("API_HOST") {
            Some(raw) => raw
                .parse()
                .map_err(|e: std::net::AddrParseError| {
                    ConfigError::InvalidEnvVar("API_HOST".into(), e.to_string())
                })?,
            None => IpAddr::from([127, 0, 0, 1]),
        };
        let port = match optional_env("API_PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar("API_PORT".into(), e.to_string())
            })?,
            None => 8000,
        };

        Ok(Self {
            host,
            port,
            database_url: require_env("DATABASE_URL")?.into(),
            app_base_url: optional_env("APP_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_owned()),
            admin_api_token: require_env("ADMIN_API_TOKEN")?.into(),
            shopify_client_id: optional_env("SHOPIFY_CLIENT_ID"),
            shopify_client_secret: optional_env("SHOPIFY_CLIENT_SECRET").map(Into::into),
            oauth_scopes: optional_env("OAUTH_SCOPES").unwrap_or_else(|| "read_products".into()),
            sentry_dsn: optional_env("SENTRY_DSN"),
            sync: SyncConfig::from_env()?,
        })
    }

    /// Socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
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
