//! Shopify OAuth install flow.
//!
//! `GET /oauth/install?shop=` redirects the merchant to the authorize
//! page; `GET /oauth/callback` verifies the state nonce and the query
//! HMAC, exchanges the grant code for an Admin API token, persists it, and
//! registers the default webhooks idempotently.

use axum::extract::{Query, State};
use axum::response::{Html, Redirect};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

use saltbridge_sync::ShopifyConfig;
use saltbridge_sync::shopify::{ShopifyClient, webhooks::register_default_webhooks};

use crate::error::{AppError, Result};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Query parameters for the install entry point.
#[derive(Debug, Deserialize)]
pub struct InstallParams {
    pub shop: String,
}

/// Query parameters of the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub shop: Option<String>,
    pub hmac: Option<String>,
    pub timestamp: Option<String>,
    pub host: Option<String>,
}

/// Start the install flow by redirecting to the authorize page.
#[instrument(skip(state))]
pub async fn install(
    State(state): State<AppState>,
    Query(params): Query<InstallParams>,
) -> Result<Redirect> {
    let config = state.config();
    let (Some(client_id), Some(base)) = (&config.shopify_client_id, &config.app_base_url) else {
        return Err(AppError::Internal(
            "OAuth is not configured; set SHOPIFY_CLIENT_ID and APP_BASE_URL".into(),
        ));
    };

    let nonce = Uuid::new_v4().simple().to_string();
    state.insert_oauth_nonce(nonce.clone()).await;

    let mut url = Url::parse(&format!("https://{}/admin/oauth/authorize", params.shop))
        .map_err(|e| AppError::BadRequest(format!("invalid shop domain: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("scope", &config.oauth_scopes)
        .append_pair("redirect_uri", &format!("{base}/oauth/callback"))
        .append_pair("state", &nonce);

    Ok(Redirect::to(url.as_str()))
}

/// Complete the install flow.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Html<String>> {
    let (Some(shop), Some(code), Some(nonce)) = (&params.shop, &params.code, &params.state) else {
        return Err(AppError::BadRequest("invalid OAuth response".into()));
    };
    if !state.take_oauth_nonce(nonce).await {
        return Err(AppError::BadRequest("unknown OAuth state".into()));
    }

    let config = state.config();
    let (Some(client_id), Some(client_secret)) =
        (&config.shopify_client_id, &config.shopify_client_secret)
    else {
        return Err(AppError::Internal("OAuth is not configured".into()));
    };
    if !verify_oauth_hmac(&params, client_secret.expose_secret()) {
        return Err(AppError::Unauthorized("invalid HMAC".into()));
    }

    let access_token = exchange_code(shop, client_id, client_secret.expose_secret(), code).await?;
    state.store().save_shop_token(shop, &access_token).await?;
    info!(shop, "shop token stored");

    if let Some(base) = &config.app_base_url {
        let shop_config = ShopifyConfig {
            store: shop.clone(),
            api_version: config.sync.shopify.api_version.clone(),
            access_token: access_token.into(),
            location_id: None,
            webhook_secret: config.sync.shopify.webhook_secret.clone(),
        };
        let client = ShopifyClient::new(&shop_config)
            .map_err(saltbridge_sync::SyncError::from)?;
        register_default_webhooks(&client, base)
            .await
            .map_err(saltbridge_sync::SyncError::from)?;
    }

    Ok(Html(format!(
        "<h2>Installed for {shop}</h2><p>Webhooks registered.</p>"
    )))
}

/// Exchange the grant code for an Admin API access token.
async fn exchange_code(
    shop: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> Result<String> {
    #[derive(Deserialize)]
    struct TokenExchangeResponse {
        access_token: String,
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let response = client
        .post(format!("https://{shop}/admin/oauth/access_token"))
        .json(&serde_json::json!({
            "client_id": client_id,
            "client_secret": client_secret,
            "code": code,
        }))
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("token exchange failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::Internal(format!(
            "token exchange failed with status {}",
            response.status()
        )));
    }

    let token: TokenExchangeResponse = response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("malformed token response: {e}")))?;
    Ok(token.access_token)
}

/// Verify the HMAC signature of the OAuth callback query.
///
/// The message is the sorted `key=value` join of every parameter except
/// `hmac` itself, signed with the app client secret and hex-encoded.
fn verify_oauth_hmac(params: &OAuthCallbackParams, client_secret: &str) -> bool {
    let Some(provided) = &params.hmac else {
        return false;
    };

    // Build the message from sorted params (excluding hmac)
    let mut pairs: Vec<(&str, &String)> = Vec::new();
    if let Some(v) = &params.code {
        pairs.push(("code", v));
    }
    if let Some(v) = &params.host {
        pairs.push(("host", v));
    }
    if let Some(v) = &params.shop {
        pairs.push(("shop", v));
    }
    if let Some(v) = &params.state {
        pairs.push(("state", v));
    }
    if let Some(v) = &params.timestamp {
        pairs.push(("timestamp", v));
    }
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let message: String = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(mut mac) = HmacSha256::new_from_slice(client_secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());

    let Ok(expected) = hex::decode(provided) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_params(secret: &str) -> OAuthCallbackParams {
        let mut params = OAuthCallbackParams {
            code: Some("grant".into()),
            state: Some("nonce".into()),
            shop: Some("example.myshopify.com".into()),
            hmac: None,
            timestamp: Some("1700000000".into()),
            host: None,
        };
        let message = "code=grant&shop=example.myshopify.com&state=nonce&timestamp=1700000000";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(message.as_bytes());
        params.hmac = Some(hex::encode(mac.finalize().into_bytes()));
        params
    }

    #[test]
    fn valid_callback_hmac_verifies() {
        let params = signed_params("app-secret");
        assert!(verify_oauth_hmac(&params, "app-secret"));
    }

    #[test]
    fn tampered_params_are_rejected() {
        let mut params = signed_params("app-secret");
        params.shop = Some("evil.example.com".into());
        assert!(!verify_oauth_hmac(&params, "app-secret"));
    }

    #[test]
    fn missing_hmac_is_rejected() {
        let mut params = signed_params("app-secret");
        params.hmac = None;
        assert!(!verify_oauth_hmac(&params, "app-secret"));
    }
}
