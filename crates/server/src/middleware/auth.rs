//! Authentication extractor for the manual sync triggers.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that requires the admin bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(_: RequireAdminToken) -> impl IntoResponse {
///     "only with a valid ADMIN_API_TOKEN"
/// }
/// ```
pub struct RequireAdminToken;

impl FromRequestParts<AppState> for RequireAdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let Some(token) = header.strip_prefix("Bearer ") else {
            return Err(AppError::Unauthorized("missing bearer token".into()));
        };

        if token != state.config().admin_api_token.expose_secret() {
            return Err(AppError::Forbidden("invalid token".into()));
        }

        Ok(Self)
    }
}
