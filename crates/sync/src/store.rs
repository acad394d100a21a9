//! Shop credentials and idempotency markers in Postgres.
//!
//! Two small lookup tables, each accessed with one short-lived pool
//! acquire per operation - no long-held transactions, no cross-request
//! locking.

use sha2::{Digest, Sha256};
use sqlx::PgPool;

/// Repository for the shop-token and idempotency-key tables.
#[derive(Clone)]
pub struct SyncStore {
    pool: PgPool,
}

impl SyncStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored Admin API token for a shop domain.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the query fails.
    pub async fn get_shop_token(&self, domain: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT access_token FROM shops WHERE domain = $1")
                .bind(domain)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(token,)| token))
    }

    /// Upsert the Admin API token for a shop domain.
    ///
    /// Called on every (re)install; the newest token wins.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the query fails.
    pub async fn save_shop_token(&self, domain: &str, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO shops (domain, access_token) VALUES ($1, $2)
             ON CONFLICT (domain) DO UPDATE SET access_token = EXCLUDED.access_token",
        )
        .bind(domain)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record an idempotency key; `true` when this is its first sighting.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the query fails.
    pub async fn ensure_once(&self, key: &str, note: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO idempotency_keys (key, note) VALUES ($1, $2)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(note)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Idempotency key for a payload: SHA-256 over the raw bytes, hex-encoded.
#[must_use]
pub fn idempotency_key_for(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
