//! Login token repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::identity::{LoginToken, Platform};
use crate::utils::errors::GatherBuddyError;

#[derive(Debug, Clone)]
pub struct LoginTokenRepository {
    pool: PgPool,
}

impl LoginTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a hashed login token
    pub async fn insert(&self, token_hash: &str, platform: Platform, chat_id: &str, expires_at: DateTime<Utc>) -> Result<LoginToken, GatherBuddyError> {
        let token = sqlx::query_as::<_, LoginToken>(
            r#"
            INSERT INTO login_tokens (token_hash, platform, chat_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#
        )
        .bind(token_hash)
        .bind(platform)
        .bind(chat_id)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    /// Remove and return a token; a second call for the same hash yields nothing
    pub async fn consume(&self, token_hash: &str) -> Result<Option<LoginToken>, GatherBuddyError> {
        let token = sqlx::query_as::<_, LoginToken>(
            "DELETE FROM login_tokens WHERE token_hash = $1 RETURNING *"
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    /// Drop expired tokens
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, GatherBuddyError> {
        let result = sqlx::query("DELETE FROM login_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
