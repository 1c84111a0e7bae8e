//! Webhook outbox repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::webhook::{WebhookEvent, WebhookStatus};
use crate::utils::errors::GatherBuddyError;

#[derive(Debug, Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queue a delivery; must run in the transaction that changed the event
    pub async fn enqueue(&self, conn: &mut PgConnection, event_id: i64, target_url: &str, payload: serde_json::Value) -> Result<WebhookEvent, GatherBuddyError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, WebhookEvent>(
            r#"
            INSERT INTO webhook_events (event_id, target_url, payload, status, attempts, next_attempt, created_at)
            VALUES ($1, $2, $3, 'PENDING', 0, $4, $4)
            RETURNING *
            "#
        )
        .bind(event_id)
        .bind(target_url)
        .bind(payload)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(row)
    }

    /// Find a queued delivery by id
    pub async fn find(&self, id: i64) -> Result<Option<WebhookEvent>, GatherBuddyError> {
        let row = sqlx::query_as::<_, WebhookEvent>("SELECT * FROM webhook_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Take a due pending row for delivery, pushing its next attempt out by
    /// `lease` so a concurrent sweep does not post it twice
    pub async fn claim(&self, id: i64, now: DateTime<Utc>, lease: chrono::Duration) -> Result<Option<WebhookEvent>, GatherBuddyError> {
        let row = sqlx::query_as::<_, WebhookEvent>(
            r#"
            UPDATE webhook_events
            SET next_attempt = $3
            WHERE id = $1 AND status = 'PENDING' AND next_attempt <= $2
            RETURNING *
            "#
        )
        .bind(id)
        .bind(now)
        .bind(now + lease)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Mark a delivery as sent; returns false if it was no longer pending
    pub async fn mark_sent(&self, id: i64) -> Result<bool, GatherBuddyError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'SENT', attempts = attempts + 1, sent_at = $2, last_error = NULL
            WHERE id = $1 AND status = 'PENDING'
            "#
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a failed attempt and the resulting status
    pub async fn record_failure(
        &self,
        id: i64,
        attempts: i32,
        status: WebhookStatus,
        next_attempt: DateTime<Utc>,
        error: &str,
    ) -> Result<(), GatherBuddyError> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET attempts = $2, status = $3, next_attempt = $4, last_error = $5
            WHERE id = $1 AND status = 'PENDING'
            "#
        )
        .bind(id)
        .bind(attempts)
        .bind(status)
        .bind(next_attempt)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Ids of pending deliveries whose next attempt is due
    pub async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<i64>, GatherBuddyError> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM webhook_events
            WHERE status = 'PENDING' AND next_attempt <= $1
            ORDER BY next_attempt ASC
            LIMIT $2
            "#
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
