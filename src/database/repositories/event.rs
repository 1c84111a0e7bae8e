//! Event repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::event::{Event, EventStatus, TimeSlot, SlotRequest, ReminderSchedule};
use crate::models::identity::Platform;
use crate::resolution::NotificationFlags;
use crate::utils::errors::GatherBuddyError;

/// Row values for a new event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub slug: String,
    pub title: String,
    pub min_players: i32,
    pub max_players: Option<i32>,
    pub manager_telegram_handle: Option<String>,
    pub manager_discord_handle: Option<String>,
    pub admin_token_hash: String,
    pub recovery_token_hash: String,
    pub recovery_token_expires_at: DateTime<Utc>,
    pub webhook_url: Option<String>,
    pub webhook_correlation_id: Option<String>,
}

/// Column names holding per-platform chat connection state
fn surface_columns(platform: Platform) -> (&'static str, &'static str, &'static str) {
    match platform {
        Platform::Telegram => (
            "telegram_chat_id",
            "telegram_dashboard_message_id",
            "telegram_announcement_message_id",
        ),
        Platform::Discord => (
            "discord_channel_id",
            "discord_dashboard_message_id",
            "discord_announcement_message_id",
        ),
    }
}

/// Column names holding per-platform manager identity
fn manager_columns(platform: Platform) -> (&'static str, &'static str) {
    match platform {
        Platform::Telegram => ("manager_telegram_handle", "manager_telegram_chat_id"),
        Platform::Discord => ("manager_discord_handle", "manager_discord_id"),
    }
}

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, conn: &mut PgConnection, new: NewEvent) -> Result<Event, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (slug, title, min_players, max_players, manager_telegram_handle, manager_discord_handle,
                                admin_token_hash, recovery_token_hash, recovery_token_expires_at,
                                webhook_url, webhook_correlation_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING *
            "#
        )
        .bind(new.slug)
        .bind(new.title)
        .bind(new.min_players)
        .bind(new.max_players)
        .bind(new.manager_telegram_handle)
        .bind(new.manager_discord_handle)
        .bind(new.admin_token_hash)
        .bind(new.recovery_token_hash)
        .bind(new.recovery_token_expires_at)
        .bind(new.webhook_url)
        .bind(new.webhook_correlation_id)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Insert the candidate slots of an event
    pub async fn insert_slots(&self, conn: &mut PgConnection, event_id: i64, slots: &[SlotRequest]) -> Result<Vec<TimeSlot>, GatherBuddyError> {
        let mut created = Vec::with_capacity(slots.len());
        for slot in slots {
            let row = sqlx::query_as::<_, TimeSlot>(
                "INSERT INTO time_slots (event_id, start_time, end_time) VALUES ($1, $2, $3) RETURNING id, event_id, start_time, end_time"
            )
            .bind(event_id)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .fetch_one(&mut *conn)
            .await?;
            created.push(row);
        }

        Ok(created)
    }

    /// Find event by slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Find event by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Load and row-lock an event inside a transaction
    pub async fn lock_by_slug(&self, conn: &mut PgConnection, slug: &str) -> Result<Option<Event>, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE slug = $1 FOR UPDATE")
            .bind(slug)
            .fetch_optional(conn)
            .await?;

        Ok(event)
    }

    /// Load and row-lock the event holding a recovery token hash
    pub async fn lock_by_recovery_hash(&self, conn: &mut PgConnection, token_hash: &str) -> Result<Option<Event>, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE recovery_token_hash = $1 FOR UPDATE")
            .bind(token_hash)
            .fetch_optional(conn)
            .await?;

        Ok(event)
    }

    /// Slots of an event, earliest first
    pub async fn slots(&self, event_id: i64) -> Result<Vec<TimeSlot>, GatherBuddyError> {
        let slots = sqlx::query_as::<_, TimeSlot>(
            "SELECT id, event_id, start_time, end_time FROM time_slots WHERE event_id = $1 ORDER BY start_time ASC, id ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(slots)
    }

    /// Slot by id, scoped to an event
    pub async fn find_slot(&self, conn: &mut PgConnection, event_id: i64, slot_id: i64) -> Result<Option<TimeSlot>, GatherBuddyError> {
        let slot = sqlx::query_as::<_, TimeSlot>(
            "SELECT id, event_id, start_time, end_time FROM time_slots WHERE id = $1 AND event_id = $2"
        )
        .bind(slot_id)
        .bind(event_id)
        .fetch_optional(conn)
        .await?;

        Ok(slot)
    }

    /// Ids of all slots of an event
    pub async fn slot_ids(&self, conn: &mut PgConnection, event_id: i64) -> Result<Vec<i64>, GatherBuddyError> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM time_slots WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(conn)
            .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Transition to FINALIZED with the chosen slot
    pub async fn mark_finalized(
        &self,
        conn: &mut PgConnection,
        event_id: i64,
        slot_id: i64,
        host_id: Option<i64>,
        location: Option<&str>,
    ) -> Result<Event, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET status = 'FINALIZED',
                finalized_slot_id = $2,
                finalized_host_id = $3,
                location = COALESCE($4, location),
                updated_at = $5
            WHERE id = $1 AND status = 'DRAFT'
            RETURNING *
            "#
        )
        .bind(event_id)
        .bind(slot_id)
        .bind(host_id)
        .bind(location)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Transition to CANCELLED; the finalized slot is cleared with it
    pub async fn mark_cancelled(&self, conn: &mut PgConnection, event_id: i64) -> Result<Event, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET status = 'CANCELLED', finalized_slot_id = NULL, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(event_id)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Update the meeting location
    pub async fn update_location(&self, conn: &mut PgConnection, event_id: i64, location: Option<&str>) -> Result<Event, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>(
            "UPDATE events SET location = $2, updated_at = $3 WHERE id = $1 RETURNING *"
        )
        .bind(event_id)
        .bind(location)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Raise quorum notification flags; a flag already true is never cleared
    pub async fn raise_notification_flags(&self, conn: &mut PgConnection, event_id: i64, flags: NotificationFlags) -> Result<(), GatherBuddyError> {
        sqlx::query(
            r#"
            UPDATE events
            SET quorum_viable_notified = quorum_viable_notified OR $2,
                quorum_perfect_notified = quorum_perfect_notified OR $3
            WHERE id = $1
            "#
        )
        .bind(event_id)
        .bind(flags.viable_notified)
        .bind(flags.perfect_notified)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Replace the reminder schedule; notification flags are left untouched
    pub async fn update_reminder_schedule(&self, event_id: i64, schedule: &ReminderSchedule) -> Result<Event, GatherBuddyError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET reminder_enabled = $2, reminder_time = $3, reminder_days = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(event_id)
        .bind(schedule.enabled)
        .bind(schedule.time)
        .bind(&schedule.days)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Connect a chat surface; stored message ids of a previous chat are dropped
    pub async fn connect_surface(&self, event_id: i64, platform: Platform, chat_id: &str) -> Result<Event, GatherBuddyError> {
        let (chat, dashboard, announcement) = surface_columns(platform);
        let sql = format!(
            r#"
            UPDATE events
            SET {dashboard} = CASE WHEN {chat} IS DISTINCT FROM $2 THEN NULL ELSE {dashboard} END,
                {announcement} = CASE WHEN {chat} IS DISTINCT FROM $2 THEN NULL ELSE {announcement} END,
                {chat} = $2,
                updated_at = $3
            WHERE id = $1
            RETURNING *
            "#
        );

        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(event_id)
            .bind(chat_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(event)
    }

    /// Store (or clear) the live dashboard message id of a surface
    pub async fn set_dashboard_message(&self, event_id: i64, platform: Platform, message_id: Option<&str>) -> Result<(), GatherBuddyError> {
        let (_, dashboard, _) = surface_columns(platform);
        let sql = format!("UPDATE events SET {dashboard} = $2 WHERE id = $1");

        sqlx::query(&sql)
            .bind(event_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Store (or clear) the finalized announcement message id of a surface
    pub async fn set_announcement_message(&self, event_id: i64, platform: Platform, message_id: Option<&str>) -> Result<(), GatherBuddyError> {
        let (_, _, announcement) = surface_columns(platform);
        let sql = format!("UPDATE events SET {announcement} = $2 WHERE id = $1");

        sqlx::query(&sql)
            .bind(event_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Bind the manager identity for a platform
    pub async fn set_manager(&self, conn: &mut PgConnection, event_id: i64, platform: Platform, handle: Option<&str>, chat_id: &str) -> Result<(), GatherBuddyError> {
        let (handle_col, chat_col) = manager_columns(platform);
        let sql = format!(
            "UPDATE events SET {handle_col} = COALESCE($2, {handle_col}), {chat_col} = $3, updated_at = $4 WHERE id = $1"
        );

        sqlx::query(&sql)
            .bind(event_id)
            .bind(handle)
            .bind(chat_id)
            .bind(Utc::now())
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Passive capture: link a sender id to events whose manager handle matches
    pub async fn capture_manager_chat(&self, platform: Platform, normalized_handle: &str, chat_id: &str) -> Result<u64, GatherBuddyError> {
        let (handle_col, chat_col) = manager_columns(platform);
        let sql = format!(
            "UPDATE events SET {chat_col} = $2 WHERE lower(ltrim({handle_col}, '@')) = $1 AND {chat_col} IS NULL"
        );

        let result = sqlx::query(&sql)
            .bind(normalized_handle)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Events whose verified manager is the given chat
    pub async fn managed_by(&self, platform: Platform, chat_id: &str) -> Result<Vec<Event>, GatherBuddyError> {
        let (_, chat_col) = manager_columns(platform);
        let sql = format!("SELECT * FROM events WHERE {chat_col} = $1 ORDER BY created_at DESC");

        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Issue a new one-time recovery token, replacing any previous one
    pub async fn set_recovery_token(&self, event_id: i64, token_hash: &str, expires_at: DateTime<Utc>) -> Result<(), GatherBuddyError> {
        sqlx::query(
            "UPDATE events SET recovery_token_hash = $2, recovery_token_expires_at = $3 WHERE id = $1"
        )
        .bind(event_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Consume the recovery token
    pub async fn clear_recovery_token(&self, conn: &mut PgConnection, event_id: i64) -> Result<(), GatherBuddyError> {
        sqlx::query(
            "UPDATE events SET recovery_token_hash = NULL, recovery_token_expires_at = NULL WHERE id = $1"
        )
        .bind(event_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Delete event; slots, participants, votes and webhook rows cascade
    pub async fn delete(&self, conn: &mut PgConnection, event_id: i64) -> Result<(), GatherBuddyError> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Draft events with reminders switched on
    pub async fn reminder_candidates(&self) -> Result<Vec<Event>, GatherBuddyError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE status = 'DRAFT' AND reminder_enabled = TRUE AND reminder_time IS NOT NULL"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Record a reminder send; returns false if another worker got there first
    pub async fn claim_reminder(&self, event_id: i64, due_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<bool, GatherBuddyError> {
        let result = sqlx::query(
            r#"
            UPDATE events SET last_reminder_sent_at = $3
            WHERE id = $1 AND (last_reminder_sent_at IS NULL OR last_reminder_sent_at < $2)
            "#
        )
        .bind(event_id)
        .bind(due_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete events in a status whose last update is older than the cutoff
    pub async fn purge(&self, status: EventStatus, updated_before: DateTime<Utc>) -> Result<u64, GatherBuddyError> {
        let result = sqlx::query("DELETE FROM events WHERE status = $1 AND updated_at < $2")
            .bind(status)
            .bind(updated_before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
