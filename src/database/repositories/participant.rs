//! Participant and vote repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::Utc;
use crate::models::identity::Platform;
use crate::models::participant::{Participant, ParticipantStatus, Vote};
use crate::resolution::BallotEntry;
use crate::utils::errors::GatherBuddyError;

/// Profile fields supplied with a ballot
#[derive(Debug, Clone, Default)]
pub struct ParticipantProfile {
    pub name: String,
    pub telegram_handle: Option<String>,
    pub discord_handle: Option<String>,
}

fn identity_columns(platform: Platform) -> (&'static str, &'static str) {
    match platform {
        Platform::Telegram => ("telegram_handle", "telegram_chat_id"),
        Platform::Discord => ("discord_handle", "discord_id"),
    }
}

#[derive(Debug, Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a participant of an event and lock the row
    pub async fn lock(&self, conn: &mut PgConnection, event_id: i64, participant_id: i64) -> Result<Option<Participant>, GatherBuddyError> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT * FROM participants WHERE id = $1 AND event_id = $2 FOR UPDATE"
        )
        .bind(participant_id)
        .bind(event_id)
        .fetch_optional(conn)
        .await?;

        Ok(participant)
    }

    /// Create a participant
    pub async fn create(&self, conn: &mut PgConnection, event_id: i64, profile: &ParticipantProfile) -> Result<Participant, GatherBuddyError> {
        let now = Utc::now();
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants (event_id, name, telegram_handle, discord_handle, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#
        )
        .bind(event_id)
        .bind(&profile.name)
        .bind(&profile.telegram_handle)
        .bind(&profile.discord_handle)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(participant)
    }

    /// Update name and handles; a changed handle drops its verified chat id
    pub async fn update_profile(&self, conn: &mut PgConnection, participant_id: i64, profile: &ParticipantProfile) -> Result<Participant, GatherBuddyError> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            UPDATE participants
            SET telegram_chat_id = CASE WHEN lower(telegram_handle) IS DISTINCT FROM lower($3) THEN NULL ELSE telegram_chat_id END,
                discord_id = CASE WHEN lower(discord_handle) IS DISTINCT FROM lower($4) THEN NULL ELSE discord_id END,
                name = $2,
                telegram_handle = $3,
                discord_handle = $4,
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(participant_id)
        .bind(&profile.name)
        .bind(&profile.telegram_handle)
        .bind(&profile.discord_handle)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(participant)
    }

    /// All participants of an event, oldest first
    pub async fn list(&self, conn: &mut PgConnection, event_id: i64) -> Result<Vec<Participant>, GatherBuddyError> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT * FROM participants WHERE event_id = $1 ORDER BY created_at ASC, id ASC"
        )
        .bind(event_id)
        .fetch_all(conn)
        .await?;

        Ok(participants)
    }

    /// Number of participants of an event
    pub async fn count(&self, conn: &mut PgConnection, event_id: i64) -> Result<i64, GatherBuddyError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM participants WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(conn)
            .await?;

        Ok(count.0)
    }

    /// Number of participants in a given status
    pub async fn count_with_status(&self, conn: &mut PgConnection, event_id: i64, status: ParticipantStatus) -> Result<i64, GatherBuddyError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM participants WHERE event_id = $1 AND status = $2")
            .bind(event_id)
            .bind(status)
            .fetch_one(conn)
            .await?;

        Ok(count.0)
    }

    /// Set the status of several participants at once
    pub async fn set_status(&self, conn: &mut PgConnection, participant_ids: &[i64], status: ParticipantStatus) -> Result<(), GatherBuddyError> {
        if participant_ids.is_empty() {
            return Ok(());
        }

        sqlx::query("UPDATE participants SET status = $2, updated_at = $3 WHERE id = ANY($1)")
            .bind(participant_ids)
            .bind(status)
            .bind(Utc::now())
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Put every participant of an event back to PENDING
    pub async fn reset_statuses(&self, conn: &mut PgConnection, event_id: i64) -> Result<(), GatherBuddyError> {
        sqlx::query("UPDATE participants SET status = 'PENDING' WHERE event_id = $1 AND status <> 'PENDING'")
            .bind(event_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Delete a participant; their votes cascade
    pub async fn delete(&self, conn: &mut PgConnection, participant_id: i64) -> Result<(), GatherBuddyError> {
        sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(participant_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Passive capture: link a sender id to participants whose handle matches
    pub async fn capture_chat(&self, platform: Platform, normalized_handle: &str, chat_id: &str) -> Result<u64, GatherBuddyError> {
        let (handle_col, chat_col) = identity_columns(platform);
        let sql = format!(
            "UPDATE participants SET {chat_col} = $2 WHERE lower(ltrim({handle_col}, '@')) = $1 AND {chat_col} IS NULL"
        );

        let result = sqlx::query(&sql)
            .bind(normalized_handle)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Votes of one participant
    pub async fn votes_of(&self, conn: &mut PgConnection, participant_id: i64) -> Result<Vec<Vote>, GatherBuddyError> {
        let votes = sqlx::query_as::<_, Vote>("SELECT * FROM votes WHERE participant_id = $1")
            .bind(participant_id)
            .fetch_all(conn)
            .await?;

        Ok(votes)
    }

    /// Replace all votes of a participant with a merged ballot
    pub async fn replace_votes(&self, conn: &mut PgConnection, participant_id: i64, ballot: &[BallotEntry]) -> Result<(), GatherBuddyError> {
        sqlx::query("DELETE FROM votes WHERE participant_id = $1")
            .bind(participant_id)
            .execute(&mut *conn)
            .await?;

        for entry in ballot {
            sqlx::query(
                r#"
                INSERT INTO votes (participant_id, slot_id, preference, can_host, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#
            )
            .bind(participant_id)
            .bind(entry.slot_id)
            .bind(entry.preference)
            .bind(entry.can_host)
            .bind(entry.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Every vote cast on any slot of an event
    pub async fn votes_for_event(&self, conn: &mut PgConnection, event_id: i64) -> Result<Vec<Vote>, GatherBuddyError> {
        let votes = sqlx::query_as::<_, Vote>(
            r#"
            SELECT v.* FROM votes v
            JOIN time_slots s ON s.id = v.slot_id
            WHERE s.event_id = $1
            ORDER BY v.created_at ASC, v.participant_id ASC
            "#
        )
        .bind(event_id)
        .fetch_all(conn)
        .await?;

        Ok(votes)
    }

    /// Votes cast on one slot
    pub async fn votes_for_slot(&self, conn: &mut PgConnection, slot_id: i64) -> Result<Vec<Vote>, GatherBuddyError> {
        let votes = sqlx::query_as::<_, Vote>(
            "SELECT * FROM votes WHERE slot_id = $1 ORDER BY created_at ASC, participant_id ASC"
        )
        .bind(slot_id)
        .fetch_all(conn)
        .await?;

        Ok(votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_columns() {
        assert_eq!(identity_columns(Platform::Telegram), ("telegram_handle", "telegram_chat_id"));
        assert_eq!(identity_columns(Platform::Discord), ("discord_handle", "discord_id"));
    }
}
