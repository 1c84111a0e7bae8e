//! Database service layer
//!
//! This module provides a high-level interface to database operations

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, Postgres, Transaction};
use crate::config::RetentionConfig;
use crate::database::{DatabasePool, EventRepository, ParticipantRepository, WebhookRepository, LoginTokenRepository};
use crate::models::*;
use crate::utils::errors::GatherBuddyError;
use crate::utils::logging::log_database_operation;

/// Everything needed to render an event, read in one go
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    pub event: Event,
    pub slots: Vec<TimeSlot>,
    pub participants: Vec<Participant>,
    pub votes: Vec<Vote>,
}

impl EventSnapshot {
    pub fn participant(&self, id: i64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn votes_for_slot(&self, slot_id: i64) -> Vec<crate::resolution::SlotVote> {
        self.votes
            .iter()
            .filter(|v| v.slot_id == slot_id)
            .map(crate::resolution::SlotVote::from)
            .collect()
    }

    /// Quorum of every slot with the current votes
    pub fn quorum(&self) -> crate::resolution::EventQuorum {
        let per_slot: Vec<(i64, Vec<crate::resolution::SlotVote>)> = self
            .slots
            .iter()
            .map(|slot| (slot.id, self.votes_for_slot(slot.id)))
            .collect();

        crate::resolution::event_quorum(
            per_slot.iter().map(|(id, votes)| (*id, votes.as_slice())),
            self.participants.len(),
            self.event.min_players,
        )
    }

    pub fn finalized_slot(&self) -> Option<&TimeSlot> {
        let slot_id = self.event.finalized_slot_id?;
        self.slots.iter().find(|s| s.id == slot_id)
    }

    /// Participant names in a given status, in seat order on the finalized slot
    ///
    /// YES before MAYBE, then vote time, so the waitlist reads as the
    /// promotion queue. Anyone without a vote on that slot trails in join order.
    pub fn names_with_status(&self, status: ParticipantStatus) -> Vec<String> {
        let mut seat_votes = self
            .event
            .finalized_slot_id
            .map(|slot_id| self.votes_for_slot(slot_id))
            .unwrap_or_default();
        seat_votes.sort_by(crate::resolution::seat_order);
        let position = |participant_id: i64| {
            seat_votes
                .iter()
                .position(|v| v.participant_id == participant_id)
                .unwrap_or(usize::MAX)
        };

        let mut matching: Vec<&Participant> = self.participants.iter().filter(|p| p.status == status).collect();
        matching.sort_by_key(|p| position(p.id));
        matching.into_iter().map(|p| p.name.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub pool: DatabasePool,
    pub events: EventRepository,
    pub participants: ParticipantRepository,
    pub webhooks: WebhookRepository,
    pub login_tokens: LoginTokenRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            webhooks: WebhookRepository::new(pool.clone()),
            login_tokens: LoginTokenRepository::new(pool.clone()),
            pool,
        }
    }

    /// Start a transaction
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, GatherBuddyError> {
        Ok(self.pool.begin().await?)
    }

    /// Find an event by slug or fail with `EventNotFound`
    pub async fn require_event(&self, slug: &str) -> Result<Event, GatherBuddyError> {
        self.events
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| GatherBuddyError::EventNotFound { slug: slug.to_string() })
    }

    /// Read an event with its slots, participants and votes
    pub async fn snapshot(&self, conn: &mut PgConnection, event: Event) -> Result<EventSnapshot, GatherBuddyError> {
        let slots = sqlx::query_as::<_, TimeSlot>(
            "SELECT id, event_id, start_time, end_time FROM time_slots WHERE event_id = $1 ORDER BY start_time ASC, id ASC"
        )
        .bind(event.id)
        .fetch_all(&mut *conn)
        .await?;
        let participants = self.participants.list(&mut *conn, event.id).await?;
        let votes = self.participants.votes_for_event(&mut *conn, event.id).await?;

        Ok(EventSnapshot { event, slots, participants, votes })
    }

    /// Snapshot outside of any transaction, by event id
    pub async fn load_snapshot(&self, event_id: i64) -> Result<Option<EventSnapshot>, GatherBuddyError> {
        let Some(event) = self.events.find_by_id(event_id).await? else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await?;
        Ok(Some(self.snapshot(&mut conn, event).await?))
    }

    /// Clean up expired data
    pub async fn cleanup_expired_data(&self, retention: &RetentionConfig, now: DateTime<Utc>) -> Result<serde_json::Value, GatherBuddyError> {
        let drafts = self.events.purge(EventStatus::Draft, now - Duration::days(retention.draft_days)).await?;
        let finalized = self.events.purge(EventStatus::Finalized, now - Duration::days(retention.finalized_days)).await?;
        let cancelled = self.events.purge(EventStatus::Cancelled, now - Duration::days(retention.cancelled_days)).await?;
        let login_tokens = self.login_tokens.purge_expired(now).await?;
        log_database_operation("purge", "events", drafts + finalized + cancelled);
        log_database_operation("purge", "login_tokens", login_tokens);

        let cleanup_result = serde_json::json!({
            "draft_events_deleted": drafts,
            "finalized_events_deleted": finalized,
            "cancelled_events_deleted": cancelled,
            "expired_login_tokens_deleted": login_tokens
        });

        Ok(cleanup_result)
    }
}
