//! Scheduling orchestration
//!
//! The one place where request-triggered state changes happen: create, vote,
//! finalize, cancel, location and reminder edits, deletion and participant
//! removal, plus the periodic maintenance tick. Each change runs in a single
//! transaction with the event row locked; chat and webhook propagation is
//! started only after commit and never fails the action.

use std::collections::HashSet;
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use tracing::{info, warn};
use url::Url;
use crate::config::settings::Settings;
use crate::database::repositories::{NewEvent, ParticipantProfile};
use crate::database::service::{DatabaseService, EventSnapshot};
use crate::models::*;
use crate::resolution::{
    admit_after_finalize, allocate_seats, decide_alert, merge_ballot, promote_from_waitlist, NotificationFlags,
    QuorumAlert, SlotVote,
};
use crate::services::auth::{generate_long_token, hash_token, AdminCredential, AuthService};
use crate::services::dashboard::DashboardService;
use crate::services::identity::{ClaimOutcome, IdentityService};
use crate::services::notification::NotificationService;
use crate::services::webhook::{build_payload, WebhookService};
use crate::utils::errors::{GatherBuddyError, Result};
use crate::utils::helpers::{generate_slug, normalize_handle, normalize_whitespace};
use crate::utils::logging::log_event_action;

const SLUG_LENGTH: usize = 10;
const SLUG_ATTEMPTS: usize = 5;
const SETUP_TOKEN_TTL_DAYS: i64 = 7;
const MAX_TITLE_CHARS: usize = 200;
const MAX_NAME_CHARS: usize = 80;
const MAX_LOCATION_CHARS: usize = 300;

/// Returned once at creation; the admin token is never shown again
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub slug: String,
    pub admin_token: String,
    pub link: String,
    pub setup_recovery_link: String,
}

/// Chat side effects to run after a commit
#[derive(Debug, Clone, Default)]
enum SurfaceAction {
    #[default]
    None,
    Refresh,
    Finalized,
    Cancelled { was_finalized: bool },
    Retire(Box<Event>),
}

#[derive(Debug, Clone, Default)]
struct Followup {
    surfaces: SurfaceAction,
    alert: Option<QuorumAlert>,
    promoted: Vec<i64>,
    webhooks: Vec<i64>,
}

/// Check a create request before touching the database
pub fn validate_create(request: &CreateEventRequest) -> Result<()> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(GatherBuddyError::InvalidInput("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(GatherBuddyError::InvalidInput("Title is too long".to_string()));
    }
    if request.min_players < 1 {
        return Err(GatherBuddyError::InvalidInput("At least one player is required".to_string()));
    }
    if let Some(max) = request.max_players {
        if max < request.min_players {
            return Err(GatherBuddyError::InvalidInput(
                "Maximum players cannot be below the minimum".to_string(),
            ));
        }
    }
    if request.slots.is_empty() {
        return Err(GatherBuddyError::InvalidInput("At least one time slot is required".to_string()));
    }
    if request.slots.iter().any(|slot| slot.end_time <= slot.start_time) {
        return Err(GatherBuddyError::InvalidInput("A time slot must end after it starts".to_string()));
    }
    if let Some(url) = request.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let parsed = Url::parse(url.trim())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatherBuddyError::InvalidInput("Webhook URL must be http or https".to_string()));
        }
    }
    Ok(())
}

/// Check a reminder schedule
pub fn validate_reminder_schedule(schedule: &ReminderSchedule) -> Result<()> {
    if schedule.enabled && schedule.time.is_none() {
        return Err(GatherBuddyError::InvalidInput("A reminder needs a time of day".to_string()));
    }
    if schedule.days.iter().any(|day| !(0..=6).contains(day)) {
        return Err(GatherBuddyError::InvalidInput("Reminder days must be 0 (Monday) to 6 (Sunday)".to_string()));
    }
    Ok(())
}

/// Today's reminder time if a reminder is due now
pub fn reminder_due_at(days: &[i32], time: Option<NaiveTime>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let time = time?;
    let weekday = i32::try_from(now.weekday().num_days_from_monday()).ok()?;
    if !days.contains(&weekday) {
        return None;
    }
    let due = Utc.from_utc_datetime(&now.date_naive().and_time(time));
    (now >= due).then_some(due)
}

fn clean_handle(handle: Option<&str>) -> Option<String> {
    handle.map(normalize_handle).filter(|h| !h.is_empty())
}

fn clean_text(text: Option<&str>, max_chars: usize) -> Result<Option<String>> {
    let Some(text) = text.map(normalize_whitespace).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > max_chars {
        return Err(GatherBuddyError::InvalidInput("Text is too long".to_string()));
    }
    Ok(Some(text))
}

fn is_unique_violation(error: &GatherBuddyError) -> bool {
    matches!(error, GatherBuddyError::Database(sqlx::Error::Database(e)) if e.is_unique_violation())
}

#[derive(Clone)]
pub struct SchedulingService {
    db: DatabaseService,
    auth: AuthService,
    identity: IdentityService,
    dashboard: DashboardService,
    notifications: NotificationService,
    webhooks: WebhookService,
    settings: Settings,
}

impl SchedulingService {
    pub fn new(
        db: DatabaseService,
        auth: AuthService,
        identity: IdentityService,
        dashboard: DashboardService,
        notifications: NotificationService,
        webhooks: WebhookService,
        settings: Settings,
    ) -> Self {
        Self { db, auth, identity, dashboard, notifications, webhooks, settings }
    }

    async fn lock_event(&self, conn: &mut PgConnection, slug: &str) -> Result<Event> {
        self.db
            .events
            .lock_by_slug(conn, slug)
            .await?
            .ok_or_else(|| GatherBuddyError::EventNotFound { slug: slug.to_string() })
    }

    async fn enqueue_webhook(&self, conn: &mut PgConnection, kind: WebhookEventType, snapshot: &EventSnapshot) -> Result<Option<i64>> {
        let payload = build_payload(kind, snapshot, self.settings.event_link(&snapshot.event.slug), Utc::now());
        self.webhooks
            .enqueue(conn, &payload, snapshot.event.webhook_url.as_deref())
            .await
    }

    /// Create an event with its slots
    pub async fn create_event(&self, request: CreateEventRequest) -> Result<CreatedEvent> {
        validate_create(&request)?;

        let admin_token = generate_long_token();
        let setup_token = generate_long_token();
        let mut last_error = None;

        for _ in 0..SLUG_ATTEMPTS {
            let new = NewEvent {
                slug: generate_slug(SLUG_LENGTH),
                title: normalize_whitespace(&request.title),
                min_players: request.min_players,
                max_players: request.max_players,
                manager_telegram_handle: clean_handle(request.manager_telegram_handle.as_deref()),
                manager_discord_handle: clean_handle(request.manager_discord_handle.as_deref()),
                admin_token_hash: hash_token(&admin_token),
                recovery_token_hash: hash_token(&setup_token),
                recovery_token_expires_at: Utc::now() + Duration::days(SETUP_TOKEN_TTL_DAYS),
                webhook_url: request.webhook_url.as_deref().map(str::trim).filter(|u| !u.is_empty()).map(str::to_string),
                webhook_correlation_id: request.from_url_id.clone(),
            };

            let mut tx = self.db.begin().await?;
            let event = match self.db.events.create(&mut *tx, new).await {
                Ok(event) => event,
                Err(e) if is_unique_violation(&e) => {
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let slots = self.db.events.insert_slots(&mut *tx, event.id, &request.slots).await?;

            let snapshot = EventSnapshot { event, slots, participants: Vec::new(), votes: Vec::new() };
            let webhook = self.enqueue_webhook(&mut *tx, WebhookEventType::Created, &snapshot).await?;
            tx.commit().await?;

            let event = snapshot.event;
            log_event_action(event.id, "create", None, Some(&event.slug));
            self.webhooks.spawn_delivery(webhook.into_iter().collect());

            return Ok(CreatedEvent {
                link: self.settings.event_link(&event.slug),
                setup_recovery_link: self
                    .settings
                    .telegram_start_link(&format!("setup_recovery_{}_{}", event.slug, setup_token)),
                slug: event.slug,
                admin_token,
            });
        }

        Err(last_error.unwrap_or_else(|| GatherBuddyError::ServiceUnavailable("could not allocate a slug".to_string())))
    }

    /// Submit or replace a participant's ballot
    pub async fn vote(&self, slug: &str, request: VoteRequest) -> Result<VoteResponse> {
        let name = clean_text(Some(&request.name), MAX_NAME_CHARS)?
            .ok_or_else(|| GatherBuddyError::InvalidInput("Name is required".to_string()))?;
        let profile = ParticipantProfile {
            name,
            telegram_handle: clean_handle(request.telegram_handle.as_deref()),
            discord_handle: clean_handle(request.discord_handle.as_deref()),
        };

        let mut tx = self.db.begin().await?;
        let event = self.lock_event(&mut *tx, slug).await?;
        if event.status == EventStatus::Cancelled {
            return Err(GatherBuddyError::InvalidInput("Voting is closed for this event".to_string()));
        }

        let slot_ids: HashSet<i64> = self.db.events.slot_ids(&mut *tx, event.id).await?.into_iter().collect();
        if let Some(unknown) = request.votes.iter().find(|v| !slot_ids.contains(&v.slot_id)) {
            return Err(GatherBuddyError::SlotNotFound { event_id: event.id, slot_id: unknown.slot_id });
        }

        let participant = match request.participant_id {
            Some(id) => {
                self.db
                    .participants
                    .lock(&mut *tx, event.id, id)
                    .await?
                    .ok_or(GatherBuddyError::ParticipantNotFound { event_id: event.id, participant_id: id })?;
                self.db.participants.update_profile(&mut *tx, id, &profile).await?
            }
            None => self.db.participants.create(&mut *tx, event.id, &profile).await?,
        };

        let previous = self.db.participants.votes_of(&mut *tx, participant.id).await?;
        let ballot = merge_ballot(&previous, &request.votes, Utc::now());
        self.db.participants.replace_votes(&mut *tx, participant.id, &ballot).await?;

        let mut followup = Followup { surfaces: SurfaceAction::Refresh, ..Default::default() };
        match event.status {
            EventStatus::Draft => {
                let snapshot = self.db.snapshot(&mut *tx, event.clone()).await?;
                let flags = NotificationFlags {
                    viable_notified: event.quorum_viable_notified,
                    perfect_notified: event.quorum_perfect_notified,
                };
                if let Some((alert, raised)) = decide_alert(&snapshot.quorum(), flags) {
                    self.db.events.raise_notification_flags(&mut *tx, event.id, raised).await?;
                    followup.alert = Some(alert);
                }
            }
            EventStatus::Finalized => {
                let finalized_slot = event.finalized_slot_id;
                let preference = ballot
                    .iter()
                    .find(|entry| Some(entry.slot_id) == finalized_slot)
                    .map(|entry| entry.preference);
                let accepted = self
                    .db
                    .participants
                    .count_with_status(&mut *tx, event.id, ParticipantStatus::Accepted)
                    .await?;
                let status = admit_after_finalize(
                    participant.status,
                    preference,
                    usize::try_from(accepted).unwrap_or(0),
                    event.max_players,
                );
                self.db.participants.set_status(&mut *tx, &[participant.id], status).await?;
                followup.promoted = self
                    .promote_vacancies(&mut *tx, &event, usize::try_from(accepted).unwrap_or(0))
                    .await?;
            }
            EventStatus::Cancelled => {}
        }

        tx.commit().await?;
        log_event_action(event.id, "vote", Some(&participant.name), None);
        self.dispatch(event.id, followup);

        Ok(VoteResponse { participant_id: participant.id })
    }

    /// Refill seats on the finalized slot given up since `accepted_before`
    async fn promote_vacancies(&self, conn: &mut PgConnection, event: &Event, accepted_before: usize) -> Result<Vec<i64>> {
        let Some(slot_id) = event.finalized_slot_id else {
            return Ok(Vec::new());
        };

        let participants = self.db.participants.list(&mut *conn, event.id).await?;
        let waitlisted: HashSet<i64> = participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Waitlist)
            .map(|p| p.id)
            .collect();
        let accepted = participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Accepted)
            .count();

        let candidates: Vec<SlotVote> = self
            .db
            .participants
            .votes_for_slot(&mut *conn, slot_id)
            .await?
            .iter()
            .filter(|v| waitlisted.contains(&v.participant_id))
            .map(SlotVote::from)
            .collect();

        let promoted = promote_from_waitlist(&candidates, accepted_before, accepted, event.max_players);
        self.db
            .participants
            .set_status(&mut *conn, &promoted, ParticipantStatus::Accepted)
            .await?;

        if !promoted.is_empty() {
            info!(event_id = event.id, promoted = ?promoted, "Promoted from waitlist");
        }
        Ok(promoted)
    }

    /// Pick the slot and allocate seats
    pub async fn finalize(&self, slug: &str, credential: Option<&AdminCredential>, request: FinalizeRequest) -> Result<()> {
        let location = clean_text(request.location.as_deref(), MAX_LOCATION_CHARS)?;

        let mut tx = self.db.begin().await?;
        let event = self.lock_event(&mut *tx, slug).await?;
        let actor = self.auth.authorize_manager(&event, credential)?;

        if event.status != EventStatus::Draft {
            return Err(GatherBuddyError::InvalidStateTransition {
                from: event.status.to_string(),
                to: EventStatus::Finalized.to_string(),
            });
        }

        self.db
            .events
            .find_slot(&mut *tx, event.id, request.slot_id)
            .await?
            .ok_or(GatherBuddyError::SlotNotFound { event_id: event.id, slot_id: request.slot_id })?;

        if let Some(host_id) = request.host_id {
            self.db
                .participants
                .lock(&mut *tx, event.id, host_id)
                .await?
                .ok_or(GatherBuddyError::ParticipantNotFound { event_id: event.id, participant_id: host_id })?;
        }

        let votes: Vec<SlotVote> = self
            .db
            .participants
            .votes_for_slot(&mut *tx, request.slot_id)
            .await?
            .iter()
            .map(SlotVote::from)
            .collect();
        let allocation = allocate_seats(&votes, event.min_players, event.max_players);

        self.db.participants.reset_statuses(&mut *tx, event.id).await?;
        self.db
            .participants
            .set_status(&mut *tx, &allocation.accepted, ParticipantStatus::Accepted)
            .await?;
        self.db
            .participants
            .set_status(&mut *tx, &allocation.waitlist, ParticipantStatus::Waitlist)
            .await?;
        let finalized = self
            .db
            .events
            .mark_finalized(&mut *tx, event.id, request.slot_id, request.host_id, location.as_deref())
            .await?;

        let snapshot = self.db.snapshot(&mut *tx, finalized).await?;
        let webhook = self.enqueue_webhook(&mut *tx, WebhookEventType::Finalized, &snapshot).await?;
        tx.commit().await?;

        log_event_action(
            event.id,
            "finalize",
            Some(&actor.to_string()),
            Some(&format!(
                "slot={} accepted={} waitlist={}",
                request.slot_id,
                allocation.accepted.len(),
                allocation.waitlist.len()
            )),
        );
        self.dispatch(
            event.id,
            Followup {
                surfaces: SurfaceAction::Finalized,
                webhooks: webhook.into_iter().collect(),
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Cancel a draft or finalized event
    pub async fn cancel(&self, slug: &str, credential: Option<&AdminCredential>) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let event = self.lock_event(&mut *tx, slug).await?;
        let actor = self.auth.authorize_manager(&event, credential)?;

        if event.status == EventStatus::Cancelled {
            return Err(GatherBuddyError::InvalidStateTransition {
                from: event.status.to_string(),
                to: EventStatus::Cancelled.to_string(),
            });
        }

        let cancelled = self.db.events.mark_cancelled(&mut *tx, event.id).await?;
        let snapshot = self.db.snapshot(&mut *tx, cancelled).await?;
        let webhook = self.enqueue_webhook(&mut *tx, WebhookEventType::Cancelled, &snapshot).await?;
        tx.commit().await?;

        log_event_action(event.id, "cancel", Some(&actor.to_string()), None);
        self.dispatch(
            event.id,
            Followup {
                surfaces: SurfaceAction::Cancelled { was_finalized: event.status == EventStatus::Finalized },
                webhooks: webhook.into_iter().collect(),
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Set or clear the meeting location
    pub async fn update_location(&self, slug: &str, credential: Option<&AdminCredential>, location: Option<String>) -> Result<()> {
        let location = clean_text(location.as_deref(), MAX_LOCATION_CHARS)?;

        let mut tx = self.db.begin().await?;
        let event = self.lock_event(&mut *tx, slug).await?;
        let actor = self.auth.authorize_manager(&event, credential)?;

        if event.status == EventStatus::Cancelled {
            return Err(GatherBuddyError::InvalidInput("The event is cancelled".to_string()));
        }

        let updated = self.db.events.update_location(&mut *tx, event.id, location.as_deref()).await?;
        let mut webhooks = Vec::new();
        if updated.status == EventStatus::Finalized {
            let snapshot = self.db.snapshot(&mut *tx, updated).await?;
            webhooks.extend(self.enqueue_webhook(&mut *tx, WebhookEventType::LocationUpdated, &snapshot).await?);
        }
        tx.commit().await?;

        log_event_action(event.id, "update_location", Some(&actor.to_string()), location.as_deref());
        self.dispatch(
            event.id,
            Followup { surfaces: SurfaceAction::Refresh, webhooks, ..Default::default() },
        );
        Ok(())
    }

    /// Replace the reminder schedule; quorum flags are left alone
    pub async fn update_reminder_schedule(&self, slug: &str, credential: Option<&AdminCredential>, schedule: ReminderSchedule) -> Result<Event> {
        validate_reminder_schedule(&schedule)?;

        let event = self.db.require_event(slug).await?;
        let actor = self.auth.authorize_manager(&event, credential)?;

        let mut schedule = schedule;
        schedule.days.sort_unstable();
        schedule.days.dedup();

        let updated = self.db.events.update_reminder_schedule(event.id, &schedule).await?;
        log_event_action(event.id, "update_reminders", Some(&actor.to_string()), None);
        Ok(updated)
    }

    /// Delete an event and retire its chat messages
    pub async fn delete(&self, slug: &str, credential: Option<&AdminCredential>) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let event = self.lock_event(&mut *tx, slug).await?;
        let actor = self.auth.authorize_manager(&event, credential)?;

        self.db.events.delete(&mut *tx, event.id).await?;
        tx.commit().await?;

        log_event_action(event.id, "delete", Some(&actor.to_string()), Some(slug));
        self.dispatch(
            event.id,
            Followup { surfaces: SurfaceAction::Retire(Box::new(event)), ..Default::default() },
        );
        Ok(())
    }

    /// Remove a participant and their votes, promoting into a freed seat
    pub async fn remove_participant(&self, slug: &str, credential: Option<&AdminCredential>, participant_id: i64) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let event = self.lock_event(&mut *tx, slug).await?;
        let actor = self.auth.authorize_manager(&event, credential)?;

        self.db
            .participants
            .lock(&mut *tx, event.id, participant_id)
            .await?
            .ok_or(GatherBuddyError::ParticipantNotFound { event_id: event.id, participant_id })?;
        let accepted_before = self
            .db
            .participants
            .count_with_status(&mut *tx, event.id, ParticipantStatus::Accepted)
            .await?;
        self.db.participants.delete(&mut *tx, participant_id).await?;

        let promoted = if event.status == EventStatus::Finalized {
            self.promote_vacancies(&mut *tx, &event, usize::try_from(accepted_before).unwrap_or(0))
                .await?
        } else {
            Vec::new()
        };
        tx.commit().await?;

        log_event_action(
            event.id,
            "remove_participant",
            Some(&actor.to_string()),
            Some(&participant_id.to_string()),
        );
        self.dispatch(
            event.id,
            Followup { surfaces: SurfaceAction::Refresh, promoted, ..Default::default() },
        );
        Ok(())
    }

    /// Connect a group chat to an event; the sender must be or become its manager
    pub async fn connect_chat(&self, slug: &str, sender: &ChatIdentity, chat_id: &str) -> Result<Event> {
        match self.identity.claim(slug, sender).await? {
            ClaimOutcome::Claimed | ClaimOutcome::AlreadyManager => {}
            ClaimOutcome::NotManager => {
                return Err(GatherBuddyError::PermissionDenied(format!(
                    "{}:{} may not connect {}",
                    sender.platform, sender.user_id, slug
                )));
            }
        }

        let event = self.db.require_event(slug).await?;
        if event.status == EventStatus::Cancelled {
            return Err(GatherBuddyError::InvalidInput("The event is cancelled".to_string()));
        }

        let connected = self.db.events.connect_surface(event.id, sender.platform, chat_id).await?;
        log_event_action(event.id, "connect_chat", Some(&sender.user_id), Some(chat_id));
        match sender.platform {
            // Discord interactions must be answered within three seconds
            Platform::Discord => {
                let dashboard = self.dashboard.clone();
                let event_id = connected.id;
                tokio::spawn(async move {
                    dashboard.refresh_event(event_id).await;
                });
            }
            Platform::Telegram => self.dashboard.refresh_event(connected.id).await,
        }
        Ok(connected)
    }

    /// Start post-commit propagation in the background
    fn dispatch(&self, event_id: i64, followup: Followup) {
        self.webhooks.spawn_delivery(followup.webhooks.clone());

        let service = self.clone();
        tokio::spawn(async move {
            service.propagate(event_id, followup).await;
        });
    }

    async fn propagate(&self, event_id: i64, followup: Followup) {
        if let SurfaceAction::Retire(event) = &followup.surfaces {
            self.dashboard.retire_all(event).await;
            return;
        }

        let snapshot = match self.db.load_snapshot(event_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                warn!(event_id = event_id, error = %e, "Failed to load event for propagation");
                return;
            }
        };

        match followup.surfaces {
            SurfaceAction::None | SurfaceAction::Retire(_) => {}
            SurfaceAction::Refresh => self.dashboard.refresh(&snapshot).await,
            SurfaceAction::Finalized => {
                self.dashboard.announce_finalized(&snapshot).await;
                self.notifications.notify_allocation(&snapshot).await;
            }
            SurfaceAction::Cancelled { was_finalized } => {
                self.dashboard.announce_cancelled(&snapshot.event).await;
                if was_finalized {
                    self.notifications.notify_cancelled(&snapshot).await;
                }
            }
        }

        if let Some(alert) = followup.alert {
            self.notifications.notify_quorum(&snapshot.event, alert).await;
        }
        if !followup.promoted.is_empty() {
            self.notifications.notify_promoted(&snapshot, &followup.promoted).await;
        }
    }

    /// Send due reminders; returns how many events were reminded
    pub async fn send_reminders(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sent = 0;
        for event in self.db.events.reminder_candidates().await? {
            let Some(due_at) = reminder_due_at(&event.reminder_days, event.reminder_time, now) else {
                continue;
            };
            if !self.db.events.claim_reminder(event.id, due_at, now).await? {
                continue;
            }

            let event_id = event.id;
            let mut conn = self.db.pool.acquire().await?;
            let snapshot = self.db.snapshot(&mut *conn, event).await?;
            if self.dashboard.send_reminder(&snapshot).await {
                log_event_action(event_id, "reminder", None, None);
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Periodic work: webhook sweep, reminders and retention cleanup
    pub async fn run_maintenance(&self) -> Result<serde_json::Value> {
        let now = Utc::now();
        let webhooks_sent = self.webhooks.process_due().await?;
        let reminders_sent = self.send_reminders(now).await?;
        let cleanup = self.db.cleanup_expired_data(&self.settings.retention, now).await?;

        info!(webhooks_sent = webhooks_sent, reminders_sent = reminders_sent, "Maintenance tick finished");
        Ok(serde_json::json!({
            "webhooks_sent": webhooks_sent,
            "reminders_sent": reminders_sent,
            "cleanup": cleanup
        }))
    }
}
