//! Webhook delivery
//!
//! Rows are queued in the transaction that changed the event and delivered
//! after commit. Delivery is idempotent per row: anything not PENDING is left
//! alone. Failures back off exponentially until `max_attempts`, after which
//! the row is parked as FAILED.

use std::time::Duration;
use chrono::{DateTime, Utc};
use reqwest::Client;
use sqlx::PgConnection;
use tracing::{debug, info, warn};
use crate::config::WebhookConfig;
use crate::database::service::{DatabaseService, EventSnapshot};
use crate::models::{
    FinalizedSlotPayload, ParticipantStatus, WebhookEvent, WebhookEventType, WebhookPayload, WebhookStatus,
};
use crate::utils::errors::Result;
use crate::utils::logging::log_delivery_attempt;

/// Longest wait between two attempts
const MAX_BACKOFF_SECONDS: i64 = 3600;

/// Rows handled per sweep
const SWEEP_BATCH: i64 = 100;

/// What happened to one delivery call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Retrying,
    Failed,
    /// The row was missing or no longer pending
    Skipped,
}

/// Wait after the given number of failed attempts: `base · 2^(attempts-1)`
pub fn backoff_after(attempts: i32, base_seconds: i64) -> chrono::Duration {
    let exponent = u32::try_from(attempts.saturating_sub(1).max(0)).unwrap_or(0).min(20);
    let seconds = base_seconds.saturating_mul(1_i64 << exponent).min(MAX_BACKOFF_SECONDS);
    chrono::Duration::seconds(seconds)
}

/// Status and next attempt time after a failed attempt
pub fn after_failure(attempts_before: i32, max_attempts: i32, base_seconds: i64, now: DateTime<Utc>) -> (i32, WebhookStatus, DateTime<Utc>) {
    let attempts = attempts_before + 1;
    if attempts >= max_attempts {
        (attempts, WebhookStatus::Failed, now)
    } else {
        (attempts, WebhookStatus::Pending, now + backoff_after(attempts, base_seconds))
    }
}

/// Build the JSON body for an event transition
pub fn build_payload(kind: WebhookEventType, snapshot: &EventSnapshot, link: String, now: DateTime<Utc>) -> WebhookPayload {
    let event = &snapshot.event;
    let mut payload = WebhookPayload {
        kind,
        event_id: event.id,
        slug: event.slug.clone(),
        link,
        title: event.title.clone(),
        timestamp: now,
        from_url_id: event.webhook_correlation_id.clone(),
        finalized_slot: None,
        attendees: None,
        waitlist: None,
        location: None,
    };

    match kind {
        WebhookEventType::Finalized => {
            payload.finalized_slot = snapshot.finalized_slot().map(|slot| FinalizedSlotPayload {
                id: slot.id,
                start_time: slot.start_time,
                end_time: slot.end_time,
            });
            payload.attendees = Some(snapshot.names_with_status(ParticipantStatus::Accepted));
            payload.waitlist = Some(snapshot.names_with_status(ParticipantStatus::Waitlist));
            payload.location = Some(event.location.clone());
        }
        WebhookEventType::LocationUpdated => {
            payload.location = Some(event.location.clone());
        }
        WebhookEventType::Created | WebhookEventType::Cancelled => {}
    }

    payload
}

#[derive(Clone)]
pub struct WebhookService {
    db: DatabaseService,
    client: Client,
    config: WebhookConfig,
}

impl WebhookService {
    pub fn new(db: DatabaseService, config: WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { db, client, config })
    }

    /// Queue a delivery for the event if it has a subscriber; returns the row id
    pub async fn enqueue(&self, conn: &mut PgConnection, payload: &WebhookPayload, target_url: Option<&str>) -> Result<Option<i64>> {
        let Some(url) = target_url.filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };

        let row = self
            .db
            .webhooks
            .enqueue(conn, payload.event_id, url, serde_json::to_value(payload)?)
            .await?;
        debug!(webhook_id = row.id, event_id = payload.event_id, kind = ?payload.kind, "Webhook queued");
        Ok(Some(row.id))
    }

    /// Deliver queued rows in the background once their transaction committed
    pub fn spawn_delivery(&self, ids: Vec<i64>) {
        if ids.is_empty() {
            return;
        }
        let service = self.clone();
        tokio::spawn(async move {
            for id in ids {
                if let Err(e) = service.deliver(id).await {
                    warn!(webhook_id = id, error = %e, "Webhook delivery could not be recorded");
                }
            }
        });
    }

    /// Attempt one delivery of a queued row
    pub async fn deliver(&self, id: i64) -> Result<DeliveryOutcome> {
        let lease = chrono::Duration::seconds(i64::try_from(self.config.timeout_seconds).unwrap_or(60) * 2);
        let Some(row) = self.db.webhooks.claim(id, Utc::now(), lease).await? else {
            debug!(webhook_id = id, "Webhook not pending or not due, skipping");
            return Ok(DeliveryOutcome::Skipped);
        };

        match self.post(&row).await {
            Ok(()) => {
                if self.db.webhooks.mark_sent(id).await? {
                    log_delivery_attempt(id, row.attempts + 1, true, None);
                    Ok(DeliveryOutcome::Sent)
                } else {
                    Ok(DeliveryOutcome::Skipped)
                }
            }
            Err(error) => {
                let (attempts, status, next_attempt) = after_failure(
                    row.attempts,
                    self.config.max_attempts,
                    self.config.base_backoff_seconds,
                    Utc::now(),
                );
                log_delivery_attempt(id, attempts, false, Some(&error));
                self.db
                    .webhooks
                    .record_failure(id, attempts, status, next_attempt, &error)
                    .await?;

                if status == WebhookStatus::Failed {
                    warn!(webhook_id = id, attempts = attempts, "Webhook parked as failed");
                    Ok(DeliveryOutcome::Failed)
                } else {
                    Ok(DeliveryOutcome::Retrying)
                }
            }
        }
    }

    async fn post(&self, row: &WebhookEvent) -> std::result::Result<(), String> {
        let response = self
            .client
            .post(&row.target_url)
            .json(&row.payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("subscriber responded with HTTP {}", status.as_u16()))
        }
    }

    /// Re-deliver every due row; returns how many were delivered
    pub async fn process_due(&self) -> Result<usize> {
        let due = self.db.webhooks.due(Utc::now(), SWEEP_BATCH).await?;
        let mut sent = 0;
        for id in &due {
            if self.deliver(*id).await? == DeliveryOutcome::Sent {
                sent += 1;
            }
        }

        if !due.is_empty() {
            info!(due = due.len(), sent = sent, "Webhook sweep finished");
        }
        Ok(sent)
    }

    /// Background sweep until the shutdown signal flips
    pub async fn run_sweeper(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.sweep_interval_seconds.max(1)));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_due().await {
                        warn!(error = %e, "Webhook sweep failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Webhook sweeper stopping");
                    break;
                }
            }
        }
    }
}
