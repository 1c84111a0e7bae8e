//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::FromRow;
use super::identity::Platform;

/// Lifecycle of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Draft,
    Finalized,
    Cancelled,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Draft => write!(f, "DRAFT"),
            EventStatus::Finalized => write!(f, "FINALIZED"),
            EventStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: EventStatus,
    pub min_players: i32,
    pub max_players: Option<i32>,
    pub finalized_slot_id: Option<i64>,
    pub finalized_host_id: Option<i64>,
    pub location: Option<String>,

    pub telegram_chat_id: Option<String>,
    pub telegram_dashboard_message_id: Option<String>,
    pub telegram_announcement_message_id: Option<String>,
    pub discord_channel_id: Option<String>,
    pub discord_dashboard_message_id: Option<String>,
    pub discord_announcement_message_id: Option<String>,

    pub manager_telegram_handle: Option<String>,
    pub manager_telegram_chat_id: Option<String>,
    pub manager_discord_handle: Option<String>,
    pub manager_discord_id: Option<String>,

    #[serde(skip_serializing)]
    pub admin_token_hash: String,
    #[serde(skip_serializing)]
    pub recovery_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub recovery_token_expires_at: Option<DateTime<Utc>>,

    pub quorum_viable_notified: bool,
    pub quorum_perfect_notified: bool,

    pub reminder_enabled: bool,
    pub reminder_time: Option<NaiveTime>,
    pub reminder_days: Vec<i32>,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,

    pub webhook_url: Option<String>,
    pub webhook_correlation_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored message state of one connected chat surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceState {
    pub platform: Platform,
    pub chat_id: String,
    pub dashboard_message_id: Option<String>,
    pub announcement_message_id: Option<String>,
}

impl Event {
    /// Connection state for the given platform, if a chat is connected
    pub fn surface_state(&self, platform: Platform) -> Option<SurfaceState> {
        let (chat, dashboard, announcement) = match platform {
            Platform::Telegram => (
                &self.telegram_chat_id,
                &self.telegram_dashboard_message_id,
                &self.telegram_announcement_message_id,
            ),
            Platform::Discord => (
                &self.discord_channel_id,
                &self.discord_dashboard_message_id,
                &self.discord_announcement_message_id,
            ),
        };

        chat.as_ref().map(|chat_id| SurfaceState {
            platform,
            chat_id: chat_id.clone(),
            dashboard_message_id: dashboard.clone(),
            announcement_message_id: announcement.clone(),
        })
    }

    /// Declared manager handle on the given platform
    pub fn manager_handle(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Telegram => self.manager_telegram_handle.as_deref(),
            Platform::Discord => self.manager_discord_handle.as_deref(),
        }
    }

    /// Verified manager chat/user id on the given platform
    pub fn manager_chat_id(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Telegram => self.manager_telegram_chat_id.as_deref(),
            Platform::Discord => self.manager_discord_id.as_deref(),
        }
    }

    /// Any verified manager chat to direct-message, Telegram first
    pub fn manager_contact(&self) -> Option<(Platform, &str)> {
        Platform::ALL
            .iter()
            .find_map(|&platform| self.manager_chat_id(platform).map(|id| (platform, id)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeSlot {
    pub id: i64,
    pub event_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub min_players: i32,
    pub max_players: Option<i32>,
    pub slots: Vec<SlotRequest>,
    pub manager_telegram_handle: Option<String>,
    pub manager_discord_handle: Option<String>,
    pub webhook_url: Option<String>,
    /// Subscriber supplied correlation id echoed in every webhook payload
    pub from_url_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub slot_id: i64,
    pub host_id: Option<i64>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSchedule {
    pub enabled: bool,
    pub time: Option<NaiveTime>,
    /// Weekdays, 0 = Monday .. 6 = Sunday
    pub days: Vec<i32>,
}
