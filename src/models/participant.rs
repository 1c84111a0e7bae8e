//! Participant and vote models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::identity::Platform;

/// Seat status, written only by the resolution paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ParticipantStatus {
    Pending,
    Accepted,
    Waitlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vote_preference", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum VotePreference {
    Yes,
    Maybe,
    No,
}

impl VotePreference {
    /// Priority rank for seating; lower is better, `None` for NO
    pub fn seat_rank(self) -> Option<u8> {
        match self {
            VotePreference::Yes => Some(0),
            VotePreference::Maybe => Some(1),
            VotePreference::No => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub telegram_handle: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub discord_handle: Option<String>,
    pub discord_id: Option<String>,
    pub status: ParticipantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    /// Verified chat id on the given platform
    pub fn chat_id(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Telegram => self.telegram_chat_id.as_deref(),
            Platform::Discord => self.discord_id.as_deref(),
        }
    }

    /// First verified chat to direct-message, Telegram first
    pub fn contact(&self) -> Option<(Platform, &str)> {
        Platform::ALL
            .iter()
            .find_map(|&platform| self.chat_id(platform).map(|id| (platform, id)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub id: i64,
    pub participant_id: i64,
    pub slot_id: i64,
    pub preference: VotePreference,
    pub can_host: bool,
    pub created_at: DateTime<Utc>,
}

/// One ballot entry as submitted by a voter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteInput {
    pub slot_id: i64,
    pub preference: VotePreference,
    #[serde(default)]
    pub can_host: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub participant_id: Option<i64>,
    pub name: String,
    pub telegram_handle: Option<String>,
    pub discord_handle: Option<String>,
    pub votes: Vec<VoteInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub participant_id: i64,
}
