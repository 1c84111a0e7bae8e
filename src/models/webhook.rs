//! Outbound webhook model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "webhook_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookStatus {
    Pending,
    Sent,
    Failed,
}

/// A queued outbound notification
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookEvent {
    pub id: i64,
    pub event_id: i64,
    pub target_url: String,
    pub payload: serde_json::Value,
    pub status: WebhookStatus,
    pub attempts: i32,
    pub next_attempt: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookEventType {
    Created,
    Finalized,
    Cancelled,
    LocationUpdated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedSlotPayload {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// JSON body posted to subscribers, versioned by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(rename = "type")]
    pub kind: WebhookEventType,
    pub event_id: i64,
    pub slug: String,
    pub link: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_url_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_slot: Option<FinalizedSlotPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitlist: Option<Vec<String>>,
    /// Present (possibly `null`) on FINALIZED and LOCATION_UPDATED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_finalized_payload_shape() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
        let payload = WebhookPayload {
            kind: WebhookEventType::Finalized,
            event_id: 7,
            slug: "abc".to_string(),
            link: "https://x/e/abc".to_string(),
            title: "Board games".to_string(),
            timestamp: start,
            from_url_id: Some("sub-42".to_string()),
            finalized_slot: Some(FinalizedSlotPayload {
                id: 3,
                start_time: start,
                end_time: start + chrono::Duration::hours(2),
            }),
            attendees: Some(vec!["Ann".to_string()]),
            waitlist: Some(vec![]),
            location: Some(None),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "FINALIZED");
        assert_eq!(json["eventId"], 7);
        assert_eq!(json["fromUrlId"], "sub-42");
        assert_eq!(json["finalizedSlot"]["id"], 3);
        assert!(json["finalizedSlot"]["startTime"].is_string());
        assert_eq!(json["attendees"][0], "Ann");
        assert_eq!(json.get("location"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_created_payload_omits_finalize_fields() {
        let payload = WebhookPayload {
            kind: WebhookEventType::Created,
            event_id: 7,
            slug: "abc".to_string(),
            link: "https://x/e/abc".to_string(),
            title: "Board games".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap(),
            from_url_id: None,
            finalized_slot: None,
            attendees: None,
            waitlist: None,
            location: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("location").is_none());
        assert!(json.get("attendees").is_none());
    }

    #[test]
    fn test_location_updated_type_name() {
        let json = serde_json::to_value(WebhookEventType::LocationUpdated).unwrap();
        assert_eq!(json, "LOCATION_UPDATED");
    }
}
