//! Notification service implementation
//!
//! Message texts for dashboards, announcements and direct messages, and the
//! fire-and-forget direct message sends that follow a committed change.
//! Direct messages are not queued: a failed DM is logged and dropped.

use tracing::{info, warn};
use crate::config::settings::Settings;
use crate::database::service::EventSnapshot;
use crate::models::{Event, Participant, ParticipantStatus, Platform};
use crate::resolution::QuorumAlert;
use crate::services::surface::Surfaces;
use crate::utils::helpers::format_slot_range;

/// Live voting dashboard text
pub fn render_dashboard(snapshot: &EventSnapshot, link: &str) -> String {
    let quorum = snapshot.quorum();
    let mut lines = vec![
        format!("📅 {}", snapshot.event.title),
        format!(
            "{} voted · need {}{}",
            snapshot.participants.len(),
            snapshot.event.min_players,
            snapshot
                .event
                .max_players
                .map(|max| format!(" · max {}", max))
                .unwrap_or_default()
        ),
        String::new(),
    ];

    for slot in &snapshot.slots {
        let (yes, maybe, perfect) = quorum
            .slot(slot.id)
            .map(|q| (q.yes, q.maybe, q.perfect))
            .unwrap_or((0, 0, false));
        lines.push(format!(
            "{}{} — ✅ {} · 🤔 {}",
            if perfect { "⭐ " } else { "" },
            format_slot_range(slot.start_time, slot.end_time),
            yes,
            maybe
        ));
    }

    lines.push(String::new());
    lines.push(format!("Vote here: {}", link));
    lines.join("\n")
}

/// Finalized announcement text; also used after location edits
pub fn render_announcement(snapshot: &EventSnapshot, link: &str) -> String {
    let mut lines = vec![format!("✅ {} is on!", snapshot.event.title)];

    if let Some(slot) = snapshot.finalized_slot() {
        lines.push(format!("🕒 {}", format_slot_range(slot.start_time, slot.end_time)));
    }
    if let Some(location) = &snapshot.event.location {
        lines.push(format!("📍 {}", location));
    }
    if let Some(host) = snapshot.event.finalized_host_id.and_then(|id| snapshot.participant(id)) {
        lines.push(format!("🏠 Hosted by {}", host.name));
    }

    let attendees = snapshot.names_with_status(ParticipantStatus::Accepted);
    lines.push(String::new());
    lines.push(format!("Going ({}): {}", attendees.len(), join_or_dash(&attendees)));

    let waitlist = snapshot.names_with_status(ParticipantStatus::Waitlist);
    if !waitlist.is_empty() {
        lines.push(format!("Waitlist: {}", waitlist.join(", ")));
    }

    lines.push(String::new());
    lines.push(link.to_string());
    lines.join("\n")
}

/// Replaces the pinned message of a cancelled event
pub fn render_cancelled_pin(event: &Event) -> String {
    format!("❌ {} has been cancelled.", event.title)
}

/// Plain notice posted after a cancellation
pub fn render_cancelled_notice(event: &Event) -> String {
    format!("{} was cancelled by the organizer.", event.title)
}

pub fn render_reminder(snapshot: &EventSnapshot, link: &str) -> String {
    let missing = !snapshot.slots.is_empty()
        && snapshot.participants.len() < usize::try_from(snapshot.event.min_players).unwrap_or(0);
    let mut text = format!("⏰ Reminder: please vote for {}\n{}", snapshot.event.title, link);
    if missing {
        text.push_str(&format!(
            "\nStill need at least {} players.",
            snapshot.event.min_players
        ));
    }
    text
}

/// Posted into a chat where the bot could not pin its message
pub fn render_pin_permission_warning() -> String {
    "I couldn't pin the event message here. Please give me the permission to pin messages.".to_string()
}

pub fn render_quorum_alert(event: &Event, alert: QuorumAlert, link: &str) -> String {
    match alert {
        QuorumAlert::Viable => format!(
            "🎉 {} has enough players for at least one time slot. You can finalize it now: {}",
            event.title, link
        ),
        QuorumAlert::Perfect => format!(
            "⭐ Everyone said yes to a time slot for {} and someone can host! Finalize: {}",
            event.title, link
        ),
    }
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "—".to_string()
    } else {
        names.join(", ")
    }
}

/// Direct message sender
#[derive(Clone)]
pub struct NotificationService {
    surfaces: Surfaces,
    settings: Settings,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(surfaces: Surfaces, settings: Settings) -> Self {
        Self { surfaces, settings }
    }

    /// Send a direct message; failures are logged, never returned
    pub async fn send_direct(&self, platform: Platform, user_id: &str, text: &str) -> bool {
        match self.surfaces.send_direct(platform, user_id, text).await {
            Ok(_) => {
                info!(platform = %platform, user_id = user_id, "Direct message sent");
                true
            }
            Err(e) => {
                warn!(platform = %platform, user_id = user_id, error = %e, "Failed to send direct message");
                false
            }
        }
    }

    async fn send_to_participant(&self, participant: &Participant, text: &str) {
        if let Some((platform, chat_id)) = participant.contact() {
            self.send_direct(platform, chat_id, text).await;
        }
    }

    /// Tell every seated and waitlisted participant where they stand
    pub async fn notify_allocation(&self, snapshot: &EventSnapshot) {
        let link = self.settings.event_link(&snapshot.event.slug);
        let when = snapshot
            .finalized_slot()
            .map(|slot| format_slot_range(slot.start_time, slot.end_time))
            .unwrap_or_default();

        for participant in &snapshot.participants {
            let text = match participant.status {
                ParticipantStatus::Accepted => format!(
                    "✅ You're in for {} on {}.\n{}",
                    snapshot.event.title, when, link
                ),
                ParticipantStatus::Waitlist => format!(
                    "⏳ {} is full for {}. You're on the waitlist and will be told if a seat frees up.\n{}",
                    snapshot.event.title, when, link
                ),
                ParticipantStatus::Pending => continue,
            };
            self.send_to_participant(participant, &text).await;
        }
    }

    /// Tell promoted participants they got a seat
    pub async fn notify_promoted(&self, snapshot: &EventSnapshot, promoted: &[i64]) {
        let link = self.settings.event_link(&snapshot.event.slug);
        for participant in promoted.iter().filter_map(|id| snapshot.participant(*id)) {
            let text = format!(
                "🎉 A seat opened up: you're now in for {}!\n{}",
                snapshot.event.title, link
            );
            self.send_to_participant(participant, &text).await;
        }
    }

    /// One-time alert to the manager that the event reached quorum
    pub async fn notify_quorum(&self, event: &Event, alert: QuorumAlert) {
        let Some((platform, chat_id)) = event.manager_contact() else {
            info!(event_id = event.id, "Quorum reached but no verified manager chat to alert");
            return;
        };
        let text = render_quorum_alert(event, alert, &self.settings.event_link(&event.slug));
        self.send_direct(platform, chat_id, &text).await;
    }

    /// Tell participants that a finalized event they were part of is off
    pub async fn notify_cancelled(&self, snapshot: &EventSnapshot) {
        let text = render_cancelled_notice(&snapshot.event);
        for participant in snapshot
            .participants
            .iter()
            .filter(|p| p.status != ParticipantStatus::Pending)
        {
            self.send_to_participant(participant, &text).await;
        }
    }

    /// Magic login link DM
    pub async fn send_login_link(&self, platform: Platform, chat_id: &str, raw_token: &str, ttl_minutes: i64) -> bool {
        let text = format!(
            "🔑 Your login link (valid for {} minutes, single use):\n{}",
            ttl_minutes,
            self.settings.login_link(raw_token)
        );
        self.send_direct(platform, chat_id, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventStatus, TimeSlot, Vote, VotePreference};
    use chrono::{TimeZone, Utc};

    fn event() -> Event {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap();
        Event {
            id: 1,
            slug: "abc".to_string(),
            title: "Board games".to_string(),
            status: EventStatus::Draft,
            min_players: 2,
            max_players: Some(4),
            finalized_slot_id: None,
            finalized_host_id: None,
            location: None,
            telegram_chat_id: None,
            telegram_dashboard_message_id: None,
            telegram_announcement_message_id: None,
            discord_channel_id: None,
            discord_dashboard_message_id: None,
            discord_announcement_message_id: None,
            manager_telegram_handle: None,
            manager_telegram_chat_id: None,
            manager_discord_handle: None,
            manager_discord_id: None,
            admin_token_hash: String::new(),
            recovery_token_hash: None,
            recovery_token_expires_at: None,
            quorum_viable_notified: false,
            quorum_perfect_notified: false,
            reminder_enabled: false,
            reminder_time: None,
            reminder_days: vec![],
            last_reminder_sent_at: None,
            webhook_url: None,
            webhook_correlation_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn participant(id: i64, name: &str, status: ParticipantStatus) -> Participant {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap();
        Participant {
            id,
            event_id: 1,
            name: name.to_string(),
            telegram_handle: None,
            telegram_chat_id: None,
            discord_handle: None,
            discord_id: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot() -> EventSnapshot {
        let start = Utc.with_ymd_and_hms(2026, 4, 10, 19, 0, 0).unwrap();
        let slot = |id: i64, offset: i64| TimeSlot {
            id,
            event_id: 1,
            start_time: start + chrono::Duration::days(offset),
            end_time: start + chrono::Duration::days(offset) + chrono::Duration::hours(2),
        };
        let vote = |participant_id: i64, slot_id: i64, preference: VotePreference, can_host: bool| Vote {
            id: participant_id * 10 + slot_id,
            participant_id,
            slot_id,
            preference,
            can_host,
            created_at: start,
        };

        EventSnapshot {
            event: event(),
            slots: vec![slot(1, 0), slot(2, 1)],
            participants: vec![
                participant(1, "Ann", ParticipantStatus::Pending),
                participant(2, "Bob", ParticipantStatus::Pending),
            ],
            votes: vec![
                vote(1, 1, VotePreference::Yes, true),
                vote(2, 1, VotePreference::Yes, false),
                vote(1, 2, VotePreference::Maybe, false),
                vote(2, 2, VotePreference::No, false),
            ],
        }
    }

    #[test]
    fn test_dashboard_lists_counts_and_marks_perfect_slot() {
        let text = render_dashboard(&snapshot(), "https://x/e/abc");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "📅 Board games");
        assert!(lines[1].contains("2 voted"));
        assert!(lines[3].starts_with("⭐ "));
        assert!(lines[3].ends_with("✅ 2 · 🤔 0"));
        assert!(!lines[4].starts_with("⭐"));
        assert!(lines[4].ends_with("✅ 0 · 🤔 1"));
        assert!(text.ends_with("Vote here: https://x/e/abc"));
    }

    #[test]
    fn test_announcement_lists_attendees_and_waitlist() {
        let mut snap = snapshot();
        snap.event.status = EventStatus::Finalized;
        snap.event.finalized_slot_id = Some(1);
        snap.event.finalized_host_id = Some(1);
        snap.event.location = Some("Ann's place".to_string());
        snap.participants[0].status = ParticipantStatus::Accepted;
        snap.participants[1].status = ParticipantStatus::Waitlist;

        let text = render_announcement(&snap, "https://x/e/abc");
        assert!(text.contains("📍 Ann's place"));
        assert!(text.contains("🏠 Hosted by Ann"));
        assert!(text.contains("Going (1): Ann"));
        assert!(text.contains("Waitlist: Bob"));
    }

    #[test]
    fn test_waitlist_follows_promotion_order() {
        let mut snap = snapshot();
        snap.event.status = EventStatus::Finalized;
        snap.event.finalized_slot_id = Some(1);
        snap.participants[0].status = ParticipantStatus::Accepted;
        snap.participants[1].status = ParticipantStatus::Accepted;
        snap.participants.push(participant(3, "Cat", ParticipantStatus::Waitlist));
        snap.participants.push(participant(4, "Dan", ParticipantStatus::Waitlist));
        let start = snap.slots[0].start_time;
        snap.votes.push(Vote {
            id: 31,
            participant_id: 3,
            slot_id: 1,
            preference: VotePreference::Maybe,
            can_host: false,
            created_at: start - chrono::Duration::hours(1),
        });
        snap.votes.push(Vote {
            id: 41,
            participant_id: 4,
            slot_id: 1,
            preference: VotePreference::Yes,
            can_host: false,
            created_at: start + chrono::Duration::hours(1),
        });

        assert_eq!(snap.names_with_status(ParticipantStatus::Waitlist), vec!["Dan", "Cat"]);
        assert_eq!(snap.names_with_status(ParticipantStatus::Accepted), vec!["Ann", "Bob"]);

        let payload = crate::services::webhook::build_payload(
            crate::models::WebhookEventType::Finalized,
            &snap,
            "https://x/e/abc".to_string(),
            start,
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["waitlist"], serde_json::json!(["Dan", "Cat"]));
        assert_eq!(json.get("location"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_quorum_alert_texts_differ() {
        let e = event();
        let viable = render_quorum_alert(&e, QuorumAlert::Viable, "l");
        let perfect = render_quorum_alert(&e, QuorumAlert::Perfect, "l");
        assert_ne!(viable, perfect);
        assert!(perfect.contains("Everyone"));
    }
}
