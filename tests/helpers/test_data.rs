//! Test data: settings pointing at the mocks, sample requests and senders

use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;
use sqlx::PgPool;
use GatherBuddy::config::settings::{DiscordConfig, Settings};
use GatherBuddy::database::DatabaseService;
use GatherBuddy::models::{
    ChatIdentity, CreateEventRequest, Platform, SlotRequest, VoteInput, VotePreference, VoteRequest,
};
use GatherBuddy::services::ServiceFactory;

use super::telegram_mock::TEST_BOT_TOKEN;

pub const TEST_BASE_URL: &str = "https://gather.test";
pub const TEST_CRON_SECRET: &str = "cron-secret";

/// Deterministic Discord application key for signing interactions
pub fn discord_signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

/// Settings wired to the mock servers
pub fn test_settings(telegram_api_url: &str, discord_api_url: Option<&str>) -> Settings {
    let mut settings = Settings::default();
    settings.telegram.token = TEST_BOT_TOKEN.to_string();
    settings.telegram.api_url = Some(telegram_api_url.to_string());
    settings.telegram.sends_per_second = 1000;
    settings.server.base_url = TEST_BASE_URL.to_string();
    settings.auth.session_secret = "test-session-secret-with-enough-length".to_string();
    settings.auth.cron_secret = TEST_CRON_SECRET.to_string();
    settings.webhooks.timeout_seconds = 5;
    settings.webhooks.base_backoff_seconds = 30;
    settings.discord = discord_api_url.map(|url| DiscordConfig {
        token: "discord-test-token".to_string(),
        public_key: hex::encode(discord_signing_key().verifying_key().to_bytes()),
        api_url: url.to_string(),
        timeout_seconds: 5,
    });
    settings
}

/// Full service graph over a test pool
pub fn build_services(settings: Settings, pool: PgPool) -> ServiceFactory {
    let surfaces = ServiceFactory::build_surfaces(&settings).expect("Failed to build surfaces");
    ServiceFactory::new(settings, DatabaseService::new(pool), surfaces).expect("Failed to build services")
}

/// A two-slot event request starting tomorrow
pub fn sample_event_request(min_players: i32, max_players: Option<i32>) -> CreateEventRequest {
    let start = Utc::now() + Duration::days(1);
    CreateEventRequest {
        title: "Board Game Night".to_string(),
        min_players,
        max_players,
        slots: vec![
            SlotRequest { start_time: start, end_time: start + Duration::hours(3) },
            SlotRequest { start_time: start + Duration::days(1), end_time: start + Duration::days(1) + Duration::hours(3) },
        ],
        manager_telegram_handle: None,
        manager_discord_handle: None,
        webhook_url: None,
        from_url_id: None,
    }
}

pub fn sample_vote(name: &str, slot_id: i64, preference: VotePreference) -> VoteRequest {
    VoteRequest {
        participant_id: None,
        name: name.to_string(),
        telegram_handle: None,
        discord_handle: None,
        votes: vec![VoteInput { slot_id, preference, can_host: false }],
    }
}

pub fn telegram_sender(user_id: i64, handle: Option<&str>) -> ChatIdentity {
    ChatIdentity {
        platform: Platform::Telegram,
        user_id: user_id.to_string(),
        handle: handle.map(str::to_string),
    }
}

/// Extract the raw value after `marker` in a generated link
pub fn token_after(link: &str, marker: &str) -> String {
    link.split_once(marker)
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_else(|| panic!("{} not found in {}", marker, link))
}
