//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub telegram: TelegramConfig,
    pub discord: Option<DiscordConfig>,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub webhooks: WebhookConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub token: String,
    /// Bot username without `@`, used to build `t.me` deep links
    pub bot_username: String,
    /// Overrides the Bot API base URL (used by tests)
    pub api_url: Option<String>,
    pub poll_timeout_seconds: u32,
    pub sends_per_second: u32,
}

/// Discord bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Hex encoded Ed25519 public key of the Discord application
    pub public_key: String,
    pub api_url: String,
    pub timeout_seconds: u64,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Public base URL used when generating voting and login links
    pub base_url: String,
}

/// Credential configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub login_token_ttl_minutes: i64,
    pub recovery_token_ttl_minutes: i64,
    pub cron_secret: String,
}

/// Outbound webhook delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    pub max_attempts: i32,
    pub base_backoff_seconds: i64,
    pub timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
}

/// Per-status retention windows, in days
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    pub draft_days: i64,
    pub finalized_days: i64,
    pub cancelled_days: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("GATHERBUDDY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::GatherBuddyError> {
        super::validation::validate_settings(self)
    }

    /// Public link to an event's voting page
    pub fn event_link(&self, slug: &str) -> String {
        format!(
            "{}/e/{}",
            self.server.base_url.trim_end_matches('/'),
            urlencoding::encode(slug)
        )
    }

    /// Magic login link for a raw login token
    pub fn login_link(&self, token: &str) -> String {
        format!(
            "{}/auth/login?token={}",
            self.server.base_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    /// Telegram deep link that opens the bot with a `/start` payload
    pub fn telegram_start_link(&self, payload: &str) -> String {
        format!("https://t.me/{}?start={}", self.telegram.bot_username, payload)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                token: String::new(),
                bot_username: "GatherBuddyBot".to_string(),
                api_url: None,
                poll_timeout_seconds: 30,
                sends_per_second: 25,
            },
            discord: None,
            database: DatabaseConfig {
                url: "postgresql://localhost/gatherbuddy".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            server: ServerConfig {
                bind_addr: "0.0.0.0:8080".to_string(),
                base_url: "http://localhost:8080".to_string(),
            },
            auth: AuthConfig {
                session_secret: String::new(),
                session_ttl_hours: 24 * 30,
                login_token_ttl_minutes: 15,
                recovery_token_ttl_minutes: 60,
                cron_secret: String::new(),
            },
            webhooks: WebhookConfig {
                max_attempts: 5,
                base_backoff_seconds: 30,
                timeout_seconds: 10,
                sweep_interval_seconds: 60,
            },
            retention: RetentionConfig {
                draft_days: 60,
                finalized_days: 30,
                cancelled_days: 7,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
            },
        }
    }
}
