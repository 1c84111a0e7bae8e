//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{GatherBuddyError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_telegram_config(&settings.telegram)?;
    validate_database_config(&settings.database)?;
    validate_server_config(&settings.server)?;
    validate_auth_config(&settings.auth)?;
    validate_webhook_config(&settings.webhooks)?;
    validate_retention_config(&settings.retention)?;
    validate_logging_config(&settings.logging)?;

    if let Some(ref discord_config) = settings.discord {
        validate_discord_config(discord_config)?;
    }

    Ok(())
}

/// Validate Telegram configuration
fn validate_telegram_config(config: &super::TelegramConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(GatherBuddyError::Config(
            "Telegram bot token is required".to_string()
        ));
    }

    if config.bot_username.is_empty() || config.bot_username.starts_with('@') {
        return Err(GatherBuddyError::Config(
            "Telegram bot username is required, without the leading @".to_string()
        ));
    }

    if config.sends_per_second == 0 {
        return Err(GatherBuddyError::Config(
            "Telegram send rate must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate Discord configuration
fn validate_discord_config(config: &super::DiscordConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(GatherBuddyError::Config(
            "Discord bot token is required".to_string()
        ));
    }

    match hex::decode(&config.public_key) {
        Ok(bytes) if bytes.len() == 32 => {}
        _ => {
            return Err(GatherBuddyError::Config(
                "Discord public key must be 32 hex encoded bytes".to_string()
            ));
        }
    }

    if config.api_url.is_empty() {
        return Err(GatherBuddyError::Config(
            "Discord API URL is required".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(GatherBuddyError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(GatherBuddyError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(GatherBuddyError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(GatherBuddyError::Config(
            format!("Invalid bind address: {}", config.bind_addr)
        ));
    }

    url::Url::parse(&config.base_url)?;

    Ok(())
}

/// Validate credential configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.session_secret.len() < 32 {
        return Err(GatherBuddyError::Config(
            "Session secret must be at least 32 characters".to_string()
        ));
    }

    if config.cron_secret.is_empty() {
        return Err(GatherBuddyError::Config(
            "Cron secret is required".to_string()
        ));
    }

    if config.login_token_ttl_minutes <= 0 || config.recovery_token_ttl_minutes <= 0 {
        return Err(GatherBuddyError::Config(
            "Token lifetimes must be positive".to_string()
        ));
    }

    Ok(())
}

/// Validate webhook delivery configuration
fn validate_webhook_config(config: &super::WebhookConfig) -> Result<()> {
    if config.max_attempts <= 0 {
        return Err(GatherBuddyError::Config(
            "Webhook max attempts must be greater than 0".to_string()
        ));
    }

    if config.base_backoff_seconds <= 0 {
        return Err(GatherBuddyError::Config(
            "Webhook backoff must be greater than 0".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(GatherBuddyError::Config(
            "Webhook timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate retention windows
fn validate_retention_config(config: &super::RetentionConfig) -> Result<()> {
    if config.draft_days <= 0 || config.finalized_days <= 0 || config.cancelled_days <= 0 {
        return Err(GatherBuddyError::Config(
            "Retention windows must be positive".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(GatherBuddyError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(GatherBuddyError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.telegram.token = "12345:test_token".to_string();
        settings.auth.session_secret = "0123456789abcdef0123456789abcdef".to_string();
        settings.auth.cron_secret = "cron".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let mut settings = valid_settings();
        settings.telegram.token.clear();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_short_session_secret_rejected() {
        let mut settings = valid_settings();
        settings.auth.session_secret = "short".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_discord_public_key_must_be_32_bytes() {
        let mut settings = valid_settings();
        settings.discord = Some(super::super::DiscordConfig {
            token: "discord".to_string(),
            public_key: "abcd".to_string(),
            api_url: "https://discord.com/api/v10".to_string(),
            timeout_seconds: 10,
        });
        assert!(validate_settings(&settings).is_err());
    }
}
