//! Error handling for GatherBuddy
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for GatherBuddy application
#[derive(Error, Debug)]
pub enum GatherBuddyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Discord API error: {0}")]
    Discord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Event not found: {slug}")]
    EventNotFound { slug: String },

    #[error("Time slot {slot_id} does not belong to event {event_id}")]
    SlotNotFound { event_id: i64, slot_id: i64 },

    #[error("Participant {participant_id} does not belong to event {event_id}")]
    ParticipantNotFound { event_id: i64, participant_id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Token is invalid or expired")]
    TokenInvalid,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for GatherBuddy operations
pub type Result<T> = std::result::Result<T, GatherBuddyError>;

impl GatherBuddyError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            GatherBuddyError::Database(_) => false,
            GatherBuddyError::Migration(_) => false,
            GatherBuddyError::Telegram(_) => true,
            GatherBuddyError::Discord(_) => true,
            GatherBuddyError::Config(_) => false,
            GatherBuddyError::PermissionDenied(_) => false,
            GatherBuddyError::EventNotFound { .. } => false,
            GatherBuddyError::SlotNotFound { .. } => false,
            GatherBuddyError::ParticipantNotFound { .. } => false,
            GatherBuddyError::InvalidStateTransition { .. } => false,
            GatherBuddyError::Http(_) => true,
            GatherBuddyError::Serialization(_) => false,
            GatherBuddyError::Io(_) => true,
            GatherBuddyError::UrlParse(_) => false,
            GatherBuddyError::Session(_) => false,
            GatherBuddyError::Authentication(_) => false,
            GatherBuddyError::TokenInvalid => false,
            GatherBuddyError::RateLimitExceeded => true,
            GatherBuddyError::InvalidInput(_) => false,
            GatherBuddyError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GatherBuddyError::Database(_) => ErrorSeverity::Critical,
            GatherBuddyError::Migration(_) => ErrorSeverity::Critical,
            GatherBuddyError::Config(_) => ErrorSeverity::Critical,
            GatherBuddyError::PermissionDenied(_) => ErrorSeverity::Warning,
            GatherBuddyError::Authentication(_) => ErrorSeverity::Warning,
            GatherBuddyError::Session(_) => ErrorSeverity::Warning,
            GatherBuddyError::TokenInvalid => ErrorSeverity::Warning,
            GatherBuddyError::RateLimitExceeded => ErrorSeverity::Warning,
            GatherBuddyError::InvalidInput(_) => ErrorSeverity::Info,
            GatherBuddyError::EventNotFound { .. } => ErrorSeverity::Info,
            GatherBuddyError::SlotNotFound { .. } => ErrorSeverity::Info,
            GatherBuddyError::ParticipantNotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Message safe to show to an end user
    ///
    /// Authorization failures are collapsed into one generic text so callers
    /// cannot probe which part of an identity check failed.
    pub fn user_message(&self) -> String {
        match self {
            GatherBuddyError::PermissionDenied(_)
            | GatherBuddyError::Authentication(_)
            | GatherBuddyError::Session(_) => "Not authorized".to_string(),
            GatherBuddyError::TokenInvalid => "Token is invalid or expired".to_string(),
            GatherBuddyError::InvalidInput(reason) => reason.clone(),
            GatherBuddyError::EventNotFound { .. } => "Event not found".to_string(),
            GatherBuddyError::SlotNotFound { .. } => "Unknown time slot".to_string(),
            GatherBuddyError::ParticipantNotFound { .. } => "Unknown participant".to_string(),
            GatherBuddyError::InvalidStateTransition { from, to } => {
                format!("Event is {} and cannot become {}", from, to)
            }
            GatherBuddyError::RateLimitExceeded => "Too many requests, slow down".to_string(),
            _ => "Internal error".to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
