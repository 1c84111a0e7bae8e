//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the GatherBuddy application.

use tracing::{info, warn, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "gatherbuddy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log event management actions
pub fn log_event_action(event_id: i64, action: &str, actor: Option<&str>, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        actor = actor,
        details = details,
        "Event action performed"
    );
}

/// Log identity checks for audit, including the identity that was compared
pub fn log_identity_audit(slug: &str, flow: &str, expected: Option<&str>, presented: &str, success: bool) {
    if success {
        info!(
            slug = slug,
            flow = flow,
            presented = presented,
            "Identity verified"
        );
    } else {
        warn!(
            slug = slug,
            flow = flow,
            expected = expected,
            presented = presented,
            "Identity verification failed"
        );
    }
}

/// Log webhook delivery attempts
pub fn log_delivery_attempt(webhook_id: i64, attempt: i32, success: bool, error: Option<&str>) {
    if success {
        info!(
            webhook_id = webhook_id,
            attempt = attempt,
            "Webhook delivered"
        );
    } else {
        warn!(
            webhook_id = webhook_id,
            attempt = attempt,
            error = error,
            "Webhook delivery failed"
        );
    }
}

/// Log chat surface operations that degraded to a fallback
pub fn log_surface_fallback(platform: &str, chat_id: &str, operation: &str, fallback: &str) {
    warn!(
        platform = platform,
        chat_id = chat_id,
        operation = operation,
        fallback = fallback,
        "Chat surface operation degraded"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, rows: u64) {
    debug!(
        operation = operation,
        table = table,
        rows = rows,
        "Database operation completed"
    );
}
