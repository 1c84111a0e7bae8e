//! GatherBuddy
//!
//! Availability polling for recurring meetups. Participants vote on time
//! slots, a manager finalizes one, and the outcome is kept in sync across
//! Telegram and Discord group chats and an optional webhook subscriber.
//! This library provides the resolution engine, the chat dashboard
//! lifecycle, webhook delivery, identity recovery and the HTTP API.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod resolution;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{GatherBuddyError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
