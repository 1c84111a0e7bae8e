//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod event;
pub mod participant;
pub mod webhook;
pub mod login_token;

// Re-export repositories
pub use event::{EventRepository, NewEvent};
pub use participant::{ParticipantRepository, ParticipantProfile};
pub use webhook::WebhookRepository;
pub use login_token::LoginTokenRepository;
