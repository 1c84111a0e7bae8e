//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod participant;
pub mod webhook;
pub mod identity;

// Re-export commonly used models
pub use event::{Event, EventStatus, TimeSlot, SurfaceState, SlotRequest, CreateEventRequest, FinalizeRequest, ReminderSchedule};
pub use participant::{Participant, ParticipantStatus, Vote, VotePreference, VoteInput, VoteRequest, VoteResponse};
pub use webhook::{WebhookEvent, WebhookStatus, WebhookEventType, WebhookPayload, FinalizedSlotPayload};
pub use identity::{Platform, LoginToken, ChatIdentity};
