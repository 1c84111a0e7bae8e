//! Bot handlers module
//!
//! Inbound chat traffic, organized by stage:
//! - `telegram` and `discord` receive updates from each platform
//! - `messages` captures identities and routes commands
//! - `commands` implements the commands themselves

pub mod commands;
pub mod discord;
pub mod messages;
pub mod telegram;

// Re-export commonly used handler items
pub use commands::{handle_command, ChatCommand, CommandContext, StartPayload};
pub use discord::{handle_interaction, verify_signature, Interaction, InteractionResponse};
pub use messages::handle_message;
pub use telegram::TelegramPoller;
