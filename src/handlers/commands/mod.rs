//! Command handlers module
//!
//! Platform-neutral chat commands. The Telegram poller and the Discord
//! interactions endpoint both turn inbound traffic into a [`ChatCommand`] and
//! a [`CommandContext`], and send back whatever text the handler returns.

pub mod connect;
pub mod help;
pub mod start;

use std::sync::OnceLock;
use regex::Regex;
use teloxide::utils::command::BotCommands;
use crate::models::ChatIdentity;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;
use crate::utils::helpers::is_valid_slug;

/// Telegram commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "GatherBuddy commands:")]
pub enum Command {
    #[command(description = "Open the bot from a deep link")]
    Start(String),
    #[command(description = "Connect this chat to an event: /connect <slug>")]
    Connect(String),
    #[command(description = "Show help information")]
    Help,
}

/// Payload of `/start`, as put there by a deep link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPayload {
    /// Plain `/start`
    Empty,
    /// `setup_recovery_<slug>_<token>`
    SetupRecovery { slug: String, token: String },
    /// `rec_<short>`
    ShortRecovery(String),
    /// `login`
    Login,
    /// `recover_handle`
    RecoverHandle,
    /// A bare event slug
    Slug(String),
    Unknown,
}

impl StartPayload {
    pub fn parse(payload: &str) -> Self {
        let payload = payload.trim();
        if payload.is_empty() {
            return StartPayload::Empty;
        }
        if payload == "login" {
            return StartPayload::Login;
        }
        if payload == "recover_handle" {
            return StartPayload::RecoverHandle;
        }
        if let Some(short) = payload.strip_prefix("rec_") {
            return StartPayload::ShortRecovery(short.to_string());
        }
        if let Some(rest) = payload.strip_prefix("setup_recovery_") {
            // Slugs never contain `_`, tokens are UUIDs
            if let Some((slug, token)) = rest.split_once('_') {
                if is_valid_slug(slug) && !token.is_empty() {
                    return StartPayload::SetupRecovery { slug: slug.to_string(), token: token.to_string() };
                }
            }
            return StartPayload::Unknown;
        }
        if is_valid_slug(payload) {
            return StartPayload::Slug(payload.to_string());
        }
        StartPayload::Unknown
    }
}

/// Everything the router understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Start(StartPayload),
    Connect(String),
    /// A message carrying a voting page URL
    EventLink(String),
    /// Discord `/login`
    Login,
    /// Discord `/recover <slug>`
    Recover(String),
    Help,
}

impl ChatCommand {
    /// Classify Telegram message text
    pub fn from_telegram_text(text: &str, bot_username: &str) -> Option<Self> {
        if let Ok(command) = Command::parse(text, bot_username) {
            return Some(match command {
                Command::Start(payload) => ChatCommand::Start(StartPayload::parse(&payload)),
                Command::Connect(slug) => ChatCommand::Connect(slug.trim().to_string()),
                Command::Help => ChatCommand::Help,
            });
        }
        extract_event_slug(text).map(ChatCommand::EventLink)
    }
}

fn event_link_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"/e/([A-Za-z0-9-]{1,64})").ok())
        .as_ref()
}

/// Pull the slug out of the first voting page URL in a message
pub fn extract_event_slug(text: &str) -> Option<String> {
    event_link_pattern()?
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|slug| slug.as_str().to_string())
        .filter(|slug| is_valid_slug(slug))
}

/// Where a command came from
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub sender: ChatIdentity,
    /// Chat the command was sent in
    pub chat_id: String,
    /// Direct conversation with the bot rather than a group
    pub is_private: bool,
}

/// Run a command and produce the reply text
pub async fn handle_command(services: &ServiceFactory, context: &CommandContext, command: ChatCommand) -> Result<String> {
    match command {
        ChatCommand::Start(payload) => start::handle_start(services, context, payload).await,
        ChatCommand::Connect(slug) => connect::handle_connect(services, context, &slug).await,
        ChatCommand::EventLink(slug) if context.is_private => start::handle_start(services, context, StartPayload::Slug(slug)).await,
        ChatCommand::EventLink(slug) => connect::handle_connect(services, context, &slug).await,
        ChatCommand::Login => start::handle_login(services, context).await,
        ChatCommand::Recover(slug) => start::handle_recover(services, context, &slug).await,
        ChatCommand::Help => Ok(help::help_text()),
    }
}
