//! Discord ingress
//!
//! Discord pushes slash commands to `POST /discord/interactions`. Every
//! request is signed with the application's Ed25519 key over
//! `timestamp || body`; unsigned or mis-signed requests are rejected before
//! the body is parsed.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::handlers::commands::{ChatCommand, CommandContext};
use crate::handlers::messages::handle_message;
use crate::middleware::RateLimitMiddleware;
use crate::models::{ChatIdentity, Platform};
use crate::services::ServiceFactory;

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

const INTERACTION_PING: u8 = 1;
const INTERACTION_COMMAND: u8 = 2;
const RESPONSE_PONG: u8 = 1;
const RESPONSE_MESSAGE: u8 = 4;
const FLAG_EPHEMERAL: u64 = 1 << 6;

/// Check a Discord request signature
pub fn verify_signature(public_key_hex: &str, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
    let Some(key) = hex::decode(public_key_hex.trim())
        .ok()
        .and_then(|bytes| <[u8; 32]>::try_from(bytes.as_slice()).ok())
        .and_then(|bytes| VerifyingKey::from_bytes(&bytes).ok())
    else {
        return false;
    };
    let Some(signature) = hex::decode(signature_hex.trim())
        .ok()
        .and_then(|bytes| Signature::from_slice(&bytes).ok())
    else {
        return false;
    };

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    key.verify(&message, &signature).is_ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    pub user: DiscordUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

/// The parts of an interaction payload the bot reads
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Option<InteractionData>,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    /// Present in guilds
    pub member: Option<GuildMember>,
    /// Present in direct messages
    pub user: Option<DiscordUser>,
}

impl Interaction {
    fn sender(&self) -> Option<&DiscordUser> {
        self.member.as_ref().map(|m| &m.user).or(self.user.as_ref())
    }

    fn option(&self, name: &str) -> Option<String> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
            .and_then(|v| v.as_str())
            .map(|v| v.trim().to_string())
    }

    /// Map the slash command onto the shared router
    pub fn command(&self) -> Option<ChatCommand> {
        let data = self.data.as_ref()?;
        match data.name.as_str() {
            "connect" => Some(ChatCommand::Connect(self.option("slug").unwrap_or_default())),
            "login" => Some(ChatCommand::Login),
            "recover" => Some(ChatCommand::Recover(self.option("slug").unwrap_or_default())),
            "help" => Some(ChatCommand::Help),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<CommandContext> {
        let sender = self.sender()?;
        Some(CommandContext {
            sender: ChatIdentity {
                platform: Platform::Discord,
                user_id: sender.id.clone(),
                handle: sender.username.clone(),
            },
            chat_id: self.channel_id.clone()?,
            is_private: self.guild_id.is_none(),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseData {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self { kind: RESPONSE_PONG, data: None }
    }

    /// A reply only the invoking user sees
    pub fn ephemeral(content: String) -> Self {
        Self {
            kind: RESPONSE_MESSAGE,
            data: Some(ResponseData { content, flags: Some(FLAG_EPHEMERAL) }),
        }
    }

    pub fn public(content: String) -> Self {
        Self {
            kind: RESPONSE_MESSAGE,
            data: Some(ResponseData { content, flags: None }),
        }
    }
}

/// Answer a verified interaction
pub async fn handle_interaction(
    services: &ServiceFactory,
    rate_limiter: &RateLimitMiddleware,
    interaction: &Interaction,
) -> InteractionResponse {
    match interaction.kind {
        INTERACTION_PING => InteractionResponse::pong(),
        INTERACTION_COMMAND => {
            let Some(context) = interaction.context() else {
                return InteractionResponse::ephemeral("I couldn't tell who sent this.".to_string());
            };
            let command = interaction.command();
            let public = matches!(command, Some(ChatCommand::Connect(_)));

            let reply = handle_message(services, rate_limiter, &context, command)
                .await
                .unwrap_or_else(|| "Unknown command.".to_string());
            if public {
                InteractionResponse::public(reply)
            } else {
                InteractionResponse::ephemeral(reply)
            }
        }
        other => {
            debug!(kind = other, "Ignoring interaction type");
            InteractionResponse::ephemeral("Unsupported interaction.".to_string())
        }
    }
}
