//! Chat surfaces
//!
//! A chat surface is one platform's view of a group chat: the bot can post,
//! edit, delete, pin and unpin messages in it and direct-message its users.
//! The dashboard state machine is written once against [`ChatSurface`] and
//! each platform only supplies the transport and error classification.

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use teloxide::{
    Bot,
    payloads::{PinChatMessageSetters, UnpinChatMessageSetters},
    requests::{Request, Requester},
    types::{ChatId, MessageId},
    RequestError,
};
use thiserror::Error;
use tracing::debug;

use crate::config::{DiscordConfig, TelegramConfig};
use crate::models::identity::Platform;
use crate::utils::errors::{GatherBuddyError, Result};
use crate::utils::helpers::truncate_text;

/// How a surface takes a message out of service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireMode {
    /// Leave the message in history, drop the pin
    Unpin,
    /// Remove the message entirely
    Delete,
}

/// Platform failures, classified by what the caller can do about them
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("message not found")]
    MessageNotFound,
    #[error("message not modified")]
    NotModified,
    #[error("missing permission: {0}")]
    MissingPermission(String),
    #[error("rate limited")]
    RateLimited,
    #[error("{0}")]
    Other(String),
}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

/// Operations the dashboard lifecycle needs from a chat platform
///
/// Ids are carried as strings: Telegram uses integers, Discord snowflakes.
pub trait ChatSurface: Send + Sync {
    fn platform(&self) -> Platform;

    fn retire_mode(&self) -> RetireMode;

    /// Post a message and return its id
    fn send(&self, chat_id: &str, text: &str) -> impl Future<Output = SurfaceResult<String>> + Send;

    fn edit(&self, chat_id: &str, message_id: &str, text: &str) -> impl Future<Output = SurfaceResult<()>> + Send;

    fn delete(&self, chat_id: &str, message_id: &str) -> impl Future<Output = SurfaceResult<()>> + Send;

    fn pin(&self, chat_id: &str, message_id: &str) -> impl Future<Output = SurfaceResult<()>> + Send;

    fn unpin(&self, chat_id: &str, message_id: &str) -> impl Future<Output = SurfaceResult<()>> + Send;

    /// Direct-message a user by platform user id
    fn send_direct(&self, user_id: &str, text: &str) -> impl Future<Output = SurfaceResult<String>> + Send;
}

/// Map a Telegram API failure onto [`SurfaceError`]
///
/// Bot API errors are matched on their description text, which is stable
/// across Bot API versions where the numeric codes are all just 400.
pub fn classify_telegram_error(error: &RequestError) -> SurfaceError {
    if let RequestError::RetryAfter(_) = error {
        return SurfaceError::RateLimited;
    }
    classify_telegram_description(&error.to_string())
}

pub fn classify_telegram_description(description: &str) -> SurfaceError {
    let text = description.to_lowercase();

    if text.contains("not modified") {
        SurfaceError::NotModified
    } else if (text.contains("message") && text.contains("not found")) || text.contains("message_id_invalid") {
        SurfaceError::MessageNotFound
    } else if text.contains("rights") || text.contains("permission") || text.contains("admin_required") || text.contains("administrator") {
        SurfaceError::MissingPermission(description.to_string())
    } else if text.contains("too many requests") || text.contains("retry after") {
        SurfaceError::RateLimited
    } else {
        SurfaceError::Other(description.to_string())
    }
}

fn parse_telegram_chat(chat_id: &str) -> SurfaceResult<ChatId> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| SurfaceError::Other(format!("invalid telegram chat id: {}", chat_id)))
}

fn parse_telegram_message(message_id: &str) -> SurfaceResult<MessageId> {
    message_id
        .parse::<i32>()
        .map(MessageId)
        .map_err(|_| SurfaceError::Other(format!("invalid telegram message id: {}", message_id)))
}

/// Telegram surface over the Bot API
///
/// Every outbound call waits on a shared direct rate limiter so bursts of
/// DMs after a finalize stay under the global send limit.
#[derive(Clone)]
pub struct TelegramSurface {
    bot: Bot,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl TelegramSurface {
    pub fn new(bot: Bot, config: &TelegramConfig) -> Self {
        let per_second = NonZeroU32::new(config.sends_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            bot,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }

    /// Build the bot client from configuration, honouring an API URL override
    ///
    /// The HTTP timeout must outlast the long-poll timeout of `getUpdates`.
    pub fn build_bot(config: &TelegramConfig) -> Result<Bot> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(u64::from(config.poll_timeout_seconds) + 10))
            .build()
            .map_err(|e| GatherBuddyError::Config(format!("telegram client: {}", e)))?;
        let bot = Bot::with_client(&config.token, client);
        match &config.api_url {
            Some(url) => Ok(bot.set_api_url(url::Url::parse(url)?)),
            None => Ok(bot),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

impl ChatSurface for TelegramSurface {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    fn retire_mode(&self) -> RetireMode {
        RetireMode::Unpin
    }

    async fn send(&self, chat_id: &str, text: &str) -> SurfaceResult<String> {
        let chat = parse_telegram_chat(chat_id)?;
        self.limiter.until_ready().await;
        let message = self
            .bot
            .send_message(chat, text)
            .send()
            .await
            .map_err(|e| classify_telegram_error(&e))?;
        Ok(message.id.0.to_string())
    }

    async fn edit(&self, chat_id: &str, message_id: &str, text: &str) -> SurfaceResult<()> {
        let chat = parse_telegram_chat(chat_id)?;
        let message = parse_telegram_message(message_id)?;
        self.limiter.until_ready().await;
        self.bot
            .edit_message_text(chat, message, text)
            .send()
            .await
            .map_err(|e| classify_telegram_error(&e))?;
        Ok(())
    }

    async fn delete(&self, chat_id: &str, message_id: &str) -> SurfaceResult<()> {
        let chat = parse_telegram_chat(chat_id)?;
        let message = parse_telegram_message(message_id)?;
        self.limiter.until_ready().await;
        self.bot
            .delete_message(chat, message)
            .send()
            .await
            .map_err(|e| classify_telegram_error(&e))?;
        Ok(())
    }

    async fn pin(&self, chat_id: &str, message_id: &str) -> SurfaceResult<()> {
        let chat = parse_telegram_chat(chat_id)?;
        let message = parse_telegram_message(message_id)?;
        self.limiter.until_ready().await;
        self.bot
            .pin_chat_message(chat, message)
            .disable_notification(true)
            .send()
            .await
            .map_err(|e| classify_telegram_error(&e))?;
        Ok(())
    }

    async fn unpin(&self, chat_id: &str, message_id: &str) -> SurfaceResult<()> {
        let chat = parse_telegram_chat(chat_id)?;
        let message = parse_telegram_message(message_id)?;
        self.limiter.until_ready().await;
        self.bot
            .unpin_chat_message(chat)
            .message_id(message)
            .send()
            .await
            .map_err(|e| classify_telegram_error(&e))?;
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> SurfaceResult<String> {
        // A private chat id equals the user id
        self.send(user_id, text).await
    }
}

/// Discord message length limit
const DISCORD_MAX_CONTENT: usize = 2000;

#[derive(Debug, Deserialize)]
struct DiscordErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscordCreated {
    id: String,
}

/// Map a failed Discord REST response onto [`SurfaceError`]
pub fn classify_discord_error(status: u16, body: &str) -> SurfaceError {
    if status == 429 {
        return SurfaceError::RateLimited;
    }

    let parsed: Option<DiscordErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code);
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("HTTP {}", status));

    match code {
        Some(10008) => SurfaceError::MessageNotFound,
        Some(50013) | Some(50001) => SurfaceError::MissingPermission(message),
        _ if status == 404 => SurfaceError::MessageNotFound,
        _ if status == 403 => SurfaceError::MissingPermission(message),
        _ => SurfaceError::Other(message),
    }
}

/// Discord surface over the REST API with a bot token
#[derive(Clone)]
pub struct DiscordSurface {
    client: Client,
    api_url: String,
    token: String,
}

impl DiscordSurface {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(GatherBuddyError::Http)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn call(&self, method: reqwest::Method, path: &str, body: Option<serde_json::Value>) -> SurfaceResult<String> {
        let url = format!("{}{}", self.api_url, path);
        debug!(method = %method, url = %url, "Discord request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SurfaceError::Other(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SurfaceError::Other(e.to_string()))?;

        if status.is_success() {
            Ok(text)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(SurfaceError::RateLimited)
        } else {
            Err(classify_discord_error(status.as_u16(), &text))
        }
    }

    fn created_id(body: &str) -> SurfaceResult<String> {
        serde_json::from_str::<DiscordCreated>(body)
            .map(|created| created.id)
            .map_err(|e| SurfaceError::Other(format!("unexpected Discord response: {}", e)))
    }
}

impl ChatSurface for DiscordSurface {
    fn platform(&self) -> Platform {
        Platform::Discord
    }

    fn retire_mode(&self) -> RetireMode {
        RetireMode::Delete
    }

    async fn send(&self, chat_id: &str, text: &str) -> SurfaceResult<String> {
        let body = serde_json::json!({ "content": truncate_text(text, DISCORD_MAX_CONTENT) });
        let response = self
            .call(reqwest::Method::POST, &format!("/channels/{}/messages", chat_id), Some(body))
            .await?;
        Self::created_id(&response)
    }

    async fn edit(&self, chat_id: &str, message_id: &str, text: &str) -> SurfaceResult<()> {
        let body = serde_json::json!({ "content": truncate_text(text, DISCORD_MAX_CONTENT) });
        self.call(
            reqwest::Method::PATCH,
            &format!("/channels/{}/messages/{}", chat_id, message_id),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, chat_id: &str, message_id: &str) -> SurfaceResult<()> {
        self.call(
            reqwest::Method::DELETE,
            &format!("/channels/{}/messages/{}", chat_id, message_id),
            None,
        )
        .await?;
        Ok(())
    }

    async fn pin(&self, chat_id: &str, message_id: &str) -> SurfaceResult<()> {
        self.call(reqwest::Method::PUT, &format!("/channels/{}/pins/{}", chat_id, message_id), None)
            .await?;
        Ok(())
    }

    async fn unpin(&self, chat_id: &str, message_id: &str) -> SurfaceResult<()> {
        self.call(reqwest::Method::DELETE, &format!("/channels/{}/pins/{}", chat_id, message_id), None)
            .await?;
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> SurfaceResult<String> {
        let body = serde_json::json!({ "recipient_id": user_id });
        let response = self
            .call(reqwest::Method::POST, "/users/@me/channels", Some(body))
            .await?;
        let channel = Self::created_id(&response)?;
        self.send(&channel, text).await
    }
}

/// Every configured surface
#[derive(Clone)]
pub struct Surfaces {
    pub telegram: TelegramSurface,
    pub discord: Option<DiscordSurface>,
}

impl Surfaces {
    pub fn new(telegram: TelegramSurface, discord: Option<DiscordSurface>) -> Self {
        Self { telegram, discord }
    }

    /// Direct-message a user on the given platform
    pub async fn send_direct(&self, platform: Platform, user_id: &str, text: &str) -> SurfaceResult<String> {
        match platform {
            Platform::Telegram => self.telegram.send_direct(user_id, text).await,
            Platform::Discord => match &self.discord {
                Some(discord) => discord.send_direct(user_id, text).await,
                None => Err(SurfaceError::Other("discord is not configured".to_string())),
            },
        }
    }
}
