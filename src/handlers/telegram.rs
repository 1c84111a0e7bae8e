//! Telegram ingress
//!
//! A long-polling `getUpdates` loop run as a supervised task. It stops when
//! the shutdown watch flips and is restarted if it ever panics. A 409 from a
//! second poller backs off with jitter; a 409 caused by a registered webhook
//! deletes the webhook and polls again.

use std::time::Duration;
use rand::Rng;
use teloxide::{
    payloads::GetUpdatesSetters,
    requests::{Request, Requester},
    types::{AllowedUpdate, Message, Update, UpdateKind},
    Bot,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::config::TelegramConfig;
use crate::handlers::commands::{ChatCommand, CommandContext};
use crate::handlers::messages::handle_message;
use crate::middleware::RateLimitMiddleware;
use crate::models::{ChatIdentity, Platform};
use crate::services::{ChatSurface, ServiceFactory};

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Why a `getUpdates` call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFailure {
    /// Another process is polling with the same token
    Conflict,
    /// A webhook is registered, so polling is refused
    WebhookActive,
    Other,
}

pub fn classify_poll_error(description: &str) -> PollFailure {
    let text = description.to_lowercase();
    if text.contains("terminated by other getupdates") {
        PollFailure::Conflict
    } else if text.contains("webhook is active") {
        PollFailure::WebhookActive
    } else {
        PollFailure::Other
    }
}

/// Exponential backoff with up to one second of jitter
pub fn poll_backoff(consecutive_failures: u32) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(5);
    let base = Duration::from_secs(1u64 << exponent).min(MAX_BACKOFF);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=1000));
    base + jitter
}

/// Offset that acknowledges `update_id`
pub fn next_offset(current: i32, update_id: u32) -> i32 {
    let acknowledged = i32::try_from(update_id).unwrap_or(i32::MAX).saturating_add(1);
    current.max(acknowledged)
}

/// Build the command context for a Telegram message
pub fn message_context(msg: &Message) -> Option<CommandContext> {
    let user = msg.from.as_ref().filter(|user| !user.is_bot)?;
    Some(CommandContext {
        sender: ChatIdentity {
            platform: Platform::Telegram,
            user_id: user.id.0.to_string(),
            handle: user.username.clone(),
        },
        chat_id: msg.chat.id.0.to_string(),
        is_private: msg.chat.is_private(),
    })
}

#[derive(Clone)]
pub struct TelegramPoller {
    bot: Bot,
    services: ServiceFactory,
    rate_limiter: RateLimitMiddleware,
    config: TelegramConfig,
}

impl TelegramPoller {
    pub fn new(services: ServiceFactory, rate_limiter: RateLimitMiddleware) -> Self {
        Self {
            bot: services.surfaces.telegram.bot().clone(),
            config: services.settings.telegram.clone(),
            services,
            rate_limiter,
        }
    }

    /// Start the poller under a supervisor that restarts it after a panic
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let attempt = tokio::spawn(self.clone().run(shutdown.clone())).await;
                if *shutdown.borrow() {
                    break;
                }
                match attempt {
                    Ok(()) => break,
                    Err(e) => {
                        error!(error = %e, "Telegram poller crashed, restarting");
                        tokio::time::sleep(RESTART_DELAY).await;
                    }
                }
            }
            info!("Telegram poller supervisor stopped");
        })
    }

    /// Poll until shutdown
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(timeout = self.config.poll_timeout_seconds, "Telegram poller started");
        let mut offset = 0;
        let mut failures = 0u32;

        loop {
            let request = self
                .bot
                .get_updates()
                .offset(offset)
                .timeout(self.config.poll_timeout_seconds)
                .allowed_updates(vec![AllowedUpdate::Message]);

            let result = tokio::select! {
                result = request.send() => result,
                _ = shutdown.changed() => break,
            };

            let delay = match result {
                Ok(updates) => {
                    failures = 0;
                    for update in updates {
                        offset = next_offset(offset, update.id.0);
                        self.handle_update(update).await;
                    }
                    continue;
                }
                Err(e) => {
                    failures += 1;
                    match classify_poll_error(&e.to_string()) {
                        PollFailure::WebhookActive => {
                            warn!("Webhook registered, deleting it to resume polling");
                            if let Err(e) = self.bot.delete_webhook().send().await {
                                warn!(error = %e, "Failed to delete webhook");
                            }
                            poll_backoff(1)
                        }
                        PollFailure::Conflict => {
                            warn!(failures = failures, "Another poller holds getUpdates, backing off");
                            poll_backoff(failures)
                        }
                        PollFailure::Other => {
                            warn!(error = %e, failures = failures, "getUpdates failed");
                            poll_backoff(failures)
                        }
                    }
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Telegram poller stopped");
    }

    async fn handle_update(&self, update: Update) {
        let UpdateKind::Message(msg) = update.kind else {
            return;
        };
        let Some(context) = message_context(&msg) else {
            return;
        };

        let command = msg
            .text()
            .and_then(|text| ChatCommand::from_telegram_text(text, &self.config.bot_username));
        let Some(reply) = handle_message(&self.services, &self.rate_limiter, &context, command).await else {
            return;
        };

        if let Err(e) = self.services.surfaces.telegram.send(&context.chat_id, &reply).await {
            debug!(chat_id = %context.chat_id, error = %e, "Failed to send command reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_error_classification() {
        assert_eq!(
            classify_poll_error("Conflict: terminated by other getUpdates request; make sure that only one bot instance is running"),
            PollFailure::Conflict
        );
        assert_eq!(
            classify_poll_error("Conflict: can't use getUpdates method while webhook is active; use deleteWebhook to delete the webhook first"),
            PollFailure::WebhookActive
        );
        assert_eq!(classify_poll_error("Network error"), PollFailure::Other);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let first = poll_backoff(1);
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_secs(2));
        let later = poll_backoff(4);
        assert!(later >= Duration::from_secs(8));
        assert!(poll_backoff(50) <= MAX_BACKOFF + Duration::from_secs(1));
    }

    #[test]
    fn test_offset_only_moves_forward() {
        assert_eq!(next_offset(0, 41), 42);
        assert_eq!(next_offset(100, 41), 100);
    }
}
