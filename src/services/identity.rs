//! Identity and recovery
//!
//! Binds chat identities to event managers and participants: the one-time
//! setup link issued at creation, short `rec_` recovery tokens, the claim on
//! first contact, handle verification and passive capture from any inbound
//! chat message. Every check is logged with both identities; failures are
//! reported to the caller with a generic error.

use chrono::{Duration, Utc};
use tracing::{debug, info};
use crate::config::settings::Settings;
use crate::database::service::DatabaseService;
use crate::models::{ChatIdentity, Event, Platform};
use crate::services::auth::{generate_long_token, generate_short_token, hash_token, AuthService};
use crate::services::notification::NotificationService;
use crate::utils::errors::{GatherBuddyError, Result};
use crate::utils::helpers::{handles_match, normalize_handle};
use crate::utils::logging::log_identity_audit;

/// How many times a colliding short token is regenerated
const SHORT_TOKEN_ATTEMPTS: usize = 5;

/// Result of the claim-on-first-contact flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The sender just became the manager
    Claimed,
    /// The sender already was the manager
    AlreadyManager,
    /// Another identity manages the event
    NotManager,
}

/// Result of a handle verification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleRecovery {
    /// A fresh magic link was sent to the verified chat
    LinkSent,
    /// The handle matched but the bot has never seen that user
    MessageBotFirst,
}

/// Raw login token and the link to open it
#[derive(Debug, Clone)]
pub struct LoginLink {
    pub token: String,
    pub link: String,
}

#[derive(Clone)]
pub struct IdentityService {
    db: DatabaseService,
    auth: AuthService,
    notifications: NotificationService,
    settings: Settings,
}

impl IdentityService {
    pub fn new(db: DatabaseService, auth: AuthService, notifications: NotificationService, settings: Settings) -> Self {
        Self { db, auth, notifications, settings }
    }

    fn sender_label(sender: &ChatIdentity) -> String {
        match &sender.handle {
            Some(handle) => format!("{}:{} (@{})", sender.platform, sender.user_id, normalize_handle(handle)),
            None => format!("{}:{}", sender.platform, sender.user_id),
        }
    }

    fn sender_handle(sender: &ChatIdentity) -> Option<String> {
        sender
            .handle
            .as_deref()
            .map(normalize_handle)
            .filter(|h| !h.is_empty())
    }

    /// A declared handle must match the sender; a token never re-links it
    fn check_declared_handle(event: &Event, sender: &ChatIdentity, flow: &str, presented: &str) -> Result<()> {
        let Some(declared) = event.manager_handle(sender.platform) else {
            return Ok(());
        };
        let matches = sender.handle.as_deref().is_some_and(|handle| handles_match(declared, handle));
        if !matches {
            log_identity_audit(&event.slug, flow, Some(declared), presented, false);
            return Err(GatherBuddyError::PermissionDenied(format!(
                "{} does not match the declared manager of {}",
                presented, event.slug
            )));
        }
        Ok(())
    }

    /// `setup_recovery_<slug>_<token>`: bind the sender with the creation token
    pub async fn redeem_setup_token(&self, slug: &str, raw_token: &str, sender: &ChatIdentity) -> Result<Event> {
        let mut tx = self.db.begin().await?;
        let event = self
            .db
            .events
            .lock_by_slug(&mut *tx, slug)
            .await?
            .ok_or(GatherBuddyError::TokenInvalid)?;

        let presented = Self::sender_label(sender);
        let valid = event.recovery_token_hash.as_deref() == Some(hash_token(raw_token).as_str())
            && event.recovery_token_expires_at.is_some_and(|at| at > Utc::now());
        if !valid {
            log_identity_audit(slug, "setup_recovery", event.manager_chat_id(sender.platform), &presented, false);
            return Err(GatherBuddyError::TokenInvalid);
        }
        Self::check_declared_handle(&event, sender, "setup_recovery", &presented)?;

        self.bind_manager(&mut *tx, &event, sender).await?;
        tx.commit().await?;

        log_identity_audit(slug, "setup_recovery", None, &presented, true);
        self.reload(event.id, slug).await
    }

    /// `rec_<short>`: recover control with a short single-use token
    pub async fn redeem_short_token(&self, short_token: &str, sender: &ChatIdentity) -> Result<Event> {
        let mut tx = self.db.begin().await?;
        let presented = Self::sender_label(sender);
        let Some(event) = self
            .db
            .events
            .lock_by_recovery_hash(&mut *tx, &hash_token(short_token))
            .await?
        else {
            log_identity_audit("-", "short_recovery", None, &presented, false);
            return Err(GatherBuddyError::TokenInvalid);
        };

        if !event.recovery_token_expires_at.is_some_and(|at| at > Utc::now()) {
            log_identity_audit(&event.slug, "short_recovery", event.manager_chat_id(sender.platform), &presented, false);
            return Err(GatherBuddyError::TokenInvalid);
        }
        Self::check_declared_handle(&event, sender, "short_recovery", &presented)?;

        self.bind_manager(&mut *tx, &event, sender).await?;
        tx.commit().await?;

        log_identity_audit(&event.slug, "short_recovery", None, &presented, true);
        self.reload(event.id, &event.slug).await
    }

    async fn bind_manager(&self, conn: &mut sqlx::PgConnection, event: &Event, sender: &ChatIdentity) -> Result<()> {
        let handle = Self::sender_handle(sender);
        self.db
            .events
            .set_manager(conn, event.id, sender.platform, handle.as_deref(), &sender.user_id)
            .await?;
        self.db.events.clear_recovery_token(conn, event.id).await?;
        Ok(())
    }

    async fn reload(&self, event_id: i64, slug: &str) -> Result<Event> {
        self.db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| GatherBuddyError::EventNotFound { slug: slug.to_string() })
    }

    /// Issue a short recovery token for a manager; returns the bot deep link
    ///
    /// The caller must already have passed the manager check.
    pub async fn issue_short_recovery(&self, event: &Event) -> Result<String> {
        let expires_at = Utc::now() + Duration::minutes(self.settings.auth.recovery_token_ttl_minutes);

        for _ in 0..SHORT_TOKEN_ATTEMPTS {
            let short = generate_short_token();
            match self.db.events.set_recovery_token(event.id, &hash_token(&short), expires_at).await {
                Ok(()) => {
                    info!(event_id = event.id, "Short recovery token issued");
                    return Ok(self.settings.telegram_start_link(&format!("rec_{}", short)));
                }
                Err(GatherBuddyError::Database(sqlx::Error::Database(e))) if e.is_unique_violation() => {
                    debug!(event_id = event.id, "Short recovery token collided, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(GatherBuddyError::ServiceUnavailable("could not allocate a recovery token".to_string()))
    }

    /// Claim on first contact: the first verified sender naming an event
    /// without a manager on that platform becomes its manager
    pub async fn claim(&self, slug: &str, sender: &ChatIdentity) -> Result<ClaimOutcome> {
        let mut tx = self.db.begin().await?;
        let event = self
            .db
            .events
            .lock_by_slug(&mut *tx, slug)
            .await?
            .ok_or_else(|| GatherBuddyError::EventNotFound { slug: slug.to_string() })?;

        let presented = Self::sender_label(sender);
        if event.manager_chat_id(sender.platform) == Some(sender.user_id.as_str()) {
            return Ok(ClaimOutcome::AlreadyManager);
        }

        let stored_handle = event.manager_handle(sender.platform);
        let unclaimed = stored_handle.is_none() && event.manager_chat_id(sender.platform).is_none();
        let handle_matches = event.manager_chat_id(sender.platform).is_none()
            && match (stored_handle, sender.handle.as_deref()) {
                (Some(stored), Some(presented)) => handles_match(stored, presented),
                _ => false,
            };

        if !(unclaimed || handle_matches) {
            log_identity_audit(slug, "claim", stored_handle.or(event.manager_chat_id(sender.platform)), &presented, false);
            return Ok(ClaimOutcome::NotManager);
        }

        let handle = Self::sender_handle(sender);
        self.db
            .events
            .set_manager(&mut *tx, event.id, sender.platform, handle.as_deref(), &sender.user_id)
            .await?;
        tx.commit().await?;

        log_identity_audit(slug, "claim", stored_handle, &presented, true);
        Ok(ClaimOutcome::Claimed)
    }

    /// Handle verification: DM a fresh login link to the verified manager
    ///
    /// A handle that does not match the stored manager fails closed.
    pub async fn recover_by_handle(&self, slug: &str, platform: Platform, handle: &str) -> Result<HandleRecovery> {
        let event = self.db.require_event(slug).await?;
        let stored = event.manager_handle(platform);
        let presented = format!("{}:@{}", platform, normalize_handle(handle));

        let matches = stored.is_some_and(|stored| handles_match(stored, handle));
        if !matches {
            log_identity_audit(slug, "handle_recovery", stored, &presented, false);
            return Err(GatherBuddyError::PermissionDenied(format!(
                "handle {} does not manage {}",
                presented, slug
            )));
        }

        let Some(chat_id) = event.manager_chat_id(platform) else {
            info!(slug = slug, platform = %platform, "Handle matched but no verified chat yet");
            return Ok(HandleRecovery::MessageBotFirst);
        };

        let login = self.issue_login(platform, chat_id).await?;
        self.notifications
            .send_login_link(platform, chat_id, &login.token, self.settings.auth.login_token_ttl_minutes)
            .await;
        log_identity_audit(slug, "handle_recovery", stored, &presented, true);
        Ok(HandleRecovery::LinkSent)
    }

    /// Passive capture: link the sender to every participant and manager
    /// record carrying their handle and no chat id yet
    pub async fn capture(&self, sender: &ChatIdentity) -> Result<u64> {
        let Some(handle) = Self::sender_handle(sender) else {
            return Ok(0);
        };

        let participants = self
            .db
            .participants
            .capture_chat(sender.platform, &handle, &sender.user_id)
            .await?;
        let managers = self
            .db
            .events
            .capture_manager_chat(sender.platform, &handle, &sender.user_id)
            .await?;

        if participants + managers > 0 {
            info!(
                platform = %sender.platform,
                user_id = %sender.user_id,
                participants = participants,
                events = managers,
                "Captured chat identity"
            );
        }
        Ok(participants + managers)
    }

    /// Issue a single-use login token for a chat
    pub async fn issue_login(&self, platform: Platform, chat_id: &str) -> Result<LoginLink> {
        let token = generate_long_token();
        let expires_at = Utc::now() + Duration::minutes(self.settings.auth.login_token_ttl_minutes);
        self.db
            .login_tokens
            .insert(&hash_token(&token), platform, chat_id, expires_at)
            .await?;

        let link = self.settings.login_link(&token);
        Ok(LoginLink { token, link })
    }

    /// Consume a login token and sign a session for its chat
    pub async fn consume_login(&self, raw_token: &str) -> Result<String> {
        let token = self
            .db
            .login_tokens
            .consume(&hash_token(raw_token))
            .await?
            .ok_or(GatherBuddyError::TokenInvalid)?;

        if token.expires_at <= Utc::now() {
            info!(platform = %token.platform, chat_id = %token.chat_id, "Expired login token presented");
            return Err(GatherBuddyError::TokenInvalid);
        }

        info!(platform = %token.platform, chat_id = %token.chat_id, "Login token consumed");
        self.auth.issue_session(token.platform, &token.chat_id)
    }
}
