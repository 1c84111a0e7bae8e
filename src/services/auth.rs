//! Authentication service implementation
//!
//! Token generation and hashing, admin session JWTs, and the manager check
//! every mutating endpoint goes through. Raw tokens never touch the database:
//! only their SHA-256 hex digest is stored and compared.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use crate::config::settings::Settings;
use crate::models::{Event, Platform};
use crate::utils::errors::{GatherBuddyError, Result};
use crate::utils::helpers::generate_uuid;
use crate::utils::logging::log_identity_audit;

/// SHA-256 hex digest of a raw token
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.trim().as_bytes()))
}

/// Long credential: admin tokens, login links, setup recovery
pub fn generate_long_token() -> String {
    generate_uuid()
}

/// Short credential typed into a bot deep link: 4 random bytes as 8 hex chars
pub fn generate_short_token() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Claims carried by an admin session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Verified chat/user id
    pub sub: String,
    pub platform: Platform,
    pub iat: i64,
    pub exp: i64,
}

/// A credential presented with a management request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCredential {
    /// Per-event admin token handed out at creation
    AdminToken(String),
    /// Session JWT issued after a magic link login
    Session(String),
}

impl AdminCredential {
    /// Classify a raw bearer value; JWTs are the only credential with dots
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw.matches('.').count() == 2 {
            Some(AdminCredential::Session(raw.to_string()))
        } else {
            Some(AdminCredential::AdminToken(raw.to_string()))
        }
    }
}

/// Who passed the manager check, for audit logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerActor {
    AdminToken,
    Chat { platform: Platform, chat_id: String },
}

impl std::fmt::Display for ManagerActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerActor::AdminToken => write!(f, "admin-token"),
            ManagerActor::Chat { platform, chat_id } => write!(f, "{}:{}", platform, chat_id),
        }
    }
}

/// Authentication service for sessions and manager authorization
#[derive(Clone)]
pub struct AuthService {
    settings: Settings,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Sign a session for a verified chat
    pub fn issue_session(&self, platform: Platform, chat_id: &str) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: chat_id.to_string(),
            platform,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.settings.auth.session_ttl_hours)).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.auth.session_secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Verify signature and expiry of a session
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.settings.auth.session_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }

    /// Check that a credential may manage the event
    ///
    /// Admin tokens match by hash. Sessions must name the chat id verified
    /// as manager on the session's platform. Anything else fails closed with
    /// a generic error; the mismatch is logged.
    pub fn authorize_manager(&self, event: &Event, credential: Option<&AdminCredential>) -> Result<ManagerActor> {
        let Some(credential) = credential else {
            return Err(GatherBuddyError::Authentication("missing credential".to_string()));
        };

        match credential {
            AdminCredential::AdminToken(raw) => {
                if hash_token(raw) == event.admin_token_hash {
                    debug!(event_id = event.id, "Admin token accepted");
                    Ok(ManagerActor::AdminToken)
                } else {
                    log_identity_audit(&event.slug, "admin_token", None, "admin-token", false);
                    Err(GatherBuddyError::Authentication("admin token mismatch".to_string()))
                }
            }
            AdminCredential::Session(token) => {
                let claims = self.verify_session(token)?;
                let expected = event.manager_chat_id(claims.platform);
                let presented = format!("{}:{}", claims.platform, claims.sub);

                if expected == Some(claims.sub.as_str()) {
                    log_identity_audit(&event.slug, "session", expected, &presented, true);
                    Ok(ManagerActor::Chat { platform: claims.platform, chat_id: claims.sub })
                } else {
                    log_identity_audit(&event.slug, "session", expected, &presented, false);
                    Err(GatherBuddyError::PermissionDenied(format!(
                        "session {} is not the manager of {}",
                        presented, event.slug
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::models::EventStatus;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.session_secret = "0123456789abcdef0123456789abcdef".to_string();
        settings
    }

    fn event_with_admin(raw_admin: &str) -> Event {
        let now = Utc::now();
        Event {
            id: 3,
            slug: "game-night".to_string(),
            title: "Game night".to_string(),
            status: EventStatus::Draft,
            min_players: 2,
            max_players: None,
            finalized_slot_id: None,
            finalized_host_id: None,
            location: None,
            telegram_chat_id: None,
            telegram_dashboard_message_id: None,
            telegram_announcement_message_id: None,
            discord_channel_id: None,
            discord_dashboard_message_id: None,
            discord_announcement_message_id: None,
            manager_telegram_handle: Some("alice".to_string()),
            manager_telegram_chat_id: Some("1001".to_string()),
            manager_discord_handle: None,
            manager_discord_id: None,
            admin_token_hash: hash_token(raw_admin),
            recovery_token_hash: None,
            recovery_token_expires_at: None,
            quorum_viable_notified: false,
            quorum_perfect_notified: false,
            reminder_enabled: false,
            reminder_time: None,
            reminder_days: vec![],
            last_reminder_sent_at: None,
            webhook_url: None,
            webhook_correlation_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_shapes() {
        let short = generate_short_token();
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(generate_long_token().len(), 36);
        assert_eq!(hash_token("abc").len(), 64);
        assert_eq!(hash_token(" abc "), hash_token("abc"));
    }

    #[test]
    fn test_credential_classification() {
        assert_matches!(AdminCredential::from_raw("a.b.c"), Some(AdminCredential::Session(_)));
        assert_matches!(
            AdminCredential::from_raw("6f1c1e3a-1111-4222-8333-944445555666"),
            Some(AdminCredential::AdminToken(_))
        );
        assert_eq!(AdminCredential::from_raw("  "), None);
    }

    #[test]
    fn test_admin_token_authorizes() {
        let auth = AuthService::new(settings());
        let event = event_with_admin("secret-admin");
        let ok = auth.authorize_manager(&event, Some(&AdminCredential::AdminToken("secret-admin".into())));
        assert_eq!(ok.unwrap(), ManagerActor::AdminToken);

        let bad = auth.authorize_manager(&event, Some(&AdminCredential::AdminToken("guess".into())));
        assert_matches!(bad, Err(GatherBuddyError::Authentication(_)));
        assert_matches!(auth.authorize_manager(&event, None), Err(GatherBuddyError::Authentication(_)));
    }

    #[test]
    fn test_session_must_match_verified_manager() {
        let auth = AuthService::new(settings());
        let event = event_with_admin("x");

        let manager = auth.issue_session(Platform::Telegram, "1001").unwrap();
        let actor = auth
            .authorize_manager(&event, Some(&AdminCredential::Session(manager)))
            .unwrap();
        assert_eq!(actor.to_string(), "telegram:1001");

        let stranger = auth.issue_session(Platform::Telegram, "2002").unwrap();
        assert_matches!(
            auth.authorize_manager(&event, Some(&AdminCredential::Session(stranger))),
            Err(GatherBuddyError::PermissionDenied(_))
        );

        let other_platform = auth.issue_session(Platform::Discord, "1001").unwrap();
        assert_matches!(
            auth.authorize_manager(&event, Some(&AdminCredential::Session(other_platform))),
            Err(GatherBuddyError::PermissionDenied(_))
        );
    }

    #[test]
    fn test_session_signed_with_other_secret_is_rejected() {
        let token = AuthService::new(settings()).issue_session(Platform::Telegram, "1001").unwrap();
        let mut other = settings();
        other.auth.session_secret = "ffffffffffffffffffffffffffffffff".to_string();
        assert_matches!(
            AuthService::new(other).verify_session(&token),
            Err(GatherBuddyError::Session(_))
        );
    }
}
