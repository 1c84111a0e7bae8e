//! Start command handler
//!
//! Handles `/start` deep-link payloads and the identity commands that ride on
//! them: setup and short-token recovery, magic login, handle recovery and the
//! claim flow on a bare slug.

use tracing::{debug, info};
use crate::handlers::commands::{CommandContext, StartPayload};
use crate::models::Platform;
use crate::services::identity::HandleRecovery;
use crate::services::{ClaimOutcome, ServiceFactory};
use crate::utils::errors::{GatherBuddyError, Result};

const PRIVATE_ONLY: &str = "Please send me this in a direct message.";

/// Handle /start with its payload
pub async fn handle_start(services: &ServiceFactory, context: &CommandContext, payload: StartPayload) -> Result<String> {
    debug!(sender = %context.sender.user_id, payload = ?payload, "Processing /start");

    match payload {
        StartPayload::Empty | StartPayload::Unknown => Ok(super::help::help_text()),
        StartPayload::SetupRecovery { slug, token } => {
            let event = services
                .identity_service
                .redeem_setup_token(&slug, &token, &context.sender)
                .await?;
            Ok(format!(
                "You now manage \"{}\". Add me to your group and send /connect {} there.",
                event.title, event.slug
            ))
        }
        StartPayload::ShortRecovery(short) => {
            let event = services
                .identity_service
                .redeem_short_token(&short, &context.sender)
                .await?;
            Ok(format!("You are back in control of \"{}\".", event.title))
        }
        StartPayload::Login => handle_login(services, context).await,
        StartPayload::RecoverHandle => handle_recover_any(services, context).await,
        StartPayload::Slug(slug) => handle_claim(services, context, &slug).await,
    }
}

/// Claim on first contact with a bare slug
async fn handle_claim(services: &ServiceFactory, context: &CommandContext, slug: &str) -> Result<String> {
    let outcome = services.identity_service.claim(slug, &context.sender).await?;
    let event = services.database.require_event(slug).await?;
    let link = services.settings.event_link(&event.slug);

    Ok(match outcome {
        ClaimOutcome::Claimed | ClaimOutcome::AlreadyManager => format!(
            "You manage \"{}\". Add me to your group and send /connect {} there.\n{}",
            event.title, event.slug, link
        ),
        ClaimOutcome::NotManager => format!("\"{}\": vote here {}", event.title, link),
    })
}

/// Send a magic login link for the sender's own chat
pub async fn handle_login(services: &ServiceFactory, context: &CommandContext) -> Result<String> {
    if !context.is_private && context.sender.platform == Platform::Telegram {
        return Ok(PRIVATE_ONLY.to_string());
    }

    let login = services
        .identity_service
        .issue_login(context.sender.platform, &context.sender.user_id)
        .await?;
    info!(platform = %context.sender.platform, sender = %context.sender.user_id, "Login link issued");
    Ok(format!(
        "Open this link within {} minutes to manage your events:\n{}",
        services.settings.auth.login_token_ttl_minutes,
        login.link
    ))
}

/// `recover_handle`: the sender's chat has just been captured, so any event
/// naming their handle as manager is theirs; hand out a login link
async fn handle_recover_any(services: &ServiceFactory, context: &CommandContext) -> Result<String> {
    let managed = services
        .database
        .events
        .managed_by(context.sender.platform, &context.sender.user_id)
        .await?;
    if managed.is_empty() {
        return Ok("I couldn't find any events managed by your handle.".to_string());
    }
    handle_login(services, context).await
}

/// Discord `/recover <slug>`: verify the sender's handle against the event
pub async fn handle_recover(services: &ServiceFactory, context: &CommandContext, slug: &str) -> Result<String> {
    let handle = context
        .sender
        .handle
        .as_deref()
        .ok_or_else(|| GatherBuddyError::PermissionDenied("sender has no handle".to_string()))?;

    match services
        .identity_service
        .recover_by_handle(slug.trim(), context.sender.platform, handle)
        .await?
    {
        HandleRecovery::LinkSent => Ok("I sent you a login link in a direct message.".to_string()),
        HandleRecovery::MessageBotFirst => Ok("Send me a direct message first, then try again.".to_string()),
    }
}
