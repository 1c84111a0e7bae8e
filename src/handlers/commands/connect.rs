//! Connect command handler

use tracing::info;
use crate::handlers::commands::CommandContext;
use crate::services::ServiceFactory;
use crate::utils::errors::{GatherBuddyError, Result};
use crate::utils::helpers::is_valid_slug;

/// Handle /connect <slug> - attach this chat's live dashboard to an event
pub async fn handle_connect(services: &ServiceFactory, context: &CommandContext, slug: &str) -> Result<String> {
    let slug = slug.trim();
    if !is_valid_slug(slug) {
        return Err(GatherBuddyError::InvalidInput("Usage: /connect <event>".to_string()));
    }
    if context.is_private {
        return Ok("Send /connect in the group chat that should show the dashboard.".to_string());
    }

    let event = services
        .scheduling_service
        .connect_chat(slug, &context.sender, &context.chat_id)
        .await?;

    info!(
        event_id = event.id,
        platform = %context.sender.platform,
        chat_id = %context.chat_id,
        "Chat connected"
    );
    Ok(format!("Connected \"{}\". I'll keep a live dashboard pinned here.", event.title))
}
