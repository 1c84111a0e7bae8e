//! Message handlers module
//!
//! Every inbound chat message passes through here: the sender's identity is
//! captured passively, then any command in the message is rate limited and
//! routed. Errors become a short reply; they never stop the ingress loop.

use tracing::{debug, error, warn};
use crate::handlers::commands::{handle_command, ChatCommand, CommandContext};
use crate::middleware::RateLimitMiddleware;
use crate::services::ServiceFactory;
use crate::utils::errors::{ErrorSeverity, GatherBuddyError};

/// Capture the sender and run the command, if any; returns the reply text
pub async fn handle_message(
    services: &ServiceFactory,
    rate_limiter: &RateLimitMiddleware,
    context: &CommandContext,
    command: Option<ChatCommand>,
) -> Option<String> {
    if let Err(e) = services.identity_service.capture(&context.sender).await {
        warn!(error = %e, sender = %context.sender.user_id, "Passive identity capture failed");
    }

    let command = command?;
    debug!(
        platform = %context.sender.platform,
        sender = %context.sender.user_id,
        chat_id = %context.chat_id,
        command = ?command,
        "Processing command"
    );

    if let Err(e) = rate_limiter.check_rate_limit(&context.sender) {
        return Some(e.user_message());
    }

    match handle_command(services, context, command).await {
        Ok(reply) => Some(reply),
        Err(e) => Some(reply_for_error(&e)),
    }
}

/// Log a failed command and turn it into a reply
pub fn reply_for_error(error: &GatherBuddyError) -> String {
    match error.severity() {
        ErrorSeverity::Info | ErrorSeverity::Warning => {
            debug!(error = %error, "Command rejected");
        }
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(error = %error, "Command failed");
        }
    }
    error.user_message()
}
