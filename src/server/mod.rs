//! HTTP server
//!
//! The JSON API used by the voting page, the magic-login endpoint, the cron
//! tick, the Discord interactions endpoint and a health check.

pub mod auth;
pub mod error;
pub mod events;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use tokio::sync::watch;
use tracing::{info, warn};
use crate::handlers::discord::{handle_interaction, verify_signature, Interaction, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::middleware::RateLimitMiddleware;
use crate::services::ServiceFactory;
use crate::utils::errors::{GatherBuddyError, Result};

/// Shared state of every route
#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
    pub rate_limiter: RateLimitMiddleware,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/events", post(events::create))
        .route("/api/events/:slug", get(events::show).delete(events::delete))
        .route("/api/events/:slug/votes", post(events::vote))
        .route("/api/events/:slug/finalize", post(events::finalize))
        .route("/api/events/:slug/cancel", post(events::cancel))
        .route("/api/events/:slug/location", patch(events::update_location))
        .route("/api/events/:slug/reminders", put(events::update_reminders))
        .route("/api/events/:slug/participants/:id", delete(events::remove_participant))
        .route("/api/events/:slug/recover", post(auth::recover))
        .route("/api/events/:slug/recovery-token", post(auth::recovery_token))
        .route("/auth/login", get(auth::login))
        .route("/api/cron/tick", post(cron_tick))
        .route("/discord/interactions", post(discord_interactions))
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<AppState>) -> Response {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        warn!(issues = ?status.get_issues(), "Health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}

/// POST /api/cron/tick
async fn cron_tick(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>> {
    if !auth::is_cron_authorized(&headers, &state.services.settings.auth.cron_secret) {
        return Err(GatherBuddyError::Authentication("bad cron secret".to_string()));
    }
    state.rate_limiter.cleanup_old_entries();
    let summary = state.services.scheduling_service.run_maintenance().await?;
    Ok(Json(summary))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

/// POST /discord/interactions
async fn discord_interactions(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(discord) = state.services.settings.discord.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let signature = header_str(&headers, SIGNATURE_HEADER);
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    if !verify_signature(&discord.public_key, signature, timestamp, &body) {
        warn!("Rejected Discord interaction with a bad signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => return GatherBuddyError::Serialization(e).into_response(),
    };

    Json(handle_interaction(&state.services, &state.rate_limiter, &interaction).await).into_response()
}

/// HTTP server bound to the configured address
pub struct ApiServer {
    bind_addr: String,
    state: AppState,
}

impl ApiServer {
    pub fn new(bind_addr: String, state: AppState) -> Self {
        Self { bind_addr, state }
    }

    /// Serve until the shutdown watch flips
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP API listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        info!("HTTP API stopped");
        Ok(())
    }
}
