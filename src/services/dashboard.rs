//! Dashboard synchronization
//!
//! Each connected chat keeps at most one live message per event: the voting
//! dashboard while the event is a draft, then the finalized announcement. The
//! lifecycle functions below run against any [`ChatSurface`] and return the
//! message id to store; [`DashboardService`] persists those ids and drives
//! every connected platform. Nothing here fails the caller's action: platform
//! errors are recovered locally or logged. Platforms are driven concurrently.

use futures::join;
use tracing::{info, warn};
use crate::config::settings::Settings;
use crate::database::service::{DatabaseService, EventSnapshot};
use crate::models::{Event, EventStatus, Platform, SurfaceState};
use crate::services::notification;
use crate::services::surface::{ChatSurface, RetireMode, SurfaceError, Surfaces};
use crate::utils::logging::log_surface_fallback;

/// Message ids after a lifecycle step, `None` meaning "nothing stored"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredMessages {
    pub dashboard: Option<String>,
    pub announcement: Option<String>,
}

impl From<&SurfaceState> for StoredMessages {
    fn from(state: &SurfaceState) -> Self {
        Self {
            dashboard: state.dashboard_message_id.clone(),
            announcement: state.announcement_message_id.clone(),
        }
    }
}

/// Send a message and pin it
///
/// A pin refused for lack of rights posts a plain warning into the same chat
/// so a human can fix the permission; the message id is kept either way.
pub async fn send_and_pin<S: ChatSurface>(surface: &S, chat_id: &str, text: &str) -> Option<String> {
    let message_id = match surface.send(chat_id, text).await {
        Ok(id) => id,
        Err(e) => {
            warn!(platform = %surface.platform(), chat_id = chat_id, error = %e, "Failed to send message");
            return None;
        }
    };

    match surface.pin(chat_id, &message_id).await {
        Ok(()) => {}
        Err(SurfaceError::MissingPermission(reason)) => {
            log_surface_fallback(surface.platform().as_str(), chat_id, "pin", "permission warning");
            warn!(platform = %surface.platform(), chat_id = chat_id, reason = %reason, "Missing permission to pin");
            if let Err(e) = surface.send(chat_id, &notification::render_pin_permission_warning()).await {
                warn!(platform = %surface.platform(), chat_id = chat_id, error = %e, "Failed to send pin warning");
            }
        }
        Err(e) => {
            warn!(platform = %surface.platform(), chat_id = chat_id, error = %e, "Failed to pin message");
        }
    }

    Some(message_id)
}

/// Create the pinned message once, then edit it in place
///
/// An edit that the platform reports as unchanged keeps the id. A message
/// that vanished is sent anew and pinned. Any other edit failure keeps the
/// stored id so the next sync tries the same message again.
pub async fn upsert_pinned<S: ChatSurface>(surface: &S, chat_id: &str, stored: Option<&str>, text: &str) -> Option<String> {
    let Some(message_id) = stored else {
        return send_and_pin(surface, chat_id, text).await;
    };

    match surface.edit(chat_id, message_id, text).await {
        Ok(()) | Err(SurfaceError::NotModified) => Some(message_id.to_string()),
        Err(SurfaceError::MessageNotFound) => {
            log_surface_fallback(surface.platform().as_str(), chat_id, "edit", "resend");
            send_and_pin(surface, chat_id, text).await
        }
        Err(e) => {
            warn!(platform = %surface.platform(), chat_id = chat_id, message_id = message_id, error = %e, "Failed to edit message");
            Some(message_id.to_string())
        }
    }
}

/// Take a message out of service the way the platform prefers
pub async fn retire<S: ChatSurface>(surface: &S, chat_id: &str, message_id: &str) {
    let result = match surface.retire_mode() {
        RetireMode::Unpin => surface.unpin(chat_id, message_id).await,
        RetireMode::Delete => surface.delete(chat_id, message_id).await,
    };

    match result {
        Ok(()) | Err(SurfaceError::MessageNotFound) => {}
        Err(e) => {
            warn!(platform = %surface.platform(), chat_id = chat_id, message_id = message_id, error = %e, "Failed to retire message");
        }
    }
}

/// Replace the voting dashboard by a pinned announcement
pub async fn finalize_on<S: ChatSurface>(surface: &S, chat_id: &str, stored: &StoredMessages, announcement: &str) -> StoredMessages {
    if let Some(dashboard) = &stored.dashboard {
        retire(surface, chat_id, dashboard).await;
    }

    let announcement_id = upsert_pinned(surface, chat_id, stored.announcement.as_deref(), announcement).await;
    StoredMessages {
        dashboard: None,
        announcement: announcement_id,
    }
}

/// Mark the pinned message cancelled and post a plain notice
pub async fn cancel_on<S: ChatSurface>(surface: &S, chat_id: &str, stored: &StoredMessages, pinned_text: &str, notice: &str) {
    if let Some(pinned) = stored.announcement.as_ref().or(stored.dashboard.as_ref()) {
        match surface.edit(chat_id, pinned, pinned_text).await {
            Ok(()) | Err(SurfaceError::NotModified) | Err(SurfaceError::MessageNotFound) => {}
            Err(e) => {
                warn!(platform = %surface.platform(), chat_id = chat_id, error = %e, "Failed to mark message cancelled");
            }
        }
    }

    if let Err(e) = surface.send(chat_id, notice).await {
        warn!(platform = %surface.platform(), chat_id = chat_id, error = %e, "Failed to send cancellation notice");
    }
}

/// Retire every stored message of the event
pub async fn delete_on<S: ChatSurface>(surface: &S, chat_id: &str, stored: &StoredMessages) {
    for message_id in [&stored.dashboard, &stored.announcement].into_iter().flatten() {
        retire(surface, chat_id, message_id).await;
    }
}

/// Persists message ids and fans lifecycle steps out to every connected chat
#[derive(Clone)]
pub struct DashboardService {
    db: DatabaseService,
    surfaces: Surfaces,
    settings: Settings,
}

impl DashboardService {
    pub fn new(db: DatabaseService, surfaces: Surfaces, settings: Settings) -> Self {
        Self { db, surfaces, settings }
    }

    async fn store(&self, event_id: i64, platform: Platform, before: &StoredMessages, after: &StoredMessages) {
        if before.dashboard != after.dashboard {
            if let Err(e) = self.db.events.set_dashboard_message(event_id, platform, after.dashboard.as_deref()).await {
                warn!(event_id = event_id, platform = %platform, error = %e, "Failed to store dashboard message id");
            }
        }
        if before.announcement != after.announcement {
            if let Err(e) = self.db.events.set_announcement_message(event_id, platform, after.announcement.as_deref()).await {
                warn!(event_id = event_id, platform = %platform, error = %e, "Failed to store announcement message id");
            }
        }
    }

    /// Bring the live message of one surface up to date
    async fn refresh_on<S: ChatSurface>(&self, surface: &S, snapshot: &EventSnapshot) {
        let platform = surface.platform();
        let Some(state) = snapshot.event.surface_state(platform) else {
            return;
        };
        let before = StoredMessages::from(&state);
        let link = self.settings.event_link(&snapshot.event.slug);

        let after = match snapshot.event.status {
            EventStatus::Draft => StoredMessages {
                dashboard: upsert_pinned(
                    surface,
                    &state.chat_id,
                    before.dashboard.as_deref(),
                    &notification::render_dashboard(snapshot, &link),
                )
                .await,
                announcement: before.announcement.clone(),
            },
            EventStatus::Finalized => StoredMessages {
                dashboard: before.dashboard.clone(),
                announcement: upsert_pinned(
                    surface,
                    &state.chat_id,
                    before.announcement.as_deref(),
                    &notification::render_announcement(snapshot, &link),
                )
                .await,
            },
            EventStatus::Cancelled => return,
        };

        self.store(snapshot.event.id, platform, &before, &after).await;
    }

    async fn finalize_surface<S: ChatSurface>(&self, surface: &S, snapshot: &EventSnapshot) {
        let platform = surface.platform();
        let Some(state) = snapshot.event.surface_state(platform) else {
            return;
        };
        let before = StoredMessages::from(&state);
        let link = self.settings.event_link(&snapshot.event.slug);
        let text = notification::render_announcement(snapshot, &link);

        let after = finalize_on(surface, &state.chat_id, &before, &text).await;
        self.store(snapshot.event.id, platform, &before, &after).await;
    }

    async fn cancel_surface<S: ChatSurface>(&self, surface: &S, event: &Event) {
        let Some(state) = event.surface_state(surface.platform()) else {
            return;
        };
        cancel_on(
            surface,
            &state.chat_id,
            &StoredMessages::from(&state),
            &notification::render_cancelled_pin(event),
            &notification::render_cancelled_notice(event),
        )
        .await;
    }

    async fn delete_surface<S: ChatSurface>(&self, surface: &S, event: &Event) {
        let Some(state) = event.surface_state(surface.platform()) else {
            return;
        };
        delete_on(surface, &state.chat_id, &StoredMessages::from(&state)).await;
    }

    async fn remind_surface<S: ChatSurface>(&self, surface: &S, snapshot: &EventSnapshot) -> bool {
        let Some(state) = snapshot.event.surface_state(surface.platform()) else {
            return false;
        };
        let text = notification::render_reminder(snapshot, &self.settings.event_link(&snapshot.event.slug));
        match surface.send(&state.chat_id, &text).await {
            Ok(_) => true,
            Err(e) => {
                warn!(platform = %surface.platform(), chat_id = %state.chat_id, error = %e, "Failed to send reminder");
                false
            }
        }
    }

    /// Sync the live message on every connected surface
    pub async fn refresh(&self, snapshot: &EventSnapshot) {
        let discord = async {
            if let Some(discord) = &self.surfaces.discord {
                self.refresh_on(discord, snapshot).await;
            }
        };
        join!(self.refresh_on(&self.surfaces.telegram, snapshot), discord);
    }

    /// Reload the event and sync it; used after changes made outside a snapshot
    pub async fn refresh_event(&self, event_id: i64) {
        match self.db.load_snapshot(event_id).await {
            Ok(Some(snapshot)) => self.refresh(&snapshot).await,
            Ok(None) => {}
            Err(e) => warn!(event_id = event_id, error = %e, "Failed to load event for dashboard refresh"),
        }
    }

    /// Swap dashboards for the finalized announcement
    pub async fn announce_finalized(&self, snapshot: &EventSnapshot) {
        info!(event_id = snapshot.event.id, "Announcing finalized event");
        let discord = async {
            if let Some(discord) = &self.surfaces.discord {
                self.finalize_surface(discord, snapshot).await;
            }
        };
        join!(self.finalize_surface(&self.surfaces.telegram, snapshot), discord);
    }

    pub async fn announce_cancelled(&self, event: &Event) {
        info!(event_id = event.id, "Announcing cancelled event");
        let discord = async {
            if let Some(discord) = &self.surfaces.discord {
                self.cancel_surface(discord, event).await;
            }
        };
        join!(self.cancel_surface(&self.surfaces.telegram, event), discord);
    }

    /// Retire every message of an event about to be deleted
    pub async fn retire_all(&self, event: &Event) {
        let discord = async {
            if let Some(discord) = &self.surfaces.discord {
                self.delete_surface(discord, event).await;
            }
        };
        join!(self.delete_surface(&self.surfaces.telegram, event), discord);
    }

    /// One-shot reminder to every connected surface; true if any was sent
    pub async fn send_reminder(&self, snapshot: &EventSnapshot) -> bool {
        let discord = async {
            match &self.surfaces.discord {
                Some(discord) => self.remind_surface(discord, snapshot).await,
                None => false,
            }
        };
        let (telegram, discord) = join!(self.remind_surface(&self.surfaces.telegram, snapshot), discord);
        telegram || discord
    }
}
