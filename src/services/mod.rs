//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod dashboard;
pub mod identity;
pub mod notification;
pub mod scheduling;
pub mod surface;
pub mod webhook;

// Re-export commonly used services
pub use auth::{AdminCredential, AuthService, ManagerActor, SessionClaims};
pub use dashboard::DashboardService;
pub use identity::{ClaimOutcome, HandleRecovery, IdentityService, LoginLink};
pub use notification::NotificationService;
pub use scheduling::{CreatedEvent, SchedulingService};
pub use surface::{ChatSurface, DiscordSurface, SurfaceError, Surfaces, TelegramSurface};
pub use webhook::{DeliveryOutcome, WebhookService};

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub identity_service: IdentityService,
    pub dashboard_service: DashboardService,
    pub notification_service: NotificationService,
    pub webhook_service: WebhookService,
    pub scheduling_service: SchedulingService,
    pub surfaces: Surfaces,
    pub database: DatabaseService,
    pub settings: Settings,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: Settings, database: DatabaseService, surfaces: Surfaces) -> Result<Self> {
        let auth_service = AuthService::new(settings.clone());
        let notification_service = NotificationService::new(surfaces.clone(), settings.clone());
        let dashboard_service = DashboardService::new(database.clone(), surfaces.clone(), settings.clone());
        let webhook_service = WebhookService::new(database.clone(), settings.webhooks.clone())?;
        let identity_service = IdentityService::new(
            database.clone(),
            auth_service.clone(),
            notification_service.clone(),
            settings.clone(),
        );
        let scheduling_service = SchedulingService::new(
            database.clone(),
            auth_service.clone(),
            identity_service.clone(),
            dashboard_service.clone(),
            notification_service.clone(),
            webhook_service.clone(),
            settings.clone(),
        );

        Ok(Self {
            auth_service,
            identity_service,
            dashboard_service,
            notification_service,
            webhook_service,
            scheduling_service,
            surfaces,
            database,
            settings,
        })
    }

    /// Build the chat surfaces from configuration
    pub fn build_surfaces(settings: &Settings) -> Result<Surfaces> {
        let bot = TelegramSurface::build_bot(&settings.telegram)?;
        let telegram = TelegramSurface::new(bot, &settings.telegram);
        let discord = settings
            .discord
            .as_ref()
            .map(DiscordSurface::new)
            .transpose()?;
        Ok(Surfaces::new(telegram, discord))
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = crate::database::connection::health_check(&self.database.pool)
            .await
            .is_ok();

        ServiceHealthStatus {
            database_healthy,
            discord_enabled: self.surfaces.discord.is_some(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub discord_enabled: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        issues
    }
}
