//! GatherBuddy
//!
//! Main application entry point

use tokio::sync::watch;
use tracing::{error, info};

use GatherBuddy::{
    config::Settings,
    database::{connection::{create_pool, run_migrations, DatabaseConfig}, DatabaseService},
    handlers::TelegramPoller,
    middleware::RateLimitMiddleware,
    server::{ApiServer, AppState},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", GatherBuddy::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&DatabaseConfig::from(&settings.database)).await?;
    run_migrations(&db_pool).await?;
    let database_service = DatabaseService::new(db_pool);

    // Initialize services
    info!("Initializing services...");
    let surfaces = ServiceFactory::build_surfaces(&settings)?;
    let services = ServiceFactory::new(settings.clone(), database_service, surfaces)?;
    let rate_limiter = RateLimitMiddleware::default();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Background workers
    let poller = TelegramPoller::new(services.clone(), rate_limiter.clone()).spawn(shutdown_rx.clone());
    let sweeper = tokio::spawn(services.webhook_service.clone().run_sweeper(shutdown_rx.clone()));

    let server = ApiServer::new(
        settings.server.bind_addr.clone(),
        AppState { services, rate_limiter },
    );
    let server = tokio::spawn(server.run(shutdown_rx));

    info!("GatherBuddy is ready!");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    match server.await {
        Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
        Err(e) => error!(error = %e, "HTTP server task panicked"),
        Ok(Ok(())) => {}
    }
    let _ = poller.await;
    let _ = sweeper.await;

    info!("GatherBuddy has been shut down.");
    Ok(())
}
