//! Treasure Engine - Main entry point.
//!
//! Runs the engine standalone against the in-memory world until Ctrl+C or
//! SIGTERM, then shuts down gracefully.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use treasure_engine::infrastructure::{
    catalog::CatalogRegistry,
    clock::{SystemClock, SystemRandom},
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    ports::ClockPort,
    stats_store::build_stats_store,
    world::InMemoryWorld,
};
use treasure_engine::{App, AppPorts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treasure_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Treasure Engine");

    let config_path = std::env::var("TREASURE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load(&config_path)?;
    let rules = config.rewards.rules();

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
    let stats_store = build_stats_store(&config.storage, clock.clone())?;
    if let Err(e) = stats_store.initialize().await {
        // Gameplay continues on cached defaults; each flush retries initialization.
        tracing::warn!(error = %e, backend = %stats_store.backend(), "Stats store failed to initialize");
    }

    let app = App::new(
        AppPorts {
            stats_store,
            world: Arc::new(InMemoryWorld::new()),
            catalogs: Arc::new(CatalogRegistry::vanilla()),
            clock,
            random: Arc::new(SystemRandom::new()),
        },
        rules,
        config.container_capacity,
    );

    let flush = app
        .use_cases
        .session
        .start_flush_loop(&app.scheduler, config.flush_interval());
    tracing::info!(
        interval_secs = config.flush_interval().as_secs(),
        "Periodic stats flush started"
    );

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());
    cancel_token.cancelled().await;

    flush.cancel();
    app.shutdown().await;
    tracing::info!("Treasure Engine stopped");
    Ok(())
}

/// Spawns a task that cancels `cancel_token` on SIGTERM/SIGINT
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}
