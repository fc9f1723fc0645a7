//! Tavle Server — live classroom practice sessions.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use tavle_core::config::AppConfig;
use tavle_core::error::AppError;
use tavle_realtime::{LiveHub, Transport};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("TAVLE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    let env = std::env::var("TAVLE_ENV").unwrap_or_else(|_| "development".to_string());
    let env_config_path = format!("config/{}.toml", env);

    AppConfig::load(&config_path, Some(&env_config_path))
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Tavle v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    // ── Step 1: Database connection + migrations ─────────────────
    let db = tavle_database::DatabasePool::connect(&config.database).await?;
    tavle_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Repositories ─────────────────────────────────────
    let session_repo = Arc::new(
        tavle_database::repositories::session::SessionRepository::new(db.pool().clone()),
    );
    let participant_repo = Arc::new(
        tavle_database::repositories::participant::ParticipantRepository::new(db.pool().clone()),
    );

    // ── Step 3: Realtime hub ─────────────────────────────────────
    let hub = LiveHub::new(&config.realtime, Transport::Stream);

    // ── Step 4: Session service ──────────────────────────────────
    let sessions = Arc::new(tavle_service::SessionService::new(
        session_repo,
        participant_repo,
        hub.clone(),
        config.session.clone(),
    ));

    // ── Step 5: Scheduled maintenance ────────────────────────────
    let mut scheduler = None;
    if config.worker.enabled {
        let handler = Arc::new(tavle_worker::jobs::MaintenanceJobHandler::new(
            Arc::clone(&sessions),
            Arc::clone(hub.presence()),
        ));
        let cron = tavle_worker::CronScheduler::new(handler, config.worker.clone()).await?;
        cron.register_default_tasks().await?;
        cron.start().await?;
        scheduler = Some(cron);
    }

    // ── Step 6: HTTP server ──────────────────────────────────────
    let state = tavle_api::AppState {
        config: Arc::clone(&config),
        db: db.clone(),
        sessions,
        hub: hub.clone(),
    };
    let router = tavle_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Tavle server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 7: Graceful teardown ────────────────────────────────
    hub.shutdown();
    if let Some(mut cron) = scheduler {
        cron.shutdown().await?;
    }
    db.close().await;

    tracing::info!("Tavle server stopped");
    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
