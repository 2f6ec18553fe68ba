//! Sensor Service (SensorSrv)
//!
//! Accepts sensor readings over HTTP, persists them to SQLite and pushes alarm
//! notifications to WebSocket subscribers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{service_bootstrap, ServiceInfo};
use std::path::PathBuf;
use tracing::{info, warn};

use sensorsrv::{api, AppState, SensorsrvConfig};

/// Sensor telemetry ingestion service
#[derive(Parser)]
#[command(name = "sensorsrv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Override the SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Serve without authentication
    #[arg(long, global = true)]
    no_auth: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration, open the store, print a summary
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SensorsrvConfig::load(cli.config.as_deref())?.with_overrides(
        cli.port,
        cli.db.clone(),
        cli.no_auth,
    );
    config.validate()?;

    let service = ServiceInfo::new(
        "sensorsrv",
        env!("CARGO_PKG_VERSION"),
        "Sensor telemetry ingestion and alarm broadcast",
        config.api.port,
    );
    let log_config = service.log_config(
        &config.logging.level,
        config.logging.json,
        config.logging.dir.clone(),
    );
    service_bootstrap::init_logging(&service, &log_config)?;

    match cli.command {
        Some(Commands::Check) => check(&config).await,
        None => serve(config).await,
    }
}

async fn check(config: &SensorsrvConfig) -> Result<()> {
    let state = AppState::from_config(config).await?;
    let stored = state.query.total().await?;

    println!("Configuration OK");
    println!("  listen:     {}", config.api.bind_address());
    println!("  database:   {}", config.database.path.display());
    println!("  readings:   {}", stored);
    println!("  auth:       {}", if config.auth.enabled { "enabled" } else { "disabled" });
    println!("  validation: {:?}", config.validation.policy());
    Ok(())
}

async fn serve(config: SensorsrvConfig) -> Result<()> {
    let state = AppState::from_config(&config).await?;
    let app = api::create_router(state);

    let addr = config.api.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Sensor Service started on {}", addr);
    info!("API endpoints:");
    if config.auth.enabled {
        info!("  POST /login      - Obtain a bearer token");
    } else {
        warn!("Authentication disabled, data endpoints are open");
    }
    info!("  POST /send_data  - Submit a reading");
    info!("  GET  /events     - Recent readings");
    info!("  POST /simulate   - Ingest 50 synthetic readings");
    info!("  GET  /ws         - Real-time alarm channel");
    info!("  GET  /health     - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            common::shutdown::wait_for_shutdown().await;
        })
        .await?;

    info!("Sensor Service stopped");
    Ok(())
}
