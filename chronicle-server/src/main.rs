//! chronicle-server - history lessons, social feed and premium subscriptions
//!
//! `chronicle-server` (or `chronicle-server serve`) runs the HTTP API.
//! `chronicle-server seed <file.json>` loads lessons into the catalog.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chronicle_common::config::{self, TomlConfig};
use chronicle_common::db::init_database;
use chronicle_server::services::billing::{BillingProvider, StripeClient, UnconfiguredBilling};
use chronicle_server::services::catalog;
use chronicle_server::{build_router, AppState, ServerSettings};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for chronicle-server
#[derive(Parser, Debug)]
#[command(name = "chronicle-server")]
#[command(about = "History lessons and social feed API")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "CHRONICLE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "CHRONICLE_PORT")]
    port: Option<u16>,

    /// SQLite database file (overrides config)
    #[arg(short, long, env = "CHRONICLE_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Load lessons from a JSON array file, skipping existing titles
    Seed {
        /// Path to the lesson file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        config::load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=debug", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Chronicle (chronicle-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::Seed { file } => seed(&file, &pool).await,
    }
}

async fn serve(config: TomlConfig, pool: sqlx::SqlitePool) -> Result<()> {
    let billing: Arc<dyn BillingProvider> = match StripeClient::from_config(&config.billing) {
        Ok(client) => {
            info!("Billing client configured for {}", config.billing.api_base);
            Arc::new(client)
        }
        Err(e) => {
            warn!("Billing disabled: {}", e);
            Arc::new(UnconfiguredBilling)
        }
    };

    if config.billing.webhook_secret.is_none() {
        warn!("No webhook secret configured; billing webhooks will be rejected");
    }

    let settings = ServerSettings::from_config(&config).context("Invalid session settings")?;
    let app = build_router(AppState::new(pool, billing, settings));

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("chronicle-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn seed(file: &std::path::Path, pool: &sqlx::SqlitePool) -> Result<()> {
    let body = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let lessons = catalog::parse_seed(&body)
        .with_context(|| format!("Invalid lesson file {}", file.display()))?;
    let report = catalog::seed_lessons(pool, lessons)
        .await
        .context("Seeding failed")?;

    info!(
        "Seed complete: {} inserted, {} skipped",
        report.inserted, report.skipped
    );
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
