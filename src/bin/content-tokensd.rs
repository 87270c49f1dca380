//! Content tokens daemon - HTTP token service

use anyhow::{Context, Result};
use clap::Parser;
use content_tokens::auth::AccessKey;
use content_tokens::config::{parse_header_name, ServiceConfig};
use content_tokens::issuer::SelectionRule;
use content_tokens::server::run_http_server;
use content_tokens::storage::{PostgresConfig, DEFAULT_DATABASE_ID};
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "content-tokensd")]
#[command(about = "Content token HTTP daemon")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "CONTENT_TOKENS_BIND")]
    bind: String,

    /// Database URL (store endpoint)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Store access key, used to sign tokens
    #[arg(long, env = "CONTENT_STORE_KEY", hide_env_values = true)]
    store_key: Option<String>,

    /// Database namespace for collections and users
    #[arg(long, env = "CONTENT_DATABASE_ID", default_value = DEFAULT_DATABASE_ID)]
    database_id: String,

    /// Header carrying the verified user id
    #[arg(long, env = "CONTENT_IDENTITY_HEADER", default_value = "x-authenticated-user")]
    identity_header: String,

    /// Token selection rule: first or matching-slot
    #[arg(long, env = "CONTENT_SELECTION", default_value = "first")]
    selection: SelectionRule,

    /// PID file path, removed on shutdown
    #[arg(long, env = "CONTENT_TOKENS_PIDFILE")]
    pidfile: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Removed when dropped, on error paths too
    let _pidfile = args.pidfile.as_deref().map(PidFile::create).transpose()?;

    run_server(args).await
}

/// Pid file that is deleted when dropped
struct PidFile(PathBuf);

impl PidFile {
    fn create(path: &Path) -> Result<Self> {
        std::fs::write(path, format!("{}\n", std::process::id()))
            .with_context(|| format!("Failed to create pidfile: {:?}", path))?;
        Ok(Self(path.to_path_buf()))
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            warn!(error = %e, "Failed to remove pidfile");
        }
    }
}

async fn run_server(args: Args) -> Result<()> {
    let bind_addr = args.bind.parse().context("Invalid bind address")?;

    // A missing or bad store endpoint or key is reported by token requests
    let db_config = args.database_url.as_deref().and_then(|url| {
        let parsed = PostgresConfig::from_url(url);
        if parsed.is_none() {
            warn!("DATABASE_URL is not a postgres url");
        }
        parsed
    });

    let mut config =
        ServiceConfig::new(bind_addr, db_config, args.store_key.map(AccessKey::new));
    config.database_id = args.database_id;
    config.identity_header =
        parse_header_name(&args.identity_header).map_err(|e| anyhow::anyhow!(e))?;
    config.selection = args.selection;

    // One store handle for the life of the process
    let state = config.http_state(config.service_store().await);

    info!(
        addr = %args.bind,
        database_id = %config.database_id,
        selection = %config.selection,
        "Content token daemon starting"
    );

    run_http_server(config.bind_addr, state, async {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping server");
    })
    .await?;

    info!("Content token daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
