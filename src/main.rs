//! bookshelf — book catalog HTTP server.

use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result};

use bookshelf::catalog::BookCatalog;
use bookshelf::config::ServerConfig;
use bookshelf::image::ImageStore;

#[derive(Parser)]
#[command(name = "bookshelf", version, about = "Personal book catalog HTTP API")]
struct Cli {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind to (env: BIND).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (env: PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Book collection file (env: DB).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Label list file (env: DB_LABEL).
    #[arg(long)]
    db_label: Option<PathBuf>,

    /// Directory for uploaded cover images (env: IMAGE_DIR).
    #[arg(long)]
    image_dir: Option<PathBuf>,
}

impl Cli {
    fn resolve_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        config.apply_env()?;

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(db) = self.db {
            config.db = db;
        }
        if let Some(db_label) = self.db_label {
            config.db_label = db_label;
        }
        if let Some(image_dir) = self.image_dir {
            config.image_dir = image_dir;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Cli::parse().resolve_config()?;
    tracing::debug!(?config, "configuration resolved");

    let catalog = BookCatalog::open(
        &config.db,
        &config.db_label,
        ImageStore::new(&config.image_dir),
    )?;
    let app = bookshelf::server::router(catalog);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.into_diagnostic()?;
    bookshelf::server::log_endpoints(&addr);

    // Serve with graceful shutdown on SIGTERM/SIGINT.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    tracing::info!("book catalog stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("book catalog shutting down");
}
