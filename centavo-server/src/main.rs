use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod pipeline;
mod reconcile;
mod routes;
mod state;
#[cfg(test)]
mod testutil;

/// Bank notification → ledger pipeline server.
#[derive(Parser, Debug)]
#[command(name = "centavo", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "centavo.toml")]
    config: PathBuf,

    /// Override the [server] bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::Config::load(&cli.config)?;
    let bind = cli.bind.unwrap_or_else(|| cfg.server.bind.clone());

    let state = Arc::new(state::AppState::from_config(&cfg));
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, "listening");
    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
