//! Nation Wars - command server
//!
//! Reads newline-delimited JSON commands from stdin and writes one JSON
//! response per line to stdout.
//!
//! Environment:
//! - `NATION_WARS_CONFIG`: balance file (default `config/balance.json`)
//! - `NATION_WARS_DB`: SQLite database path (in-memory when unset)
//! - `NATION_WARS_CONFIG_MAX_AGE_SECS`: config refresh interval (default 60)
//! - `RUST_LOG`: log filter (default `info`)

use nation_wars_server::{FileConfigProvider, WarService};
use nation_wars_store::SqliteStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::prelude::*;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] nation_wars_core::ConfigError),
    #[error(transparent)]
    Store(#[from] nation_wars_store::StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // Logs go to stderr; stdout carries responses.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path =
        std::env::var("NATION_WARS_CONFIG").unwrap_or_else(|_| "config/balance.json".to_string());
    let max_age = std::env::var("NATION_WARS_CONFIG_MAX_AGE_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(60));
    let config = FileConfigProvider::open(config_path, max_age)?;

    let store = match std::env::var("NATION_WARS_DB") {
        Ok(path) => {
            tracing::info!(path = %path, "Opening SQLite store");
            SqliteStore::open(path)?
        }
        Err(_) => {
            tracing::warn!("NATION_WARS_DB not set - using an in-memory database");
            SqliteStore::new_in_memory()?
        }
    };

    let service = WarService::new(store, Arc::new(config));
    tracing::info!("Nation Wars server ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = service.handle_line(&line).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
