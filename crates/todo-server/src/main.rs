//! Todo Server Binary
//!
//! Reads an optional TOML config from `TODO_CONFIG`; `TODO_ADDR` overrides
//! the listen address.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use todo_core::TodoConfig;
use todo_server::{serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("TODO_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)?;
            tracing::info!("Loaded config from {}", path);
            TodoConfig::from_toml(&text)?
        }
        Err(_) => TodoConfig::default(),
    };
    let addr = std::env::var("TODO_ADDR").unwrap_or(config.server.addr);

    let state = Arc::new(AppState::new());
    serve(&addr, state).await
}
