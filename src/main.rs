//! Recipe API server
//! Registration, login, and role-gated routes over HTTP

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use recipe_auth_api::{App, AppConfig, ServerArgs};
use std::path::Path;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let config = AppConfig::try_from(ServerArgs::parse()).context("Invalid configuration")?;
    info!(?config, "Starting recipe API");

    let app = App::from_config(&config)
        .with_context(|| format!("Failed to open user store at {}", config.db_path))?;
    info!("User store initialized at: {}", config.db_path);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(listener, app.router())
        .await
        .context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_auth_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root when run from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
