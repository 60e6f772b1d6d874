//! ECS Pilot void
//!
//! Minimal HTTP service that keeps an ECS container healthy: it answers
//! `GET /{uri}` with 200 and does nothing else.

mod api;
mod config;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecs_pilot_void=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    tracing::info!("listening on port: {}", config.port);
    tracing::info!("HealthCheck URI: {}", api::probe_path(&config.uri));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    api::serve(listener, &config.uri)
        .await
        .context("Failed to start server")
}
