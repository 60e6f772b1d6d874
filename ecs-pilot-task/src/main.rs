//! ECS Pilot standalone task runner
//!
//! A CI plugin that runs one-off ECS tasks (migrations, batch jobs) and
//! reports their outcome through its exit code.
//!
//! Architecture:
//! - Configuration: flags or `PLUGIN_*` environment variables
//! - Services: task definition registration and task launch
//! - Scheduler: status polling with timeout handling
//! - Execution: ties the steps together and judges exit codes
//!
//! The runner registers a task definition (or reuses an existing one),
//! starts the requested number of tasks and polls them until they stop.
//! Any failed container fails the step.

mod config;
mod error;
mod execution;
mod scheduler;
mod service;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::execution::TaskRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecs_pilot_task=info,ecs_pilot_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ECS Pilot task runner");

    let config = load_config()?;
    info!(
        "Loaded configuration: cluster={}, region={}, desired_count={}",
        config.cluster, config.region, config.desired_count
    );

    let ecs = Arc::new(ecs_pilot_client::connect(&config.connection()).await);
    info!("ECS client initialized");

    let runner = TaskRunner::new(ecs, &config);
    if let Err(e) = runner.run().await {
        error!("Run failed: {}", e);
        return Err(e.into());
    }

    info!("Run finished successfully");
    Ok(())
}

/// Parses flags and environment, then validates the result
fn load_config() -> Result<Config> {
    let config = Config::parse();
    config.validate()?;
    Ok(config)
}
