//! ECS Pilot deploy
//!
//! CI plugin that rolls a new container image out to an ECS service.

mod config;
mod deploy;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::deploy::Deployer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecs_pilot_deploy=info,ecs_pilot_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("ECS Pilot task definition updater");

    let config = Config::parse();
    config.validate()?;

    let ecs = Arc::new(ecs_pilot_client::connect(&config.connection()).await);
    let deployer = Deployer::new(ecs, config.deploy_settings());

    let report = deployer
        .deploy()
        .await
        .with_context(|| format!("Failed to update service {}", config.service))?;

    output::print_report(&report);
    Ok(())
}
