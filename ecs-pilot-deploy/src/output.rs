//! Terminal output
//!
//! Prints the result of a deployment for the CI log.

use aws_sdk_ecs::types::{Deployment, Service};
use colored::*;

use crate::deploy::{DeployOutcome, DeployReport};

/// Print the deployment result and the updated service
pub fn print_report(report: &DeployReport) {
    match &report.outcome {
        DeployOutcome::ForcedDeployment => {
            println!("{}", "✓ Forced new deployment".green().bold());
        }
        DeployOutcome::NewRevision {
            task_definition_arn,
            revision,
        } => {
            println!(
                "{}",
                format!("✓ Registered task definition revision {}", revision)
                    .green()
                    .bold()
            );
            println!("  {}", task_definition_arn.dimmed());
        }
    }
    println!();

    match &report.service {
        Some(service) => print_service_details(service),
        None => println!("{}", "No service details returned.".yellow()),
    }
}

/// Print detailed service information
fn print_service_details(service: &Service) {
    println!("{}", "Updated Service:".bold());
    println!(
        "  Name:            {}",
        service.service_name().unwrap_or_default().cyan()
    );
    if let Some(arn) = service.service_arn() {
        println!("  ARN:             {}", arn.dimmed());
    }
    if let Some(status) = service.status() {
        println!("  Status:          {}", colorize_status(status));
    }
    println!(
        "  Task definition: {}",
        service.task_definition().unwrap_or_default()
    );
    println!(
        "  Tasks:           {} desired, {} running, {} pending",
        service.desired_count(),
        service.running_count(),
        service.pending_count()
    );

    if !service.deployments().is_empty() {
        println!("\n{}", "Deployments:".bold());
        for deployment in service.deployments() {
            print_deployment(deployment);
        }
    }
}

fn print_deployment(deployment: &Deployment) {
    println!(
        "  {} {} {}",
        "▸".cyan(),
        colorize_status(deployment.status().unwrap_or("UNKNOWN")),
        deployment.id().unwrap_or_default().dimmed()
    );
    println!(
        "    Task definition: {}",
        deployment.task_definition().unwrap_or_default()
    );
    println!(
        "    Tasks:           {} desired, {} running",
        deployment.desired_count(),
        deployment.running_count()
    );
    if let Some(rollout) = deployment.rollout_state() {
        println!("    Rollout:         {}", rollout.as_str());
    }
}

/// Colorize service or deployment status for display
fn colorize_status(status: &str) -> ColoredString {
    match status {
        "ACTIVE" | "PRIMARY" => status.green(),
        "DRAINING" | "ACTIVE_DEPLOYMENT" => status.yellow(),
        "INACTIVE" => status.dimmed(),
        _ => status.normal(),
    }
}
