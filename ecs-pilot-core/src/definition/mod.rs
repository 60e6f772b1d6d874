//! Task definition construction
//!
//! Builds a single-container `RegisterTaskDefinition` request from the flat
//! settings a CI step provides.

pub mod parse;

use std::collections::HashMap;

use aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionInput;
use aws_sdk_ecs::operation::register_task_definition::builders::RegisterTaskDefinitionInputBuilder;
use aws_sdk_ecs::types::{
    Compatibility, ContainerDefinition, HealthCheck, LogConfiguration, LogDriver, NetworkMode,
};
use tracing::debug;

use crate::error::ConfigError;

/// Memory reservation (MiB) used when neither memory limit is configured
pub const DEFAULT_MEMORY_RESERVATION: i32 = 128;

/// Network mode used when none is configured
pub const DEFAULT_NETWORK_MODE: &str = "bridge";

/// Container health check settings
#[derive(Debug, Clone, Default)]
pub struct HealthCheckSpec {
    pub command: Vec<String>,
    pub interval: i32,
    pub retries: i32,
    pub timeout: i32,
    /// Zero leaves the ECS default in place
    pub start_period: i32,
}

/// Everything needed to register a task definition
///
/// List fields hold unparsed entries in the formats described in
/// [`parse`]. Empty strings and zero numbers mean "not configured".
#[derive(Debug, Clone, Default)]
pub struct TaskDefinitionSpec {
    pub family: String,
    pub container_name: String,
    pub docker_image: String,
    pub tag: String,
    pub task_role_arn: String,
    pub execution_role_arn: String,
    pub network_mode: String,
    pub compatibilities: String,
    pub task_cpu: String,
    pub task_memory: String,
    pub cpu: i32,
    pub memory: i32,
    pub memory_reservation: i32,
    pub privileged: bool,
    pub entry_point: Vec<String>,
    pub command: Vec<String>,
    pub environment: Vec<String>,
    pub secret_environment: Vec<String>,
    pub secrets_manager_environment: Vec<String>,
    pub labels: Vec<String>,
    pub port_mappings: Vec<String>,
    pub ulimits: Vec<String>,
    pub mount_points: Vec<String>,
    pub volumes: Vec<String>,
    pub efs_volumes: Vec<String>,
    pub log_driver: String,
    pub log_options: Vec<String>,
    pub placement_constraints: String,
    pub health_check: Option<HealthCheckSpec>,
}

impl TaskDefinitionSpec {
    /// Container name, defaulting to `<family>-container`
    pub fn effective_container_name(&self) -> String {
        if self.container_name.is_empty() {
            format!("{}-container", self.family)
        } else {
            self.container_name.clone()
        }
    }

    /// Full image reference, defaulting the tag to `latest`
    pub fn image(&self) -> String {
        let tag = if self.tag.is_empty() { "latest" } else { &self.tag };
        format!("{}:{}", self.docker_image, tag)
    }

    pub fn effective_network_mode(&self) -> &str {
        if self.network_mode.is_empty() {
            DEFAULT_NETWORK_MODE
        } else {
            &self.network_mode
        }
    }

    /// Whether the definition targets Fargate
    pub fn is_fargate(&self) -> bool {
        parse::parse_compatibilities(&self.compatibilities).contains(&Compatibility::Fargate)
    }

    /// Builds the container definition
    ///
    /// `lookup` resolves the source variables of secret environment entries.
    pub fn container_definition<F>(&self, lookup: F) -> Result<ContainerDefinition, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Fargate rejects privileged containers
        let privileged = self.privileged && !self.is_fargate();

        let mut container = ContainerDefinition::builder()
            .name(self.effective_container_name())
            .image(self.image())
            .essential(true)
            .privileged(privileged)
            .set_entry_point(Some(self.entry_point.clone()))
            .set_command(Some(self.command.clone()));

        if self.cpu != 0 {
            container = container.cpu(self.cpu);
        }

        if self.memory == 0 && self.memory_reservation == 0 {
            container = container.memory_reservation(DEFAULT_MEMORY_RESERVATION);
        } else {
            if self.memory != 0 {
                container = container.memory(self.memory);
            }
            if self.memory_reservation != 0 {
                container = container.memory_reservation(self.memory_reservation);
            }
        }

        for entry in &self.mount_points {
            container = container.mount_points(parse::parse_mount_point(entry)?);
        }

        for entry in &self.port_mappings {
            container = container.port_mappings(parse::parse_port_mapping(entry)?);
        }

        for entry in &self.environment {
            container = container.environment(parse::parse_environment(entry)?);
        }

        for entry in &self.secret_environment {
            container = container.environment(parse::parse_secret_environment(entry, &lookup));
        }

        for entry in &self.secrets_manager_environment {
            container = container.secrets(parse::parse_secrets_manager(entry)?);
        }

        for entry in &self.ulimits {
            container = container.ulimits(parse::parse_ulimit(entry)?);
        }

        for entry in &self.labels {
            let (key, value) = parse::parse_key_value("labels", entry)?;
            container = container.docker_labels(key, value);
        }

        if !self.log_driver.is_empty() {
            let options = self
                .log_options
                .iter()
                .map(|entry| parse::parse_key_value("log_options", entry))
                .collect::<Result<HashMap<_, _>, _>>()?;

            let log_configuration = LogConfiguration::builder()
                .log_driver(LogDriver::from(self.log_driver.as_str()))
                .set_options((!options.is_empty()).then_some(options))
                .build()?;
            container = container.log_configuration(log_configuration);
        }

        if let Some(check) = self.health_check.as_ref().filter(|c| !c.command.is_empty()) {
            let mut health_check = HealthCheck::builder()
                .set_command(Some(check.command.clone()))
                .interval(check.interval)
                .retries(check.retries)
                .timeout(check.timeout);
            if check.start_period != 0 {
                health_check = health_check.start_period(check.start_period);
            }
            container = container.health_check(health_check.build()?);
        }

        Ok(container.build())
    }

    /// Builds the full `RegisterTaskDefinition` request
    pub fn register_request<F>(
        &self,
        lookup: F,
    ) -> Result<RegisterTaskDefinitionInputBuilder, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.family.is_empty() {
            return Err(ConfigError::Missing("family"));
        }

        let container = self.container_definition(lookup)?;

        let mut request = RegisterTaskDefinitionInput::builder()
            .family(&self.family)
            .container_definitions(container)
            .network_mode(NetworkMode::from(self.effective_network_mode()));

        for entry in &self.volumes {
            request = request.volumes(parse::parse_volume(entry));
        }

        for entry in &self.efs_volumes {
            request = request.volumes(parse::parse_efs_volume(entry)?);
        }

        let compatibilities = parse::parse_compatibilities(&self.compatibilities);
        if !compatibilities.is_empty() {
            request = request.set_requires_compatibilities(Some(compatibilities));
        }

        if !self.placement_constraints.trim().is_empty() {
            let constraints = parse::parse_placement_constraints(&self.placement_constraints)?;
            if !constraints.is_empty() {
                request = request.set_placement_constraints(Some(constraints));
            }
        }

        if !self.task_role_arn.is_empty() {
            request = request.task_role_arn(&self.task_role_arn);
        }

        if !self.task_cpu.is_empty() {
            request = request.cpu(&self.task_cpu);
        }

        if !self.task_memory.is_empty() {
            request = request.memory(&self.task_memory);
        }

        if !self.execution_role_arn.is_empty() {
            request = request.execution_role_arn(&self.execution_role_arn);
        }

        debug!(
            "Built task definition request for family {} (image {})",
            self.family,
            self.image()
        );

        Ok(request)
    }
}
