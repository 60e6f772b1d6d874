//! Plugin configuration
//!
//! Every setting can be given as a flag or through the `PLUGIN_*`
//! environment variables a CI system sets for plugin steps. List settings
//! are comma separated.

use std::time::Duration;

use clap::Parser;
use clap::builder::BoolishValueParser;
use ecs_pilot_client::ConnectionSettings;
use ecs_pilot_core::definition::{HealthCheckSpec, TaskDefinitionSpec};
use ecs_pilot_core::domain::status::WaitMode;

use crate::scheduler::WatchSettings;
use crate::service::{LaunchSettings, TaskDefinitionSource};

/// Standalone ECS task plugin configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "ecs-pilot-task")]
#[command(about = "Run standalone ECS tasks to completion", long_about = None)]
pub struct Config {
    // AWS session
    /// AWS access key
    #[arg(long, short = 'a', env = "PLUGIN_ACCESS_KEY")]
    pub access_key: Option<String>,

    /// AWS secret key
    #[arg(long, short = 'k', env = "PLUGIN_SECRET_KEY")]
    pub secret_key: Option<String>,

    /// AWS role to assume
    #[arg(long, env = "PLUGIN_USER_ROLE_ARN")]
    pub user_role_arn: Option<String>,

    /// AWS region
    #[arg(long, short = 'r', env = "PLUGIN_REGION", default_value = "eu-west-1")]
    pub region: String,

    // Task definition
    /// Task definition family
    #[arg(long, short = 'f', env = "PLUGIN_FAMILY", default_value = "")]
    pub family: String,

    #[arg(long, env = "PLUGIN_TASK_ROLE_ARN", default_value = "")]
    pub task_role_arn: String,

    /// Container name (defaults to `<family>-container`)
    #[arg(long, short = 'n', env = "PLUGIN_CONTAINER_NAME", default_value = "")]
    pub container_name: String,

    #[arg(long, short = 'i', env = "PLUGIN_DOCKER_IMAGE", default_value = "")]
    pub docker_image: String,

    /// Image tag (defaults to `latest`)
    #[arg(long, short = 't', env = "PLUGIN_TAG", default_value = "")]
    pub tag: String,

    #[arg(long, env = "PLUGIN_LOG_DRIVER", default_value = "")]
    pub log_driver: String,

    /// Log driver options, `key=value`
    #[arg(long, env = "PLUGIN_LOG_OPTIONS", value_delimiter = ',')]
    pub log_options: Vec<String>,

    /// Port mappings, `host_port container_port`
    #[arg(long, env = "PLUGIN_PORT_MAPPINGS", value_delimiter = ',')]
    pub port_mappings: Vec<String>,

    /// Environment variables, `NAME=value`
    #[arg(long, env = "PLUGIN_ENVIRONMENT_VARIABLES", value_delimiter = ',')]
    pub environment_variables: Vec<String>,

    /// Environment variables copied from the plugin environment, `NAME=SOURCE` or `NAME`
    #[arg(long, env = "PLUGIN_SECRET_ENVIRONMENT_VARIABLES", value_delimiter = ',')]
    pub secret_environment_variables: Vec<String>,

    /// Secrets Manager environment variables, `NAME=secret_arn`
    #[arg(long, env = "PLUGIN_SECRETS_MANAGER_ENVIRONMENT_VARIABLES", value_delimiter = ',')]
    pub secrets_manager_environment_variables: Vec<String>,

    /// Docker labels, `key=value`
    #[arg(long, env = "PLUGIN_LABELS", value_delimiter = ',')]
    pub labels: Vec<String>,

    #[arg(long, env = "PLUGIN_ENTRY_POINT", value_delimiter = ',')]
    pub entry_point: Vec<String>,

    #[arg(long, env = "PLUGIN_COMMAND", value_delimiter = ',')]
    pub command: Vec<String>,

    /// Container CPU units
    #[arg(long, env = "PLUGIN_CPU", default_value_t = 0)]
    pub cpu: i32,

    /// Container hard memory limit (MiB)
    #[arg(long, env = "PLUGIN_MEMORY", default_value_t = 0)]
    pub memory: i32,

    /// Container soft memory limit (MiB)
    #[arg(long, env = "PLUGIN_MEMORY_RESERVATION", default_value_t = 0)]
    pub memory_reservation: i32,

    /// Network mode (defaults to `bridge`)
    #[arg(long, env = "PLUGIN_NETWORK_MODE", default_value = "")]
    pub network_mode: String,

    /// Task level CPU, e.g. `256` or `1 vCPU`
    #[arg(long, env = "PLUGIN_TASK_CPU", default_value = "")]
    pub task_cpu: String,

    /// Task level memory, e.g. `512` or `1 GB`
    #[arg(long, env = "PLUGIN_TASK_MEMORY", default_value = "")]
    pub task_memory: String,

    #[arg(long, env = "PLUGIN_TASK_EXECUTION_ROLE_ARN", default_value = "")]
    pub task_execution_role_arn: String,

    /// Space separated launch compatibilities, e.g. `FARGATE`
    #[arg(long, env = "PLUGIN_COMPATIBILITIES", default_value = "")]
    pub compatibilities: String,

    #[arg(long, env = "PLUGIN_HEALTHCHECK_COMMAND", value_delimiter = ',')]
    pub healthcheck_command: Vec<String>,

    #[arg(long, env = "PLUGIN_HEALTHCHECK_INTERVAL", default_value_t = 30)]
    pub healthcheck_interval: i32,

    #[arg(long, env = "PLUGIN_HEALTHCHECK_RETRIES", default_value_t = 3)]
    pub healthcheck_retries: i32,

    #[arg(long, env = "PLUGIN_HEALTHCHECK_START_PERIOD", default_value_t = 0)]
    pub healthcheck_start_period: i32,

    #[arg(long, env = "PLUGIN_HEALTHCHECK_TIMEOUT", default_value_t = 5)]
    pub healthcheck_timeout: i32,

    /// Ulimits, `name soft_limit hard_limit`
    #[arg(long, env = "PLUGIN_ULIMITS", value_delimiter = ',')]
    pub ulimits: Vec<String>,

    /// Mount points, `source_volume container_path read_only`
    #[arg(long, env = "PLUGIN_MOUNT_POINTS", value_delimiter = ',')]
    pub mount_points: Vec<String>,

    /// Volumes, `name [source_path]`
    #[arg(long, env = "PLUGIN_VOLUMES", value_delimiter = ',')]
    pub volumes: Vec<String>,

    /// EFS volumes, `name file_system_id root_directory`
    #[arg(long, env = "PLUGIN_EFS_VOLUMES", value_delimiter = ',')]
    pub efs_volumes: Vec<String>,

    /// JSON array of `{"type": ..., "expression": ...}`
    #[arg(long, env = "PLUGIN_PLACEMENT_CONSTRAINTS", default_value = "")]
    pub placement_constraints: String,

    #[arg(long, env = "PLUGIN_PRIVILEGED", value_parser = BoolishValueParser::new())]
    pub privileged: bool,

    /// Run an already registered task definition instead of registering one
    #[arg(long, env = "PLUGIN_USE_EXISTING_TASK_DEFINITION", value_parser = BoolishValueParser::new())]
    pub use_existing_task_definition: bool,

    #[arg(long, env = "PLUGIN_EXISTING_TASK_DEFINITION_ARN", default_value = "")]
    pub existing_task_definition_arn: String,

    // Run task
    #[arg(long, short = 'c', env = "PLUGIN_CLUSTER", default_value = "")]
    pub cluster: String,

    /// Number of tasks to start
    #[arg(long, short = 'd', env = "PLUGIN_DESIRED_COUNT", default_value_t = 1)]
    pub desired_count: i32,

    /// `ENABLED` or `DISABLED` (awsvpc only)
    #[arg(long, env = "PLUGIN_SERVICE_NETWORK_ASSIGN_PUBLIC_IP", default_value = "")]
    pub service_network_assign_public_ip: String,

    #[arg(long, env = "PLUGIN_SERVICE_NETWORK_SECURITY_GROUPS", value_delimiter = ',')]
    pub service_network_security_groups: Vec<String>,

    #[arg(long, env = "PLUGIN_SERVICE_NETWORK_SUBNETS", value_delimiter = ',')]
    pub service_network_subnets: Vec<String>,

    /// Capacity provider strategy, `base weight capacity_provider`
    #[arg(long, env = "PLUGIN_CAPACITY_PROVIDERS", value_delimiter = ',')]
    pub capacity_providers: Vec<String>,

    #[arg(long, env = "PLUGIN_ENABLE_EXECUTE_COMMAND", value_parser = BoolishValueParser::new())]
    pub enable_execute_command: bool,

    /// Fargate platform version
    #[arg(long, env = "PLUGIN_PLATFORM_VERSION", default_value = "")]
    pub platform_version: String,

    /// Propagate task definition tags to the tasks
    #[arg(long, env = "PLUGIN_PROPAGATE_TAGS", value_parser = BoolishValueParser::new())]
    pub propagate_tags: bool,

    // Watching
    /// Return once all tasks are running instead of waiting for them to stop
    #[arg(long, env = "PLUGIN_DONT_WAIT", value_parser = BoolishValueParser::new())]
    pub dont_wait: bool,

    /// Succeed regardless of container exit codes
    #[arg(long, env = "PLUGIN_IGNORE_EXECUTION_FAIL", value_parser = BoolishValueParser::new())]
    pub ignore_execution_fail: bool,

    /// Seconds to wait before giving up on the tasks
    #[arg(long, env = "PLUGIN_TASK_TIMEOUT", default_value_t = 600)]
    pub task_timeout: u64,

    /// Stop the tasks when the timeout is reached
    #[arg(long, env = "PLUGIN_TASK_KILL_ON_TIMEOUT", value_parser = BoolishValueParser::new())]
    pub task_kill_on_timeout: bool,

    /// Milliseconds between status polls
    #[arg(long, env = "PLUGIN_POLL_INTERVAL", default_value_t = 200)]
    pub poll_interval: u64,
}

/// Drops blank list entries (an empty variable still yields one entry)
fn entries(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .collect()
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cluster.is_empty() {
            anyhow::bail!("cluster cannot be empty");
        }

        if self.use_existing_task_definition {
            if self.existing_task_definition_arn.is_empty() {
                anyhow::bail!(
                    "If you want to use existing task definition, proper ARN must be provided as 'existing-task-definition-arn'."
                );
            }
        } else {
            if self.family.is_empty() {
                anyhow::bail!("family cannot be empty");
            }
            if self.docker_image.is_empty() {
                anyhow::bail!("docker_image cannot be empty");
            }
        }

        if self.desired_count < 1 {
            anyhow::bail!("desired_count must be at least 1");
        }

        if self.poll_interval == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        Ok(())
    }

    pub fn connection(&self) -> ConnectionSettings {
        ConnectionSettings {
            region: self.region.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            user_role_arn: self.user_role_arn.clone(),
        }
        .with_env_fallbacks()
    }

    pub fn task_definition_spec(&self) -> TaskDefinitionSpec {
        let health_check = entries(&self.healthcheck_command);

        TaskDefinitionSpec {
            family: self.family.clone(),
            container_name: self.container_name.clone(),
            docker_image: self.docker_image.clone(),
            tag: self.tag.clone(),
            task_role_arn: self.task_role_arn.clone(),
            execution_role_arn: self.task_execution_role_arn.clone(),
            network_mode: self.network_mode.clone(),
            compatibilities: self.compatibilities.clone(),
            task_cpu: self.task_cpu.clone(),
            task_memory: self.task_memory.clone(),
            cpu: self.cpu,
            memory: self.memory,
            memory_reservation: self.memory_reservation,
            privileged: self.privileged,
            entry_point: entries(&self.entry_point),
            command: entries(&self.command),
            environment: entries(&self.environment_variables),
            secret_environment: entries(&self.secret_environment_variables),
            secrets_manager_environment: entries(&self.secrets_manager_environment_variables),
            labels: entries(&self.labels),
            port_mappings: entries(&self.port_mappings),
            ulimits: entries(&self.ulimits),
            mount_points: entries(&self.mount_points),
            volumes: entries(&self.volumes),
            efs_volumes: entries(&self.efs_volumes),
            log_driver: self.log_driver.clone(),
            log_options: entries(&self.log_options),
            placement_constraints: self.placement_constraints.clone(),
            health_check: (!health_check.is_empty()).then(|| HealthCheckSpec {
                command: health_check,
                interval: self.healthcheck_interval,
                retries: self.healthcheck_retries,
                timeout: self.healthcheck_timeout,
                start_period: self.healthcheck_start_period,
            }),
        }
    }

    pub fn task_definition_source(&self) -> TaskDefinitionSource {
        if self.use_existing_task_definition {
            TaskDefinitionSource::Existing(self.existing_task_definition_arn.clone())
        } else {
            TaskDefinitionSource::Register(Box::new(self.task_definition_spec()))
        }
    }

    pub fn launch_settings(&self) -> LaunchSettings {
        LaunchSettings {
            cluster: self.cluster.clone(),
            group: self.family.clone(),
            desired_count: self.desired_count,
            compatibilities: self.compatibilities.clone(),
            network_mode: self.network_mode.clone(),
            assign_public_ip: self.service_network_assign_public_ip.clone(),
            subnets: entries(&self.service_network_subnets),
            security_groups: entries(&self.service_network_security_groups),
            capacity_providers: entries(&self.capacity_providers),
            platform_version: self.platform_version.clone(),
            propagate_tags: self.propagate_tags,
            enable_execute_command: self.enable_execute_command,
        }
    }

    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            cluster: self.cluster.clone(),
            mode: WaitMode::from_dont_wait(self.dont_wait),
            timeout: Duration::from_secs(self.task_timeout),
            kill_on_timeout: self.task_kill_on_timeout,
            poll_interval: Duration::from_millis(self.poll_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["ecs-pilot-task"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[
            "--cluster",
            "ci",
            "--family",
            "migrate",
            "--docker-image",
            "acme/migrate",
        ]);

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.desired_count, 1);
        assert_eq!(config.task_timeout, 600);
        assert_eq!(config.poll_interval, 200);
        assert!(!config.dont_wait);
        assert!(config.validate().is_ok());

        let watch = config.watch_settings();
        assert_eq!(watch.mode, WaitMode::UntilStopped);
        assert_eq!(watch.poll_interval, Duration::from_millis(200));
    }

    #[test]
    fn test_config_validation() {
        let mut config = parse(&["--family", "migrate", "--docker-image", "acme/migrate"]);

        // Missing cluster should fail
        assert!(config.validate().is_err());

        config.cluster = "ci".to_string();
        assert!(config.validate().is_ok());

        // Reusing a task definition needs its ARN
        config.use_existing_task_definition = true;
        assert!(config.validate().is_err());

        config.existing_task_definition_arn =
            "arn:aws:ecs:eu-west-1:1:task-definition/migrate:3".to_string();
        config.family = String::new();
        assert!(config.validate().is_ok());

        config.desired_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_list_settings_are_comma_separated() {
        let config = parse(&[
            "--cluster",
            "ci",
            "--port-mappings",
            "8080 80,8443 443",
            "--environment-variables",
            "A=1,B=2",
            "--command",
            "npm,run,migrate",
        ]);

        let spec = config.task_definition_spec();
        assert_eq!(spec.port_mappings, vec!["8080 80", "8443 443"]);
        assert_eq!(spec.environment, vec!["A=1", "B=2"]);
        assert_eq!(spec.command, vec!["npm", "run", "migrate"]);
    }

    #[test]
    fn test_health_check_only_with_command() {
        let config = parse(&["--cluster", "ci"]);
        assert!(config.task_definition_spec().health_check.is_none());

        let config = parse(&[
            "--cluster",
            "ci",
            "--healthcheck-command",
            "CMD-SHELL,curl -f http://localhost/ || exit 1",
        ]);
        let check = config.task_definition_spec().health_check.unwrap();
        assert_eq!(check.command.len(), 2);
        assert_eq!(check.interval, 30);
        assert_eq!(check.retries, 3);
        assert_eq!(check.timeout, 5);
    }

    #[test]
    fn test_task_definition_source() {
        let config = parse(&[
            "--cluster",
            "ci",
            "--use-existing-task-definition",
            "--existing-task-definition-arn",
            "arn:td/1",
        ]);
        assert!(matches!(
            config.task_definition_source(),
            TaskDefinitionSource::Existing(arn) if arn == "arn:td/1"
        ));
    }

    #[test]
    fn test_bool_env_accepts_short_spellings() {
        // No other test reads PLUGIN_PROPAGATE_TAGS
        for (value, expected) in [("1", true), ("t", true), ("TRUE", true), ("0", false), ("f", false)] {
            unsafe { std::env::set_var("PLUGIN_PROPAGATE_TAGS", value) };
            let config = Config::try_parse_from(["ecs-pilot-task", "--cluster", "ci"]);
            unsafe { std::env::remove_var("PLUGIN_PROPAGATE_TAGS") };

            assert_eq!(config.unwrap().propagate_tags, expected, "{}", value);
        }
    }

    #[test]
    fn test_dont_wait_switches_wait_mode() {
        let config = parse(&["--cluster", "ci", "--dont-wait", "--task-kill-on-timeout"]);
        let watch = config.watch_settings();
        assert_eq!(watch.mode, WaitMode::UntilStarted);
        assert!(watch.kill_on_timeout);
    }
}
