//! Task launch

use aws_sdk_ecs::operation::run_task::RunTaskInput;
use aws_sdk_ecs::operation::run_task::builders::RunTaskInputBuilder;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, Compatibility, LaunchType, NetworkConfiguration,
    PropagateTags,
};
use ecs_pilot_client::EcsApi;
use ecs_pilot_core::ConfigError;
use ecs_pilot_core::definition::parse::{parse_capacity_provider, parse_compatibilities};
use tracing::{error, info};

use crate::error::RunError;

/// Settings for the `RunTask` request
#[derive(Debug, Clone, Default)]
pub struct LaunchSettings {
    pub cluster: String,
    /// Task group, the task definition family
    pub group: String,
    pub desired_count: i32,
    /// Space separated compatibilities; the first one is the launch type
    pub compatibilities: String,
    pub network_mode: String,
    pub assign_public_ip: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    /// Strategy entries, `base weight capacity_provider`
    pub capacity_providers: Vec<String>,
    pub platform_version: String,
    pub propagate_tags: bool,
    pub enable_execute_command: bool,
}

impl LaunchSettings {
    /// Launch type, unless a capacity provider strategy replaces it
    fn launch_type(&self) -> Option<LaunchType> {
        if !self.capacity_providers.is_empty() {
            return None;
        }
        self.compatibilities
            .split_whitespace()
            .next()
            .map(LaunchType::from)
    }

    /// Fargate tasks, whether placed by launch type or capacity provider
    fn is_fargate(&self) -> bool {
        parse_compatibilities(&self.compatibilities).contains(&Compatibility::Fargate)
    }

    fn network_configuration(&self) -> Result<Option<NetworkConfiguration>, ConfigError> {
        if self.network_mode != "awsvpc" {
            return Ok(None);
        }

        let mut vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(self.subnets.clone()))
            .set_security_groups(Some(self.security_groups.clone()));
        if !self.assign_public_ip.is_empty() {
            vpc = vpc.assign_public_ip(AssignPublicIp::from(self.assign_public_ip.as_str()));
        }

        Ok(Some(
            NetworkConfiguration::builder()
                .awsvpc_configuration(vpc.build()?)
                .build(),
        ))
    }

    /// Builds the `RunTask` request for `task_definition`
    pub fn run_task_request(&self, task_definition: &str) -> Result<RunTaskInputBuilder, ConfigError> {
        let mut request = RunTaskInput::builder()
            .cluster(&self.cluster)
            .count(self.desired_count)
            .task_definition(task_definition)
            .enable_execute_command(self.enable_execute_command);

        if !self.group.is_empty() {
            request = request.group(&self.group);
        }

        if let Some(network) = self.network_configuration()? {
            request = request.network_configuration(network);
        }

        if self.is_fargate() && !self.platform_version.is_empty() {
            request = request.platform_version(&self.platform_version);
        }
        request = request.set_launch_type(self.launch_type());

        for entry in &self.capacity_providers {
            request = request.capacity_provider_strategy(parse_capacity_provider(entry)?);
        }

        if self.propagate_tags {
            request = request.propagate_tags(PropagateTags::TaskDefinition);
        }

        Ok(request)
    }
}

/// Starts the tasks and returns their ARNs
///
/// Any placement failure reported by ECS fails the run, as does an empty
/// task list.
pub async fn start_tasks(
    ecs: &dyn EcsApi,
    request: RunTaskInputBuilder,
) -> Result<Vec<String>, RunError> {
    let output = ecs.run_task(request).await?;

    if !output.failures().is_empty() {
        let failures: Vec<String> = output
            .failures()
            .iter()
            .map(|f| {
                let reason = f.reason().unwrap_or("unknown reason");
                match f.arn() {
                    Some(arn) => format!("{}: {}", arn, reason),
                    None => reason.to_string(),
                }
            })
            .collect();
        for failure in &failures {
            error!("Task launch failure: {}", failure);
        }
        return Err(RunError::LaunchFailures(failures));
    }

    let arns: Vec<String> = output
        .tasks()
        .iter()
        .filter_map(|t| t.task_arn())
        .map(str::to_string)
        .collect();

    if arns.is_empty() {
        return Err(RunError::NoTasksStarted);
    }

    for arn in &arns {
        info!("Started task: {}", arn);
    }

    Ok(arns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::operation::run_task::RunTaskOutput;
    use aws_sdk_ecs::types::{Failure, Task};
    use ecs_pilot_client::testing::ScriptedEcs;

    fn settings() -> LaunchSettings {
        LaunchSettings {
            cluster: "ci".to_string(),
            group: "migrate".to_string(),
            desired_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_bridge_request() {
        let request = settings().run_task_request("arn:td/migrate:1").unwrap();

        assert_eq!(request.get_cluster().as_deref(), Some("ci"));
        assert_eq!(request.get_count(), &Some(1));
        assert_eq!(request.get_group().as_deref(), Some("migrate"));
        assert!(request.get_network_configuration().is_none());
        assert!(request.get_launch_type().is_none());
        assert!(request.get_propagate_tags().is_none());
    }

    #[test]
    fn test_fargate_request() {
        let settings = LaunchSettings {
            compatibilities: "FARGATE".to_string(),
            network_mode: "awsvpc".to_string(),
            assign_public_ip: "ENABLED".to_string(),
            subnets: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            security_groups: vec!["sg-1".to_string()],
            platform_version: "1.4.0".to_string(),
            propagate_tags: true,
            ..settings()
        };

        let request = settings.run_task_request("arn:td/migrate:1").unwrap();

        assert_eq!(request.get_launch_type(), &Some(LaunchType::Fargate));
        assert_eq!(request.get_platform_version().as_deref(), Some("1.4.0"));
        assert_eq!(
            request.get_propagate_tags(),
            &Some(PropagateTags::TaskDefinition)
        );

        let network = request.get_network_configuration().clone().unwrap();
        let vpc = network.awsvpc_configuration().unwrap();
        assert_eq!(vpc.subnets(), ["subnet-a", "subnet-b"]);
        assert_eq!(vpc.security_groups(), ["sg-1"]);
        assert_eq!(vpc.assign_public_ip(), Some(&AssignPublicIp::Enabled));
    }

    #[test]
    fn test_capacity_providers_replace_launch_type() {
        let settings = LaunchSettings {
            compatibilities: "EC2".to_string(),
            capacity_providers: vec!["1 2 spot".to_string()],
            ..settings()
        };

        let request = settings.run_task_request("arn:td/migrate:1").unwrap();

        assert!(request.get_launch_type().is_none());
        let strategy = request.get_capacity_provider_strategy().clone().unwrap();
        assert_eq!(strategy[0].capacity_provider(), "spot");
        assert_eq!(strategy[0].base(), 1);
        assert_eq!(strategy[0].weight(), 2);
    }

    #[test]
    fn test_fargate_capacity_provider_keeps_platform_version() {
        let settings = LaunchSettings {
            compatibilities: "FARGATE".to_string(),
            network_mode: "awsvpc".to_string(),
            subnets: vec!["subnet-a".to_string()],
            capacity_providers: vec!["0 1 FARGATE_SPOT".to_string()],
            platform_version: "1.4.0".to_string(),
            ..settings()
        };

        let request = settings.run_task_request("arn:td/migrate:1").unwrap();

        assert!(request.get_launch_type().is_none());
        assert_eq!(request.get_platform_version().as_deref(), Some("1.4.0"));
        let strategy = request.get_capacity_provider_strategy().clone().unwrap();
        assert_eq!(strategy[0].capacity_provider(), "FARGATE_SPOT");
    }

    #[test]
    fn test_platform_version_ignored_for_ec2() {
        let settings = LaunchSettings {
            compatibilities: "EC2".to_string(),
            platform_version: "1.4.0".to_string(),
            ..settings()
        };

        let request = settings.run_task_request("arn:td/migrate:1").unwrap();

        assert!(request.get_platform_version().is_none());
    }

    #[test]
    fn test_malformed_capacity_provider() {
        let settings = LaunchSettings {
            capacity_providers: vec!["spot".to_string()],
            ..settings()
        };

        assert!(settings.run_task_request("arn:td/migrate:1").is_err());
    }

    #[tokio::test]
    async fn test_start_tasks_returns_arns() {
        let ecs = ScriptedEcs::new().on_run_task(Ok(RunTaskOutput::builder()
            .tasks(Task::builder().task_arn("arn:task/1").build())
            .tasks(Task::builder().task_arn("arn:task/2").build())
            .build()));

        let request = settings().run_task_request("arn:td/migrate:1").unwrap();
        let arns = start_tasks(&ecs, request).await.unwrap();

        assert_eq!(arns, vec!["arn:task/1", "arn:task/2"]);
    }

    #[tokio::test]
    async fn test_start_tasks_fails_on_placement_failures() {
        let ecs = ScriptedEcs::new().on_run_task(Ok(RunTaskOutput::builder()
            .failures(
                Failure::builder()
                    .arn("arn:container-instance/1")
                    .reason("RESOURCE:MEMORY")
                    .build(),
            )
            .build()));

        let request = settings().run_task_request("arn:td/migrate:1").unwrap();
        let err = start_tasks(&ecs, request).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to start tasks: arn:container-instance/1: RESOURCE:MEMORY"
        );
    }

    #[tokio::test]
    async fn test_start_tasks_fails_without_tasks() {
        let ecs = ScriptedEcs::new().on_run_task(Ok(RunTaskOutput::builder().build()));

        let request = settings().run_task_request("arn:td/migrate:1").unwrap();
        let err = start_tasks(&ecs, request).await.unwrap_err();

        assert!(matches!(err, RunError::NoTasksStarted));
    }
}
