//! Service deployment
//!
//! Rolls a new image out to an ECS service by registering a copy of the
//! service's task definition with the container image replaced, then
//! pointing the service at the new revision. When nothing changes, a new
//! deployment of the current revision is forced instead.

use std::sync::Arc;

use aws_sdk_ecs::operation::describe_services::DescribeServicesInput;
use aws_sdk_ecs::operation::describe_task_definition::DescribeTaskDefinitionInput;
use aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionInput;
use aws_sdk_ecs::operation::register_task_definition::builders::RegisterTaskDefinitionInputBuilder;
use aws_sdk_ecs::operation::update_service::UpdateServiceInput;
use aws_sdk_ecs::operation::update_service::builders::UpdateServiceInputBuilder;
use aws_sdk_ecs::types::{Service, Tag, TaskDefinition, TaskDefinitionField};
use ecs_pilot_client::{EcsApi, EcsError};
use ecs_pilot_core::domain::image::resolve_image;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("failed to describe service: {}", .0.join("; "))]
    DescribeFailures(Vec<String>),

    #[error("service {service} not found in cluster {cluster}")]
    ServiceNotFound { cluster: String, service: String },

    #[error("service {0} has no task definition")]
    NoTaskDefinition(String),

    #[error("no container named \"{container}\" found in task definition {task_definition}")]
    ContainerNotFound {
        container: String,
        task_definition: String,
    },

    #[error("task definition registration returned no ARN")]
    MissingTaskDefinitionArn,
}

/// What a deployment does
#[derive(Debug, Clone, Default)]
pub struct DeploySettings {
    pub cluster: String,
    pub service: String,
    pub container_name: String,
    /// Replacement repository; `None` keeps the current one
    pub docker_image: Option<String>,
    /// Replacement tag; `None` keeps the current one
    pub tag: Option<String>,
    pub ignore_missing_container: bool,
    pub force_new_deployment: bool,
}

/// How the service was updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The current revision was redeployed
    ForcedDeployment,
    /// The service now runs a new revision
    NewRevision {
        task_definition_arn: String,
        revision: i32,
    },
}

/// Result of a deployment
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub outcome: DeployOutcome,
    /// The service as returned by `UpdateService`
    pub service: Option<Service>,
}

pub struct Deployer {
    ecs: Arc<dyn EcsApi>,
    settings: DeploySettings,
}

impl Deployer {
    pub fn new(ecs: Arc<dyn EcsApi>, settings: DeploySettings) -> Self {
        Self { ecs, settings }
    }

    pub async fn deploy(&self) -> Result<DeployReport, DeployError> {
        if self.settings.force_new_deployment {
            info!(
                "'force-new-deployment' flag set. Ignoring image/tag definition and forcing deployment"
            );
            return self.force_new_deployment().await;
        }

        let service = self.describe_service().await?;
        let current_arn = service
            .task_definition()
            .ok_or_else(|| DeployError::NoTaskDefinition(self.settings.service.clone()))?;
        info!("Service {} runs task definition {}", self.settings.service, current_arn);

        let (task_definition, tags) = self.describe_task_definition(current_arn).await?;

        let mut containers = task_definition.container_definitions().to_vec();
        let mut found = false;

        for container in containers
            .iter_mut()
            .filter(|c| c.name() == Some(self.settings.container_name.as_str()))
        {
            let current = container.image().unwrap_or_default().to_string();
            if self.settings.docker_image.is_none() {
                info!("No docker image provided. Using value from task definition.");
            }
            if self.settings.tag.is_none() {
                info!("No docker image TAG provided. Using value from task definition (if present).");
            }

            let image = resolve_image(
                &current,
                self.settings.docker_image.as_deref(),
                self.settings.tag.as_deref(),
            )
            .to_string();

            if image == current {
                info!(
                    "No image name and tag change detected in task definition. Forcing new deployment instead."
                );
                return self.force_new_deployment().await;
            }

            info!("Container {}: {} -> {}", self.settings.container_name, current, image);
            container.image = Some(image);
            found = true;
        }

        if !found {
            warn!(
                "No container named \"{}\" found in container definitions. Service: {}, task definition: {}",
                self.settings.container_name,
                service.service_arn().unwrap_or(&self.settings.service),
                current_arn
            );
            if !self.settings.ignore_missing_container {
                return Err(DeployError::ContainerNotFound {
                    container: self.settings.container_name.clone(),
                    task_definition: current_arn.to_string(),
                });
            }
            info!("'ignore-missing-container' flag set. Continuing anyway...");
        }

        let request = revision_request(&task_definition, containers, tags);
        let registered = self.ecs.register_task_definition(request).await?;
        let new_definition = registered
            .task_definition()
            .ok_or(DeployError::MissingTaskDefinitionArn)?;
        let task_definition_arn = new_definition
            .task_definition_arn()
            .ok_or(DeployError::MissingTaskDefinitionArn)?
            .to_string();
        info!("Registered task definition: {}", task_definition_arn);

        let updated = self
            .update_service(
                UpdateServiceInput::builder().task_definition(&task_definition_arn),
            )
            .await?;

        Ok(DeployReport {
            outcome: DeployOutcome::NewRevision {
                revision: new_definition.revision(),
                task_definition_arn,
            },
            service: updated,
        })
    }

    async fn describe_service(&self) -> Result<Service, DeployError> {
        let output = self
            .ecs
            .describe_services(
                DescribeServicesInput::builder()
                    .cluster(&self.settings.cluster)
                    .services(&self.settings.service),
            )
            .await
            .map_err(|e| self.not_found_or(e))?;

        if !output.failures().is_empty() {
            let failures: Vec<String> = output
                .failures()
                .iter()
                .map(|f| {
                    format!(
                        "{}: {}",
                        f.arn().unwrap_or(&self.settings.service),
                        f.reason().unwrap_or("unknown reason")
                    )
                })
                .collect();
            for failure in &failures {
                error!("Describe failure: {}", failure);
            }
            return Err(DeployError::DescribeFailures(failures));
        }

        output
            .services()
            .first()
            .cloned()
            .ok_or_else(|| DeployError::ServiceNotFound {
                cluster: self.settings.cluster.clone(),
                service: self.settings.service.clone(),
            })
    }

    async fn describe_task_definition(
        &self,
        arn: &str,
    ) -> Result<(TaskDefinition, Vec<Tag>), DeployError> {
        let output = self
            .ecs
            .describe_task_definition(
                DescribeTaskDefinitionInput::builder()
                    .task_definition(arn)
                    .include(TaskDefinitionField::Tags),
            )
            .await?;

        let task_definition = output
            .task_definition()
            .cloned()
            .ok_or_else(|| DeployError::NoTaskDefinition(self.settings.service.clone()))?;

        Ok((task_definition, output.tags().to_vec()))
    }

    /// Reports a missing cluster or service as [`DeployError::ServiceNotFound`]
    fn not_found_or(&self, err: EcsError) -> DeployError {
        if err.is_not_found() {
            DeployError::ServiceNotFound {
                cluster: self.settings.cluster.clone(),
                service: self.settings.service.clone(),
            }
        } else {
            err.into()
        }
    }

    async fn force_new_deployment(&self) -> Result<DeployReport, DeployError> {
        let service = self
            .update_service(UpdateServiceInput::builder().force_new_deployment(true))
            .await?;

        Ok(DeployReport {
            outcome: DeployOutcome::ForcedDeployment,
            service,
        })
    }

    async fn update_service(
        &self,
        request: UpdateServiceInputBuilder,
    ) -> Result<Option<Service>, DeployError> {
        let request = request
            .cluster(&self.settings.cluster)
            .service(&self.settings.service);
        let output = self
            .ecs
            .update_service(request)
            .await
            .map_err(|e| self.not_found_or(e))?;
        info!("Updated service {}", self.settings.service);
        Ok(output.service().cloned())
    }
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    (!items.is_empty()).then(|| items.to_vec())
}

/// Copies every registrable field of `old` into a new revision
fn revision_request(
    old: &TaskDefinition,
    containers: Vec<aws_sdk_ecs::types::ContainerDefinition>,
    tags: Vec<Tag>,
) -> RegisterTaskDefinitionInputBuilder {
    RegisterTaskDefinitionInput::builder()
        .set_container_definitions(Some(containers))
        .set_cpu(old.cpu().map(str::to_string))
        .set_ephemeral_storage(old.ephemeral_storage().cloned())
        .set_execution_role_arn(old.execution_role_arn().map(str::to_string))
        .set_family(old.family().map(str::to_string))
        .set_inference_accelerators(non_empty(old.inference_accelerators()))
        .set_ipc_mode(old.ipc_mode().cloned())
        .set_memory(old.memory().map(str::to_string))
        .set_network_mode(old.network_mode().cloned())
        .set_pid_mode(old.pid_mode().cloned())
        .set_placement_constraints(non_empty(old.placement_constraints()))
        .set_proxy_configuration(old.proxy_configuration().cloned())
        .set_requires_compatibilities(non_empty(old.requires_compatibilities()))
        .set_runtime_platform(old.runtime_platform().cloned())
        .set_tags(non_empty(&tags))
        .set_task_role_arn(old.task_role_arn().map(str::to_string))
        .set_volumes(non_empty(old.volumes()))
}
