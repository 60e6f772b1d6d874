//! ecs-pilot ECS Client
//!
//! A small, trait-based seam over the Amazon ECS API.
//!
//! The plugins only ever talk to ECS through [`EcsApi`], which keeps the
//! orchestration logic testable without AWS. [`AwsEcsClient`] is the real
//! implementation backed by `aws-sdk-ecs`.
//!
//! # Example
//!
//! ```no_run
//! use aws_sdk_ecs::operation::describe_tasks::DescribeTasksInput;
//! use ecs_pilot_client::{ConnectionSettings, EcsApi, connect};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = ConnectionSettings::new("eu-west-1").with_env_fallbacks();
//!     let client = connect(&settings).await;
//!
//!     let tasks = client
//!         .describe_tasks(DescribeTasksInput::builder().cluster("ci").tasks("arn:task/1"))
//!         .await?;
//!
//!     println!("{} task(s)", tasks.tasks().len());
//!     Ok(())
//! }
//! ```

mod connect;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connect::{ConnectionSettings, connect};
pub use error::{EcsError, Result};

use async_trait::async_trait;
use aws_sdk_ecs::operation::describe_services::DescribeServicesOutput;
use aws_sdk_ecs::operation::describe_services::builders::DescribeServicesInputBuilder;
use aws_sdk_ecs::operation::describe_task_definition::DescribeTaskDefinitionOutput;
use aws_sdk_ecs::operation::describe_task_definition::builders::DescribeTaskDefinitionInputBuilder;
use aws_sdk_ecs::operation::describe_tasks::DescribeTasksOutput;
use aws_sdk_ecs::operation::describe_tasks::builders::DescribeTasksInputBuilder;
use aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionOutput;
use aws_sdk_ecs::operation::register_task_definition::builders::RegisterTaskDefinitionInputBuilder;
use aws_sdk_ecs::operation::run_task::RunTaskOutput;
use aws_sdk_ecs::operation::run_task::builders::RunTaskInputBuilder;
use aws_sdk_ecs::operation::stop_task::StopTaskOutput;
use aws_sdk_ecs::operation::stop_task::builders::StopTaskInputBuilder;
use aws_sdk_ecs::operation::update_service::UpdateServiceOutput;
use aws_sdk_ecs::operation::update_service::builders::UpdateServiceInputBuilder;
use tracing::{debug, error};

/// The ECS operations the plugins rely on
///
/// Requests are the SDK input builders so callers can assemble them
/// incrementally; responses are the SDK output types.
#[async_trait]
pub trait EcsApi: Send + Sync {
    async fn register_task_definition(
        &self,
        request: RegisterTaskDefinitionInputBuilder,
    ) -> Result<RegisterTaskDefinitionOutput>;

    async fn run_task(&self, request: RunTaskInputBuilder) -> Result<RunTaskOutput>;

    async fn describe_tasks(&self, request: DescribeTasksInputBuilder)
    -> Result<DescribeTasksOutput>;

    async fn stop_task(&self, request: StopTaskInputBuilder) -> Result<StopTaskOutput>;

    async fn describe_services(
        &self,
        request: DescribeServicesInputBuilder,
    ) -> Result<DescribeServicesOutput>;

    async fn describe_task_definition(
        &self,
        request: DescribeTaskDefinitionInputBuilder,
    ) -> Result<DescribeTaskDefinitionOutput>;

    async fn update_service(&self, request: UpdateServiceInputBuilder)
    -> Result<UpdateServiceOutput>;
}

/// [`EcsApi`] backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct AwsEcsClient {
    client: aws_sdk_ecs::Client,
}

impl AwsEcsClient {
    /// Wraps an already configured SDK client
    pub fn new(client: aws_sdk_ecs::Client) -> Self {
        Self { client }
    }
}

/// Logs an ECS failure, naming well-known error codes explicitly
fn log_failure(err: EcsError) -> EcsError {
    match err.code() {
        Some(code) if err.is_known() => error!("{}: {}", code, err),
        _ => error!("{}", err),
    }
    err
}

#[async_trait]
impl EcsApi for AwsEcsClient {
    async fn register_task_definition(
        &self,
        request: RegisterTaskDefinitionInputBuilder,
    ) -> Result<RegisterTaskDefinitionOutput> {
        debug!("RegisterTaskDefinition family={:?}", request.get_family());
        request
            .send_with(&self.client)
            .await
            .map_err(|e| log_failure(EcsError::from_sdk("RegisterTaskDefinition", e)))
    }

    async fn run_task(&self, request: RunTaskInputBuilder) -> Result<RunTaskOutput> {
        debug!(
            "RunTask cluster={:?} task_definition={:?}",
            request.get_cluster(),
            request.get_task_definition()
        );
        request
            .send_with(&self.client)
            .await
            .map_err(|e| log_failure(EcsError::from_sdk("RunTask", e)))
    }

    async fn describe_tasks(
        &self,
        request: DescribeTasksInputBuilder,
    ) -> Result<DescribeTasksOutput> {
        request
            .send_with(&self.client)
            .await
            .map_err(|e| log_failure(EcsError::from_sdk("DescribeTasks", e)))
    }

    async fn stop_task(&self, request: StopTaskInputBuilder) -> Result<StopTaskOutput> {
        debug!("StopTask task={:?}", request.get_task());
        request
            .send_with(&self.client)
            .await
            .map_err(|e| log_failure(EcsError::from_sdk("StopTask", e)))
    }

    async fn describe_services(
        &self,
        request: DescribeServicesInputBuilder,
    ) -> Result<DescribeServicesOutput> {
        request
            .send_with(&self.client)
            .await
            .map_err(|e| log_failure(EcsError::from_sdk("DescribeServices", e)))
    }

    async fn describe_task_definition(
        &self,
        request: DescribeTaskDefinitionInputBuilder,
    ) -> Result<DescribeTaskDefinitionOutput> {
        request
            .send_with(&self.client)
            .await
            .map_err(|e| log_failure(EcsError::from_sdk("DescribeTaskDefinition", e)))
    }

    async fn update_service(
        &self,
        request: UpdateServiceInputBuilder,
    ) -> Result<UpdateServiceOutput> {
        debug!(
            "UpdateService service={:?} force_new_deployment={:?}",
            request.get_service(),
            request.get_force_new_deployment()
        );
        request
            .send_with(&self.client)
            .await
            .map_err(|e| log_failure(EcsError::from_sdk("UpdateService", e)))
    }
}
