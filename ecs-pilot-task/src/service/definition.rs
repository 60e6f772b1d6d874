//! Task definition selection

use aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionOutput;
use ecs_pilot_client::EcsApi;
use ecs_pilot_core::definition::TaskDefinitionSpec;
use tracing::info;

use crate::error::RunError;

/// Where the task definition for a run comes from
#[derive(Debug, Clone)]
pub enum TaskDefinitionSource {
    /// An already registered revision
    Existing(String),
    /// A new revision registered from the plugin settings
    Register(Box<TaskDefinitionSpec>),
}

/// Returns the ARN of the task definition to run
///
/// `lookup` resolves the source variables of secret environment entries.
pub async fn resolve_task_definition<F>(
    ecs: &dyn EcsApi,
    source: &TaskDefinitionSource,
    lookup: F,
) -> Result<String, RunError>
where
    F: Fn(&str) -> Option<String>,
{
    match source {
        TaskDefinitionSource::Existing(arn) => {
            if arn.is_empty() {
                return Err(RunError::MissingTaskDefinitionArn);
            }
            info!("Using existing task definition: {}", arn);
            Ok(arn.clone())
        }
        TaskDefinitionSource::Register(spec) => {
            let request = spec.register_request(lookup)?;
            let output = ecs.register_task_definition(request).await?;
            let arn = registered_arn(&output)?;
            info!("Registered task definition: {}", arn);
            Ok(arn)
        }
    }
}

fn registered_arn(output: &RegisterTaskDefinitionOutput) -> Result<String, RunError> {
    output
        .task_definition()
        .and_then(|td| td.task_definition_arn())
        .map(str::to_string)
        .ok_or(RunError::MissingTaskDefinitionArn)
}
