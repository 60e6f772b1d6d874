//! Run errors

use ecs_pilot_client::EcsError;
use ecs_pilot_core::{ConfigError, OutcomeError};
use thiserror::Error;

/// Reasons a standalone task run fails
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("task definition registration returned no ARN")]
    MissingTaskDefinitionArn,

    /// ECS refused to place some of the requested tasks
    #[error("failed to start tasks: {}", .0.join("; "))]
    LaunchFailures(Vec<String>),

    #[error("no tasks were started")]
    NoTasksStarted,

    /// DescribeTasks reported tasks it could not find
    #[error("failed to describe tasks: {}", .0.join("; "))]
    DescribeFailures(Vec<String>),

    #[error("error - task exceeded timeout after: {elapsed}s")]
    Timeout { elapsed: u64 },

    #[error(transparent)]
    Outcome(#[from] OutcomeError),
}
