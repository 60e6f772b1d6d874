//! Error types for ecs-pilot core

use thiserror::Error;

/// Errors raised while turning plugin settings into ECS requests
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric field could not be parsed
    #[error("error parsing {setting} {field}: {reason}")]
    InvalidNumber {
        setting: &'static str,
        field: &'static str,
        reason: String,
    },

    /// A boolean field could not be parsed
    #[error("error parsing {setting} {field}: invalid boolean {value:?}")]
    InvalidBool {
        setting: &'static str,
        field: &'static str,
        value: String,
    },

    /// An entry does not have the expected number of parts
    #[error("error parsing {setting}: {entry:?} must look like '{expected}'")]
    Malformed {
        setting: &'static str,
        entry: String,
        expected: &'static str,
    },

    /// Placement constraints are not a valid JSON array
    #[error("error parsing placement_constraints json: {0}")]
    PlacementConstraints(#[from] serde_json::Error),

    /// A required setting is empty
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// The assembled request was rejected by the SDK builders
    #[error("invalid ECS request: {0}")]
    Build(#[from] aws_sdk_ecs::error::BuildError),
}

impl ConfigError {
    pub(crate) fn malformed(
        setting: &'static str,
        entry: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::Malformed {
            setting,
            entry: entry.into(),
            expected,
        }
    }
}

/// Reasons a finished run is considered failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError {
    /// A container never reported an exit code (the task did not run to completion)
    #[error("Task failed: {reason}")]
    TaskFailed { task_arn: String, reason: String },

    /// At least one container exited with a non-zero code
    #[error("there are failed containers")]
    FailedContainers(Vec<crate::domain::outcome::FailedContainer>),
}
