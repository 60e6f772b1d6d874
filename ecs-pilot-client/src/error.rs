//! Error types for the ECS client

use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, EcsError>;

/// Errors that can occur when calling ECS
#[derive(Debug, Clone, Error)]
pub enum EcsError {
    /// ECS answered with a modeled error code
    #[error("{operation} failed ({code}): {message}")]
    Service {
        /// API operation name, e.g. `RunTask`
        operation: &'static str,
        /// ECS error code, e.g. `ClusterNotFoundException`
        code: String,
        /// Error message from ECS
        message: String,
    },

    /// The request never produced a modeled answer (network, credentials, timeouts)
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// ECS answered, but not with what the caller needs
    #[error("{operation} returned an unexpected response: {message}")]
    UnexpectedResponse {
        operation: &'static str,
        message: String,
    },
}

/// ECS error codes the plugins call out by name in their logs
pub const KNOWN_ERROR_CODES: &[&str] = &[
    "ServerException",
    "ClientException",
    "InvalidParameterException",
    "ClusterNotFoundException",
    "ServiceNotFoundException",
    "ServiceNotActiveException",
    "PlatformUnknownException",
    "PlatformTaskDefinitionIncompatibilityException",
    "AccessDeniedException",
];

impl EcsError {
    /// Converts an SDK error, keeping the ECS error code when there is one
    pub fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match err.code() {
            Some(code) => Self::Service {
                operation,
                code: code.to_string(),
                message: err.message().unwrap_or_default().to_string(),
            },
            None => Self::Transport {
                operation,
                message: DisplayErrorContext(&err).to_string(),
            },
        }
    }

    pub fn unexpected(operation: &'static str, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            operation,
            message: message.into(),
        }
    }

    /// ECS error code, if ECS returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether ECS returned this exact error code
    pub fn is_code(&self, code: &str) -> bool {
        self.code() == Some(code)
    }

    /// Whether the error names a well-known ECS failure
    pub fn is_known(&self) -> bool {
        self.code().is_some_and(|c| KNOWN_ERROR_CODES.contains(&c))
    }

    /// Check if the cluster or service does not exist
    pub fn is_not_found(&self) -> bool {
        self.is_code("ClusterNotFoundException") || self.is_code("ServiceNotFoundException")
    }
}
