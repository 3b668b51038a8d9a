use crate::task::BackendKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Missing backend parameters: one of 'ecs' or 'codebuild' is required")]
    MissingBackendParams,

    #[error("Invalid backend parameters: only one of 'ecs' or 'codebuild' may be supplied")]
    InvalidBackendParams,

    #[error("{backend} {operation} failed: {source}")]
    Backend {
        backend: BackendKind,
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Waiter {waiter} gave up after {attempts} attempts")]
    WaiterExhausted { waiter: String, attempts: u32 },

    #[error("Wait cancelled")]
    Cancelled,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LaunchError {
    /// Wrap a service error with the backend and operation it came from.
    pub fn backend(backend: BackendKind, operation: &'static str, source: ApiError) -> Self {
        Self::Backend {
            backend,
            operation,
            source,
        }
    }
}

/// Failure reported by (or while talking to) an AWS service endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("credentials error: {0}")]
    Credentials(String),
}

impl ApiError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The service error code, e.g. `ResourceNotFoundException`.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Service { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_code(&self, code: &str) -> bool {
        self.code() == Some(code)
    }
}
