//! Error types for the Nacos registry adapter

use crate::backend::BackendError;
use std::fmt;
use thiserror::Error;

/// Registry operation that touched the naming backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Instance registration
    Register,
    /// Instance deregistration
    Unregister,
    /// Service subscription
    Subscribe,
    /// Service unsubscription
    Unsubscribe,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Register => "register",
            Operation::Unregister => "unregister",
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
        };
        f.write_str(name)
    }
}

/// Registry adapter error type
#[derive(Error, Debug)]
pub enum Error {
    /// Naming backend connection could not be established
    #[error("Failed to connect to naming backend: {0}")]
    Connection(#[source] BackendError),

    /// A backend call failed while serving a registry operation
    #[error("[{path}] {operation} failed: {source}")]
    Operation {
        /// Operation being performed
        operation: Operation,
        /// Path of the affected service
        path: String,
        /// Backend failure
        #[source]
        source: BackendError,
    },

    /// Backend shutdown failed, cleanup is incomplete
    #[error("Failed to shut down naming backend: {0}")]
    Teardown(#[source] BackendError),

    /// Registry was already closed
    #[error("Registry is closed")]
    Closed,

    /// Descriptor is missing required fields
    #[error("Invalid service descriptor: {0}")]
    InvalidDescriptor(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn operation(operation: Operation, path: &str, source: BackendError) -> Self {
        Error::Operation {
            operation,
            path: path.to_string(),
            source,
        }
    }

    /// Backend error behind this failure, if any
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Error::Connection(e) | Error::Teardown(e) => Some(e),
            Error::Operation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_names_path() {
        let err = Error::operation(
            Operation::Subscribe,
            "ns1/greeter",
            BackendError::server("boom"),
        );
        assert_eq!(
            err.to_string(),
            "[ns1/greeter] subscribe failed: backend error 500: boom"
        );
        assert_eq!(err.backend_error().map(|e| e.code), Some(500));
    }

    #[test]
    fn test_closed_has_no_backend_error() {
        assert!(Error::Closed.backend_error().is_none());
    }
}
