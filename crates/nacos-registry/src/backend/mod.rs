//! Naming backend contract
//!
//! The adapter never talks to a naming server directly. It drives a
//! [`NamingClient`], which stands for the naming SDK connection, and receives
//! pushed changes through [`EventListener`] handles.

pub mod memory;

use crate::{config::NamingProperties, models::*};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Error reported by the naming backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("backend error {code}: {message}")]
pub struct BackendError {
    /// Backend error code
    pub code: i32,
    /// Backend error message
    pub message: String,
}

impl BackendError {
    /// Server side failure
    pub const SERVER_ERROR: i32 = 500;
    /// Request rejected by the client library
    pub const CLIENT_INVALID_PARAM: i32 = -400;
    /// Client is not connected
    pub const CLIENT_DISCONNECTED: i32 = -401;

    /// Create a new backend error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Server side failure
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(Self::SERVER_ERROR, message)
    }

    /// Client is not connected
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(Self::CLIENT_DISCONNECTED, message)
    }
}

/// Result type for backend calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Receiver of events pushed by the backend
///
/// Called from the backend's own threads, never under the registry lock.
pub trait EventListener: Send + Sync {
    /// Handle one raw event
    fn on_event(&self, event: &Event);
}

/// Connection to a naming backend
#[async_trait]
pub trait NamingClient: Send + Sync {
    /// Register an instance under a service name
    async fn register_instance(
        &self,
        service_name: &str,
        namespace: &str,
        instance: &Instance,
    ) -> BackendResult<()>;

    /// Deregister an instance; unknown instances are a no-op
    async fn deregister_instance(
        &self,
        service_name: &str,
        namespace: &str,
        instance: &Instance,
    ) -> BackendResult<()>;

    /// Start delivering changes of a service to a listener
    async fn subscribe(
        &self,
        service_name: &str,
        namespace: &str,
        listener: Arc<dyn EventListener>,
    ) -> BackendResult<()>;

    /// Stop delivering changes to a listener previously passed to `subscribe`
    async fn unsubscribe(
        &self,
        service_name: &str,
        namespace: &str,
        listener: Arc<dyn EventListener>,
    ) -> BackendResult<()>;

    /// Release the connection and all listeners
    async fn shutdown(&self) -> BackendResult<()>;
}

/// Factory establishing backend connections
#[async_trait]
pub trait NamingConnector: Send + Sync {
    /// Connect using backend-specific properties
    async fn connect(&self, properties: &NamingProperties) -> BackendResult<Arc<dyn NamingClient>>;
}
