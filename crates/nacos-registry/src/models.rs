//! Data models for the registry adapter

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Protocol tag carried by descriptors served through this adapter
pub const REGISTRY_PROTOCOL: &str = "nacos";

/// A registrable or discovered service endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Naming namespace the service lives in
    pub namespace: String,

    /// Service name instances are grouped under
    pub alias: String,

    /// Registry protocol tag
    pub protocol: String,

    /// Host or IP
    pub host: String,

    /// Port
    pub port: u16,

    /// Instance metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Registry-scoped key for this unit
    pub path: String,
}

impl ServiceDescriptor {
    /// Create a new descriptor
    ///
    /// The path defaults to `{namespace}/{alias}`.
    pub fn new(
        namespace: impl Into<String>,
        alias: impl Into<String>,
        protocol: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        let namespace = namespace.into();
        let alias = alias.into();
        let path = default_path(&namespace, &alias);
        Self {
            namespace,
            alias,
            protocol: protocol.into(),
            host: host.into(),
            port,
            metadata: HashMap::new(),
            path,
        }
    }

    /// Create a descriptor tagged with [`REGISTRY_PROTOCOL`]
    pub fn nacos(
        namespace: impl Into<String>,
        alias: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self::new(namespace, alias, REGISTRY_PROTOCOL, host, port)
    }

    /// Override the registry path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace all metadata
    pub fn with_metadata_map(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Get metadata value
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    /// `host:port` of the endpoint
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check that alias and path are usable as registry keys
    pub fn validate(&self) -> crate::Result<()> {
        if self.alias.trim().is_empty() {
            return Err(crate::Error::InvalidDescriptor(format!(
                "alias cannot be empty (path '{}')",
                self.path
            )));
        }
        if self.path.trim().is_empty() {
            return Err(crate::Error::InvalidDescriptor(format!(
                "path cannot be empty (alias '{}')",
                self.alias
            )));
        }
        Ok(())
    }
}

fn default_path(namespace: &str, alias: &str) -> String {
    format!("{}/{}", namespace, alias)
}

/// Instance record as stored by the naming backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Service the instance belongs to
    pub service_name: String,

    /// Instance IP or host
    pub ip: String,

    /// Instance port
    pub port: u16,

    /// Instance metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Health flag
    pub healthy: bool,
}

impl Instance {
    /// Whether two records describe the same endpoint
    pub fn same_endpoint(&self, other: &Instance) -> bool {
        self.ip == other.ip && self.port == other.port
    }
}

/// Naming change pushed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingEvent {
    /// Service name the event is about
    pub service_name: String,

    /// Namespace of the service
    pub namespace: String,

    /// Current instances, absent when the backend sent none
    pub instances: Option<Vec<Instance>>,
}

/// Raw event delivered to backend listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Instance list changed
    Naming(NamingEvent),
    /// Any other backend notification
    Other {
        /// Backend-specific event kind
        kind: String,
    },
}
