//! Configuration structures for the registry adapter

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Extra property holding the backend timeout in milliseconds
pub const PARAM_TIMEOUT: &str = "timeout";

/// Timeout used when none (or a non-positive one) is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Generic registry configuration as supplied by the RPC framework
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Backend addresses, separated by `,` or `;`
    pub address: String,

    /// Username (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Backend-specific extra properties
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl RegistryConfig {
    /// Create a configuration for the given address list
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Set credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Add an extra property
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Get an extra property
    pub fn get_extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(|s| s.as_str())
    }

    /// Backend timeout
    ///
    /// Falls back to [`DEFAULT_TIMEOUT`] when the `timeout` property is absent,
    /// not a number, or below one millisecond.
    pub fn timeout(&self) -> Duration {
        self.get_extra(PARAM_TIMEOUT)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|ms| *ms >= 1)
            .map_or(DEFAULT_TIMEOUT, |ms| Duration::from_millis(ms.unsigned_abs()))
    }

    /// Address list normalized to a comma separated string
    pub fn server_addr(&self) -> String {
        normalize_address(&self.address)
    }

    /// Load configuration from file
    pub async fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use async_fs::File;
        use futures::io::AsyncReadExt;

        let mut file = File::open(path.as_ref()).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        // YAML for .yaml/.yml, JSON otherwise
        let config: Self = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that at least one backend address is configured
    pub fn validate(&self) -> Result<()> {
        if self.server_addr().is_empty() {
            return Err(Error::Config("registry address cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Split an address list on `,`/`;` and join the parts with `,`
pub fn normalize_address(address: &str) -> String {
    address
        .split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Backend-specific properties handed to a connector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamingProperties(BTreeMap<String, String>);

impl NamingProperties {
    /// Backend address list key
    pub const SERVER_ADDR: &'static str = "serverAddr";
    /// Username key
    pub const USERNAME: &'static str = "username";
    /// Password key
    pub const PASSWORD: &'static str = "password";

    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Whether a property is set
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no property is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
