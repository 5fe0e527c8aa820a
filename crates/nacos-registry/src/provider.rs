//! Registry provider
//!
//! Maps the framework's generic [`RegistryConfig`] onto Nacos client
//! properties and builds [`NacosRegistry`] instances from it.

use crate::{
    backend::NamingConnector,
    config::{NamingProperties, PARAM_TIMEOUT, RegistryConfig},
    error::Result,
    models::REGISTRY_PROTOCOL,
    registry::NacosRegistry,
};
use tracing::debug;

/// Extra property names and the Nacos client keys they map to
pub const PROPERTY_MAPPING: &[(&str, &str)] = &[
    // Common
    ("namespace", "namespace"),
    ("loggingPath", "nacos.logging.path"),
    // Naming client
    ("namingLoadCacheAtStart", "namingLoadCacheAtStart"),
    ("namingClientBeatThreadCount", "namingClientBeatThreadCount"),
    ("namingPollingThreadCount", "namingPollingThreadCount"),
    ("namingCacheDir", "com.alibaba.naming.cache.dir"),
    ("namingLogLevel", "com.alibaba.nacos.naming.log.level"),
    ("namingTlsEnable", "com.alibaba.nacos.client.naming.tls.enable"),
    (PARAM_TIMEOUT, PARAM_TIMEOUT),
];

/// Factory for Nacos-backed registries
#[derive(Debug, Clone, Copy, Default)]
pub struct NacosRegistryProvider;

impl NacosRegistryProvider {
    /// Create a provider
    pub fn new() -> Self {
        Self
    }

    /// Registry type served by this provider
    pub fn registry_type(&self) -> &'static str {
        REGISTRY_PROTOCOL
    }

    /// Translate a generic configuration into Nacos client properties
    ///
    /// Only mapped extra keys with non-empty values are forwarded.
    /// Credentials are forwarded when both username and password are set.
    pub fn naming_properties(&self, config: &RegistryConfig) -> NamingProperties {
        let mut properties = NamingProperties::new();

        for (key, backend_key) in PROPERTY_MAPPING {
            if let Some(value) = config.get_extra(key).filter(|v| !v.is_empty()) {
                properties.insert(*backend_key, value);
            }
        }

        properties.insert(NamingProperties::SERVER_ADDR, config.server_addr());

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            properties.insert(NamingProperties::USERNAME, username.as_str());
            properties.insert(NamingProperties::PASSWORD, password.as_str());
        }

        debug!("Mapped registry config to {} naming properties", properties.len());
        properties
    }

    /// Build a registry connected through `connector`
    pub async fn new_registry(
        &self,
        config: &RegistryConfig,
        connector: &dyn NamingConnector,
    ) -> Result<NacosRegistry> {
        config.validate()?;
        let properties = self.naming_properties(config);
        NacosRegistry::connect(config, &properties, connector).await
    }
}
