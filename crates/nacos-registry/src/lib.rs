//! Nacos naming adapter for RPC service registration and discovery
//!
//! This crate maps the register / unregister / subscribe / unsubscribe
//! contract used by RPC clients and servers onto a Nacos-style naming
//! backend, and translates the backend's instance events into neutral
//! [`ServiceDescriptor`] values.
//!
//! # Architecture
//!
//! - [`backend::NamingClient`] stands for the naming SDK connection. The
//!   crate ships an in-memory implementation in [`backend::memory`].
//! - [`NacosRegistry`] serializes all operations on one connection, makes
//!   re-registration idempotent and keeps at most one backend listener per
//!   service path.
//! - [`NacosRegistryProvider`] turns a generic [`RegistryConfig`] into
//!   backend properties and connects a registry.
//!
//! # Example
//!
//! ```no_run
//! use nacos_registry::backend::memory::MemoryConnector;
//! use nacos_registry::{NacosRegistryProvider, RegistryConfig, ServiceDescriptor};
//!
//! # async fn example() -> nacos_registry::Result<()> {
//! let config = RegistryConfig::new("127.0.0.1:8848").with_extra("namespace", "dev");
//! let registry = NacosRegistryProvider::new()
//!     .new_registry(&config, &MemoryConnector::default())
//!     .await?;
//!
//! let greeter = ServiceDescriptor::nacos("dev", "greeter", "10.0.0.1", 9000);
//! registry.register(&greeter).await?;
//! registry
//!     .subscribe(&greeter, |services: Vec<ServiceDescriptor>| {
//!         println!("{} greeter instance(s)", services.len());
//!     })
//!     .await?;
//!
//! registry.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod listener;
pub mod models;
pub mod provider;
pub mod registry;

pub use backend::{BackendError, EventListener, NamingClient, NamingConnector};
pub use config::{NamingProperties, RegistryConfig};
pub use error::{Error, Operation, Result};
pub use listener::{ListenerRegistry, SubscribeCallback, TranslatingListener};
pub use models::*;
pub use provider::NacosRegistryProvider;
pub use registry::NacosRegistry;

/// Re-export key types for convenience
pub mod prelude {
    pub use crate::{
        Error, NacosRegistry, NacosRegistryProvider, RegistryConfig, Result, ServiceDescriptor,
        SubscribeCallback,
    };
}
