//! Nacos registry adapter
//!
//! [`NacosRegistry`] serializes every registry operation for one naming
//! connection behind a single async mutex. The lock is held across the
//! backend round trip, so backend calls never interleave. Pushed events are
//! delivered by the backend outside that lock.

use crate::{
    backend::{EventListener, NamingClient, NamingConnector},
    config::{NamingProperties, RegistryConfig},
    error::{Error, Operation, Result},
    listener::{ListenerRegistry, SubscribeCallback, TranslatingListener},
    models::*,
};
use futures::lock::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Registry adapter over a naming backend connection
pub struct NacosRegistry {
    /// Naming backend connection
    client: Arc<dyn NamingClient>,
    /// Timeout handed to the backend
    timeout: Duration,
    /// Mutable state, guarded for the full duration of each operation
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    listeners: ListenerRegistry,
    closed: bool,
}

impl RegistryState {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl NacosRegistry {
    /// Connect to the naming backend
    ///
    /// Connection failure is returned as [`Error::Connection`].
    pub async fn connect(
        config: &RegistryConfig,
        properties: &NamingProperties,
        connector: &dyn NamingConnector,
    ) -> Result<Self> {
        let timeout = config.timeout();
        info!(
            "Connecting to naming backend at {} (timeout {:?})",
            properties.get(NamingProperties::SERVER_ADDR).unwrap_or("<unset>"),
            timeout
        );

        let client = connector.connect(properties).await.map_err(|e| {
            error!("Naming backend connection failed: {}", e);
            Error::Connection(e)
        })?;

        Ok(Self::with_client(client, timeout))
    }

    /// Wrap an already connected client
    pub fn with_client(client: Arc<dyn NamingClient>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Backend timeout this registry was created with
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a service instance
    ///
    /// Any previous registration of the same instance is removed first, so
    /// registering twice leaves a single instance.
    pub async fn register(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        descriptor.validate()?;
        let state = self.state.lock().await;
        state.ensure_open()?;

        let instance = instance_for(descriptor);
        self.deregister_instance(descriptor, &instance, Operation::Register)
            .await?;

        info!(
            "Registering {} at {} in namespace {}",
            descriptor.alias,
            descriptor.address(),
            descriptor.namespace
        );
        self.client
            .register_instance(&descriptor.alias, &descriptor.namespace, &instance)
            .await
            .map_err(|e| {
                error!("[{}] register failed: {}", descriptor.path, e);
                Error::operation(Operation::Register, &descriptor.path, e)
            })?;

        Ok(())
    }

    /// Remove a service instance
    ///
    /// Removing an instance that was never registered is not an error.
    pub async fn unregister(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        descriptor.validate()?;
        let state = self.state.lock().await;
        state.ensure_open()?;

        info!(
            "Unregistering {} at {} in namespace {}",
            descriptor.alias,
            descriptor.address(),
            descriptor.namespace
        );
        let instance = instance_for(descriptor);
        self.deregister_instance(descriptor, &instance, Operation::Unregister)
            .await
    }

    /// Subscribe to instance changes of a service
    ///
    /// A path is subscribed with the backend at most once. Subscribing again
    /// keeps the existing backend subscription and routes future events to
    /// the new callback.
    pub async fn subscribe<C>(&self, descriptor: &ServiceDescriptor, callback: C) -> Result<()>
    where
        C: SubscribeCallback + 'static,
    {
        self.subscribe_arc(descriptor, Arc::new(callback)).await
    }

    /// Like [`subscribe`](Self::subscribe), with a shared callback
    pub async fn subscribe_arc(
        &self,
        descriptor: &ServiceDescriptor,
        callback: Arc<dyn SubscribeCallback>,
    ) -> Result<()> {
        descriptor.validate()?;
        let mut state = self.state.lock().await;
        state.ensure_open()?;

        if let Some(existing) = state.listeners.get(&descriptor.path) {
            debug!(
                "[{}] already subscribed, rebinding callback",
                descriptor.path
            );
            existing.rebind(callback);
            return Ok(());
        }

        let listener = Arc::new(TranslatingListener::new(descriptor, callback));
        let handle: Arc<dyn EventListener> = listener.clone();
        self.client
            .subscribe(&descriptor.alias, &descriptor.namespace, handle)
            .await
            .map_err(|e| {
                error!("[{}] subscribe failed: {}", descriptor.path, e);
                Error::operation(Operation::Subscribe, &descriptor.path, e)
            })?;

        state.listeners.insert(descriptor.path.clone(), listener);
        info!(
            "Subscribed to {} in namespace {} for path {}",
            descriptor.alias, descriptor.namespace, descriptor.path
        );
        Ok(())
    }

    /// Cancel the subscription for a descriptor's path
    ///
    /// Unknown paths are a no-op. On backend failure the subscription is
    /// kept, since its backend state is unknown.
    pub async fn unsubscribe(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;

        let Some(listener) = state.listeners.get(&descriptor.path) else {
            debug!("[{}] not subscribed, nothing to do", descriptor.path);
            return Ok(());
        };

        let handle: Arc<dyn EventListener> = listener.clone();
        self.client
            .unsubscribe(listener.alias(), listener.namespace(), handle)
            .await
            .map_err(|e| {
                warn!(
                    "[{}] unsubscribe failed, keeping listener: {}",
                    descriptor.path, e
                );
                Error::operation(Operation::Unsubscribe, &descriptor.path, e)
            })?;

        state.listeners.remove(&descriptor.path);
        info!("Unsubscribed path {}", descriptor.path);
        Ok(())
    }

    /// Drop all subscriptions and shut the backend connection down
    ///
    /// The registry is unusable afterwards. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            debug!("Registry already closed");
            return Ok(());
        }

        let dropped = state.listeners.clear();
        state.closed = true;
        info!("Closing registry, dropping {} subscription(s)", dropped);

        self.client.shutdown().await.map_err(|e| {
            error!("Naming backend shutdown failed: {}", e);
            Error::Teardown(e)
        })
    }

    /// Whether [`close`](Self::close) has been called
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Number of subscribed paths
    pub async fn subscription_count(&self) -> usize {
        self.state.lock().await.listeners.len()
    }

    /// Whether a path has an active subscription
    pub async fn is_subscribed(&self, path: &str) -> bool {
        self.state.lock().await.listeners.contains(path)
    }

    /// Deregister with the backend; caller holds the state lock
    async fn deregister_instance(
        &self,
        descriptor: &ServiceDescriptor,
        instance: &Instance,
        operation: Operation,
    ) -> Result<()> {
        self.client
            .deregister_instance(&descriptor.alias, &descriptor.namespace, instance)
            .await
            .map_err(|e| {
                error!("[{}] {} failed: {}", descriptor.path, operation, e);
                Error::operation(operation, &descriptor.path, e)
            })
    }
}

/// Backend instance record for a descriptor
pub fn instance_for(descriptor: &ServiceDescriptor) -> Instance {
    Instance {
        service_name: descriptor.alias.clone(),
        ip: descriptor.host.clone(),
        port: descriptor.port,
        metadata: descriptor.metadata.clone(),
        healthy: true,
    }
}
