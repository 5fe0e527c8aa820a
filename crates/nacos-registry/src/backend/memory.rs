//! In-memory naming backend
//!
//! Keeps instances and listeners in process. Useful for local development and
//! for exercising the adapter without a naming server. Every call is recorded
//! so callers can inspect what the adapter asked the backend to do.
//!
//! Listeners are called from a dedicated notifier thread, never from the
//! thread that made the backend call.

use super::{BackendError, BackendResult, EventListener, NamingClient, NamingConnector};
use crate::{config::NamingProperties, models::*};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::thread;
use tracing::{debug, warn};

/// Kind of backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `register_instance`
    RegisterInstance,
    /// `deregister_instance`
    DeregisterInstance,
    /// `subscribe`
    Subscribe,
    /// `unsubscribe`
    Unsubscribe,
    /// `shutdown`
    Shutdown,
}

/// A recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Instance registration
    RegisterInstance {
        /// Service name
        service_name: String,
        /// Namespace
        namespace: String,
        /// Instance record
        instance: Instance,
    },
    /// Instance deregistration
    DeregisterInstance {
        /// Service name
        service_name: String,
        /// Namespace
        namespace: String,
        /// Instance record
        instance: Instance,
    },
    /// Listener subscription
    Subscribe {
        /// Service name
        service_name: String,
        /// Namespace
        namespace: String,
    },
    /// Listener removal
    Unsubscribe {
        /// Service name
        service_name: String,
        /// Namespace
        namespace: String,
    },
    /// Connection shutdown
    Shutdown,
}

impl Call {
    /// Kind of this call
    pub fn kind(&self) -> CallKind {
        match self {
            Call::RegisterInstance { .. } => CallKind::RegisterInstance,
            Call::DeregisterInstance { .. } => CallKind::DeregisterInstance,
            Call::Subscribe { .. } => CallKind::Subscribe,
            Call::Unsubscribe { .. } => CallKind::Unsubscribe,
            Call::Shutdown => CallKind::Shutdown,
        }
    }
}

type ServiceKey = (String, String);

fn key(namespace: &str, service_name: &str) -> ServiceKey {
    (namespace.to_string(), service_name.to_string())
}

#[derive(Default)]
struct MemoryState {
    instances: HashMap<ServiceKey, Vec<Instance>>,
    listeners: HashMap<ServiceKey, Vec<Arc<dyn EventListener>>>,
    calls: Vec<Call>,
    failures: HashMap<CallKind, BackendError>,
    shut_down: bool,
}

impl MemoryState {
    /// Record a call and decide whether it may proceed
    fn admit(&mut self, call: Call) -> BackendResult<()> {
        let kind = call.kind();
        self.calls.push(call);
        if self.shut_down {
            return Err(BackendError::disconnected("naming client is shut down"));
        }
        match self.failures.remove(&kind) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn naming_event(&self, key: &ServiceKey) -> (Vec<Arc<dyn EventListener>>, Event) {
        let listeners = self.listeners.get(key).cloned().unwrap_or_default();
        let event = Event::Naming(NamingEvent {
            namespace: key.0.clone(),
            service_name: key.1.clone(),
            instances: Some(self.instances.get(key).cloned().unwrap_or_default()),
        });
        (listeners, event)
    }
}

enum Delivery {
    Event {
        listeners: Vec<Arc<dyn EventListener>>,
        event: Event,
    },
    Flush(async_channel::Sender<()>),
}

/// Start the notifier thread; it stops once every sender is dropped
fn spawn_notifier() -> async_channel::Sender<Delivery> {
    let (tx, rx) = async_channel::unbounded::<Delivery>();
    let spawned = thread::Builder::new()
        .name("naming-notifier".to_string())
        .spawn(move || {
            while let Ok(delivery) = rx.recv_blocking() {
                match delivery {
                    Delivery::Event { listeners, event } => {
                        for listener in listeners {
                            listener.on_event(&event);
                        }
                    }
                    Delivery::Flush(done) => {
                        let _ = done.send_blocking(());
                    }
                }
            }
            debug!("Naming notifier stopped");
        });
    if let Err(e) = spawned {
        warn!("Failed to start naming notifier, events will be dropped: {}", e);
    }
    tx
}

/// Thread-safe in-memory naming client
#[derive(Clone)]
pub struct MemoryNamingClient {
    state: Arc<RwLock<MemoryState>>,
    notifier: async_channel::Sender<Delivery>,
}

impl Default for MemoryNamingClient {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            notifier: spawn_notifier(),
        }
    }
}

impl MemoryNamingClient {
    /// Create an empty client
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> BackendResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| BackendError::server(format!("memory naming state poisoned: {}", e)))
    }

    fn inspect<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&*state)
    }

    /// Make the next call of `kind` fail with `error`
    pub fn fail_next(&self, kind: CallKind, error: BackendError) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.failures.insert(kind, error);
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.inspect(|s| s.calls.clone())
    }

    /// Number of calls of one kind
    pub fn call_count(&self, kind: CallKind) -> usize {
        self.inspect(|s| s.calls.iter().filter(|c| c.kind() == kind).count())
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.calls.clear();
    }

    /// Instances currently registered for a service
    pub fn instances(&self, namespace: &str, service_name: &str) -> Vec<Instance> {
        self.inspect(|s| {
            s.instances
                .get(&key(namespace, service_name))
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Number of listeners attached to a service
    pub fn listener_count(&self, namespace: &str, service_name: &str) -> usize {
        self.inspect(|s| {
            s.listeners
                .get(&key(namespace, service_name))
                .map_or(0, Vec::len)
        })
    }

    /// Whether `shutdown` has completed
    pub fn is_shut_down(&self) -> bool {
        self.inspect(|s| s.shut_down)
    }

    /// Push a raw event to every listener of a service
    ///
    /// The event is queued for the notifier thread; see [`flush`](Self::flush).
    pub fn notify(&self, namespace: &str, service_name: &str, event: &Event) {
        let listeners = self.inspect(|s| {
            s.listeners
                .get(&key(namespace, service_name))
                .cloned()
                .unwrap_or_default()
        });
        debug!(
            "Delivering event for {}/{} to {} listener(s)",
            namespace,
            service_name,
            listeners.len()
        );
        self.deliver(listeners, event.clone());
    }

    /// Wait until every event queued so far has reached its listeners
    ///
    /// Must not be awaited from inside a listener.
    pub async fn flush(&self) {
        let (done, wait) = async_channel::bounded(1);
        if self.notifier.send(Delivery::Flush(done)).await.is_ok() {
            let _ = wait.recv().await;
        }
    }

    fn deliver(&self, listeners: Vec<Arc<dyn EventListener>>, event: Event) {
        if listeners.is_empty() {
            return;
        }
        if self
            .notifier
            .try_send(Delivery::Event { listeners, event })
            .is_err()
        {
            warn!("Naming notifier is gone, dropping event");
        }
    }
}

#[async_trait]
impl NamingClient for MemoryNamingClient {
    async fn register_instance(
        &self,
        service_name: &str,
        namespace: &str,
        instance: &Instance,
    ) -> BackendResult<()> {
        let (listeners, event) = {
            let mut state = self.write()?;
            state.admit(Call::RegisterInstance {
                service_name: service_name.to_string(),
                namespace: namespace.to_string(),
                instance: instance.clone(),
            })?;

            let key = key(namespace, service_name);
            let instances = state.instances.entry(key.clone()).or_default();
            instances.retain(|existing| !existing.same_endpoint(instance));
            instances.push(instance.clone());
            state.naming_event(&key)
        };
        self.deliver(listeners, event);
        Ok(())
    }

    async fn deregister_instance(
        &self,
        service_name: &str,
        namespace: &str,
        instance: &Instance,
    ) -> BackendResult<()> {
        let changed = {
            let mut state = self.write()?;
            state.admit(Call::DeregisterInstance {
                service_name: service_name.to_string(),
                namespace: namespace.to_string(),
                instance: instance.clone(),
            })?;

            let key = key(namespace, service_name);
            let removed = match state.instances.get_mut(&key) {
                Some(instances) => {
                    let before = instances.len();
                    instances.retain(|existing| !existing.same_endpoint(instance));
                    before != instances.len()
                }
                None => false,
            };
            removed.then(|| state.naming_event(&key))
        };
        if let Some((listeners, event)) = changed {
            self.deliver(listeners, event);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        service_name: &str,
        namespace: &str,
        listener: Arc<dyn EventListener>,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        state.admit(Call::Subscribe {
            service_name: service_name.to_string(),
            namespace: namespace.to_string(),
        })?;

        let listeners = state
            .listeners
            .entry(key(namespace, service_name))
            .or_default();
        if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
        Ok(())
    }

    async fn unsubscribe(
        &self,
        service_name: &str,
        namespace: &str,
        listener: Arc<dyn EventListener>,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        state.admit(Call::Unsubscribe {
            service_name: service_name.to_string(),
            namespace: namespace.to_string(),
        })?;

        let key = key(namespace, service_name);
        if let Some(listeners) = state.listeners.get_mut(&key) {
            listeners.retain(|l| !Arc::ptr_eq(l, &listener));
            if listeners.is_empty() {
                state.listeners.remove(&key);
            }
        }
        Ok(())
    }

    async fn shutdown(&self) -> BackendResult<()> {
        let mut state = self.write()?;
        state.admit(Call::Shutdown)?;
        state.listeners.clear();
        state.shut_down = true;
        Ok(())
    }
}

/// Connector handing out a shared [`MemoryNamingClient`]
#[derive(Clone, Default)]
pub struct MemoryConnector {
    client: MemoryNamingClient,
    failure: Option<BackendError>,
    seen: Arc<RwLock<Vec<NamingProperties>>>,
}

impl MemoryConnector {
    /// Connector returning `client` on every connect
    pub fn new(client: MemoryNamingClient) -> Self {
        Self {
            client,
            failure: None,
            seen: Arc::default(),
        }
    }

    /// Connector whose connects always fail with `error`
    pub fn failing(error: BackendError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Client handed out by this connector
    pub fn client(&self) -> &MemoryNamingClient {
        &self.client
    }

    /// Properties passed to every connect attempt
    pub fn properties_seen(&self) -> Vec<NamingProperties> {
        self.seen
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NamingConnector for MemoryConnector {
    async fn connect(&self, properties: &NamingProperties) -> BackendResult<Arc<dyn NamingClient>> {
        self.seen
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(properties.clone());

        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Arc::new(self.client.clone())),
        }
    }
}
