//! Subscription listeners
//!
//! A [`TranslatingListener`] is what the adapter hands to the backend for one
//! subscribed path. It turns raw naming events into [`ServiceDescriptor`]s and
//! passes them to the caller's [`SubscribeCallback`]. [`ListenerRegistry`]
//! keeps at most one such listener per path.

use crate::backend::EventListener;
use crate::models::*;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Receiver of discovered service lists
///
/// Invoked from backend threads, possibly concurrently with registry calls.
pub trait SubscribeCallback: Send + Sync {
    /// Handle the current list of instances for a subscribed service
    fn handle(&self, services: Vec<ServiceDescriptor>);
}

impl<F> SubscribeCallback for F
where
    F: Fn(Vec<ServiceDescriptor>) + Send + Sync,
{
    fn handle(&self, services: Vec<ServiceDescriptor>) {
        self(services)
    }
}

/// Backend listener bound to one subscribed descriptor
pub struct TranslatingListener {
    namespace: String,
    alias: String,
    callback: RwLock<Arc<dyn SubscribeCallback>>,
}

impl TranslatingListener {
    /// Create a listener for `descriptor` delivering to `callback`
    pub fn new(descriptor: &ServiceDescriptor, callback: Arc<dyn SubscribeCallback>) -> Self {
        Self {
            namespace: descriptor.namespace.clone(),
            alias: descriptor.alias.clone(),
            callback: RwLock::new(callback),
        }
    }

    /// Service name the listener is attached to
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Namespace the listener is attached to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Route future events to `callback`
    pub fn rebind(&self, callback: Arc<dyn SubscribeCallback>) {
        *self.callback.write().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Convert a naming event into descriptors
    ///
    /// A missing instance list yields an empty list. Discovered descriptors
    /// always carry [`REGISTRY_PROTOCOL`], whatever tag the subscriber used.
    pub fn translate(&self, event: &NamingEvent) -> Vec<ServiceDescriptor> {
        event
            .instances
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|instance| {
                ServiceDescriptor::new(
                    self.namespace.clone(),
                    instance.service_name.clone(),
                    REGISTRY_PROTOCOL,
                    instance.ip.clone(),
                    instance.port,
                )
                .with_metadata_map(instance.metadata.clone())
            })
            .collect()
    }
}

impl EventListener for TranslatingListener {
    fn on_event(&self, event: &Event) {
        let Event::Naming(naming) = event else {
            return;
        };

        let services = self.translate(naming);
        debug!(
            "Naming event for {}/{}: {} instance(s)",
            self.namespace,
            self.alias,
            services.len()
        );

        // Clone out so the callback runs without holding the slot lock
        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        callback.handle(services);
    }
}

/// Active listeners keyed by service path
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Arc<TranslatingListener>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener for a path
    pub fn get(&self, path: &str) -> Option<Arc<TranslatingListener>> {
        self.listeners.get(path).cloned()
    }

    /// Store the listener for a path, replacing any previous one
    pub fn insert(&mut self, path: impl Into<String>, listener: Arc<TranslatingListener>) {
        self.listeners.insert(path.into(), listener);
    }

    /// Remove the listener for a path
    pub fn remove(&mut self, path: &str) -> Option<Arc<TranslatingListener>> {
        self.listeners.remove(path)
    }

    /// Whether a path has a listener
    pub fn contains(&self, path: &str) -> bool {
        self.listeners.contains_key(path)
    }

    /// Drop every listener, returning how many there were
    pub fn clear(&mut self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        count
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether there are no listeners
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
