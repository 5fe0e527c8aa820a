//! Common test utilities for registry integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use nacos_registry::backend::{BackendResult, EventListener, NamingClient};
use nacos_registry::{Instance, ServiceDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Callback that keeps every list it receives
#[derive(Clone, Default)]
pub struct Collector {
    received: Arc<Mutex<Vec<Vec<ServiceDescriptor>>>>,
}

impl Collector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback feeding this collector
    pub fn callback(&self) -> impl Fn(Vec<ServiceDescriptor>) + Send + Sync + use<> {
        let received = self.received.clone();
        move |services: Vec<ServiceDescriptor>| received.lock().unwrap().push(services)
    }

    /// Lists received so far
    pub fn received(&self) -> Vec<Vec<ServiceDescriptor>> {
        self.received.lock().unwrap().clone()
    }
}

/// Descriptor under namespace `ns1` with an explicit path
pub fn descriptor(alias: &str, path: &str, port: u16) -> ServiceDescriptor {
    ServiceDescriptor::nacos("ns1", alias, "10.0.0.1", port).with_path(path)
}

/// Naming client that sleeps inside every call and tracks overlap
///
/// `max_in_flight` above one means two backend calls ran at the same time.
#[derive(Default)]
pub struct SlowClient {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl SlowClient {
    /// Client sleeping `delay` per call
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Highest number of concurrent calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Calls in completion order, as `op:service`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn call(&self, op: &str, service_name: &str) -> BackendResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        smol::Timer::after(self.delay).await;
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", op, service_name));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl NamingClient for SlowClient {
    async fn register_instance(
        &self,
        service_name: &str,
        _namespace: &str,
        _instance: &Instance,
    ) -> BackendResult<()> {
        self.call("register", service_name).await
    }

    async fn deregister_instance(
        &self,
        service_name: &str,
        _namespace: &str,
        _instance: &Instance,
    ) -> BackendResult<()> {
        self.call("deregister", service_name).await
    }

    async fn subscribe(
        &self,
        service_name: &str,
        _namespace: &str,
        _listener: Arc<dyn EventListener>,
    ) -> BackendResult<()> {
        self.call("subscribe", service_name).await
    }

    async fn unsubscribe(
        &self,
        service_name: &str,
        _namespace: &str,
        _listener: Arc<dyn EventListener>,
    ) -> BackendResult<()> {
        self.call("unsubscribe", service_name).await
    }

    async fn shutdown(&self) -> BackendResult<()> {
        self.call("shutdown", "-").await
    }
}
