//! Mutual exclusion of registry operations across threads

use nacos_registry::backend::memory::{CallKind, MemoryNamingClient};
use nacos_registry::{NacosRegistry, ServiceDescriptor};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

mod common;
use common::*;

#[test]
fn test_concurrent_registers_are_serialized() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(25)));
    let registry = Arc::new(NacosRegistry::with_client(
        client.clone(),
        Duration::from_secs(5),
    ));

    let handles: Vec<_> = [("svcA", "p1"), ("svcB", "p2")]
        .into_iter()
        .map(|(alias, path)| {
            let registry = registry.clone();
            thread::spawn(move || {
                smol::block_on(registry.register(&descriptor(alias, path, 8080)))
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(client.max_in_flight(), 1);

    // Each register is an uninterrupted deregister/register pair
    let calls = client.calls();
    assert_eq!(calls.len(), 4);
    for pair in calls.chunks(2) {
        let service = pair[0].split(':').nth(1).unwrap();
        assert_eq!(pair[0], format!("deregister:{}", service));
        assert_eq!(pair[1], format!("register:{}", service));
    }
}

#[test]
fn test_concurrent_subscribes_on_one_path_subscribe_once() {
    let client = MemoryNamingClient::new();
    let registry = Arc::new(NacosRegistry::with_client(
        Arc::new(client.clone()),
        Duration::from_secs(5),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                let collector = Collector::new();
                smol::block_on(
                    registry.subscribe(&descriptor("svcA", "p1", 8080), collector.callback()),
                )
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(client.call_count(CallKind::Subscribe), 1);
    assert_eq!(client.listener_count("ns1", "svcA"), 1);
}

#[test]
fn test_events_delivered_while_registry_busy() {
    let client = MemoryNamingClient::new();
    let registry = Arc::new(NacosRegistry::with_client(
        Arc::new(client.clone()),
        Duration::from_secs(5),
    ));
    let collector = Collector::new();

    smol::block_on(registry.subscribe(&descriptor("svcA", "p1", 8080), collector.callback()))
        .unwrap();

    // Backend thread pushes events while another thread registers
    let pusher = {
        let client = client.clone();
        thread::spawn(move || {
            for _ in 0..10 {
                client.notify(
                    "ns1",
                    "svcA",
                    &nacos_registry::Event::Naming(nacos_registry::NamingEvent {
                        service_name: "svcA".to_string(),
                        namespace: "ns1".to_string(),
                        instances: None,
                    }),
                );
            }
        })
    };
    let registrar = {
        let registry = registry.clone();
        thread::spawn(move || {
            for port in 9000..9010 {
                smol::block_on(registry.register(&descriptor("svcB", "p2", port))).unwrap();
            }
        })
    };

    pusher.join().unwrap();
    registrar.join().unwrap();
    smol::block_on(client.flush());

    assert_eq!(collector.received().len(), 10);
}

#[test]
fn test_callback_can_reenter_registry_during_register() {
    let client = MemoryNamingClient::new();
    let registry = Arc::new(NacosRegistry::with_client(
        Arc::new(client.clone()),
        Duration::from_secs(5),
    ));
    let d = descriptor("svcA", "p1", 8080);

    let (seen_tx, seen_rx) = mpsc::channel();
    let callback = {
        let registry = registry.clone();
        move |services: Vec<ServiceDescriptor>| {
            let count = smol::block_on(registry.subscription_count());
            let _ = seen_tx.send((services.len(), count));
        }
    };
    smol::block_on(registry.subscribe(&d, callback)).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let registrar = {
        let registry = registry.clone();
        let d = d.clone();
        thread::spawn(move || {
            let result = smol::block_on(registry.register(&d));
            let _ = done_tx.send(result.is_ok());
        })
    };

    assert_eq!(done_rx.recv_timeout(Duration::from_secs(3)), Ok(true));
    assert_eq!(seen_rx.recv_timeout(Duration::from_secs(3)), Ok((1, 1)));
    registrar.join().unwrap();
}
