//! Architectural Contract Test: Per-Ingress Ordering & Isolation
//!
//! Constraints verified:
//! - Events for one ingress are applied strictly in delivery order
//! - Events for different ingresses do not block each other
//! - A failing hostname stops neither the remaining hostnames of its own
//!   plan nor the reconciliation of other ingresses
//!
//! If this test fails, interleaved updates can corrupt the old-vs-new
//! address comparison, or one bad record can halt the controller.

mod common;

use common::*;
use ingdns_core::traits::RecordType;
use std::sync::Arc;
use std::time::Duration;

/// Poll until the provider has recorded `count` calls (or panic on timeout)
async fn wait_for_calls(provider: &Arc<RecordingProvider>, count: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while provider.calls().len() < count {
        if tokio::time::Instant::now() > deadline {
            panic!(
                "timed out waiting for {} provider calls, have {:?}",
                count,
                provider.calls()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn updates_for_one_ingress_apply_in_delivery_order() {
    let provider = RecordingProvider::new();
    let gate = provider.gate_host("a.example.com");
    let (engine, handle, _shutdown_tx, _event_rx) = spawn_engine(provider.clone());

    let bare = snapshot("web", &["a.example.com"]);
    let first = with_ip(&bare, "203.0.113.5");
    let second = with_ip(&bare, "203.0.113.6");

    // Two changes in quick succession; both reach the worker's queue while
    // the gate holds the first mutation open.
    handle.updated(bare.clone(), first.clone());
    handle.updated(first, second);

    // Releasing one permit must complete the FIRST change only.
    gate.add_permits(1);
    wait_for_calls(&provider, 1).await;
    assert_eq!(
        provider.calls(),
        vec![ProviderCall::Upsert {
            hostname: "a.example.com".to_string(),
            target: "203.0.113.5".to_string(),
            record_type: RecordType::A,
        }]
    );

    gate.add_permits(1);
    drop(handle);
    engine.await.unwrap().unwrap();

    let targets: Vec<String> = provider
        .calls()
        .into_iter()
        .map(|call| match call {
            ProviderCall::Upsert { target, .. } => target,
            ProviderCall::Withdraw { hostname } => hostname,
        })
        .collect();
    assert_eq!(targets, ["203.0.113.5", "203.0.113.6"]);
}

#[tokio::test]
async fn distinct_ingresses_do_not_block_each_other() {
    let provider = RecordingProvider::new();
    let gate = provider.gate_host("slow.example.com");
    let (engine, handle, _shutdown_tx, _event_rx) = spawn_engine(provider.clone());

    let slow = snapshot("slow", &["slow.example.com"]);
    let fast = snapshot("fast", &["fast.example.com"]);

    // The slow ingress is delivered first and its mutation blocks on the
    // gate; the fast ingress must still complete.
    handle.updated(slow.clone(), with_ip(&slow, "203.0.113.5"));
    handle.updated(fast.clone(), with_ip(&fast, "203.0.113.6"));

    wait_for_calls(&provider, 1).await;
    assert_eq!(
        provider.calls(),
        vec![ProviderCall::Upsert {
            hostname: "fast.example.com".to_string(),
            target: "203.0.113.6".to_string(),
            record_type: RecordType::A,
        }],
        "the blocked ingress must not hold up unrelated work"
    );

    gate.add_permits(1);
    drop(handle);
    engine.await.unwrap().unwrap();

    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test]
async fn failing_hostname_does_not_stop_remaining_hostnames() {
    let provider = RecordingProvider::new();
    provider.fail_host("b.example.com");
    let (engine, handle, _shutdown_tx, _event_rx) = spawn_engine(provider.clone());

    let bare = snapshot("web", &["b.example.com", "c.example.com"]);
    handle.updated(bare.clone(), with_ip(&bare, "203.0.113.5"));
    drop(handle);

    engine.await.unwrap().unwrap();

    assert_eq!(
        provider.calls(),
        vec![ProviderCall::Upsert {
            hostname: "c.example.com".to_string(),
            target: "203.0.113.5".to_string(),
            record_type: RecordType::A,
        }],
        "the failure is surfaced but the rest of the plan still runs"
    );
}

#[tokio::test]
async fn failing_ingress_does_not_stop_other_ingresses() {
    let provider = RecordingProvider::new();
    provider.fail_host("broken.example.com");
    let (engine, handle, _shutdown_tx, _event_rx) = spawn_engine(provider.clone());

    let broken = snapshot("broken", &["broken.example.com"]);
    let healthy = snapshot("healthy", &["healthy.example.com"]);

    handle.updated(broken.clone(), with_ip(&broken, "203.0.113.5"));
    handle.updated(healthy.clone(), with_ip(&healthy, "203.0.113.6"));
    drop(handle);

    engine.await.unwrap().unwrap();

    assert_eq!(
        provider.calls(),
        vec![ProviderCall::Upsert {
            hostname: "healthy.example.com".to_string(),
            target: "203.0.113.6".to_string(),
            record_type: RecordType::A,
        }]
    );
}
