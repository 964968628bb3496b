//! Architectural Contract Test: Shutdown Determinism
//!
//! Constraints verified:
//! - A shutdown signal stops the engine cleanly
//! - End-of-stream from the source is a clean stop, not an error
//! - Work already handed to a worker is drained before the engine returns
//!
//! If this test fails, shutdown can strand in-flight DNS mutations or hang
//! the process.

mod common;

use common::*;
use std::time::Duration;

#[tokio::test]
async fn shutdown_signal_stops_the_engine_cleanly() {
    let provider = RecordingProvider::new();
    let (engine, _handle, shutdown_tx, _event_rx) = spawn_engine(provider);

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), engine)
        .await
        .expect("engine must stop promptly after the signal");
    result.unwrap().unwrap();
}

#[tokio::test]
async fn source_eof_is_a_clean_stop() {
    let provider = RecordingProvider::new();
    let (engine, handle, _shutdown_tx, _event_rx) = spawn_engine(provider);

    drop(handle);

    let result = tokio::time::timeout(Duration::from_secs(5), engine)
        .await
        .expect("engine must stop promptly at end-of-stream");
    result.unwrap().unwrap();
}

#[tokio::test]
async fn dispatched_work_is_drained_before_exit() {
    let provider = RecordingProvider::new();
    provider.set_delay(Duration::from_millis(100));
    let (engine, handle, shutdown_tx, _event_rx) = spawn_engine(provider.clone());

    let bare = snapshot("web", &["a.example.com"]);
    handle.updated(bare.clone(), with_ip(&bare, "203.0.113.5"));

    // Give the dispatch loop time to route the event, then shut down while
    // the provider call is still sleeping.
    tokio::time::sleep(Duration::from_millis(30)).await;
    shutdown_tx.send(()).unwrap();

    engine.await.unwrap().unwrap();

    assert_eq!(
        provider.calls().len(),
        1,
        "in-flight reconciliation must complete before the engine returns"
    );
}

#[tokio::test]
async fn idle_engine_makes_no_provider_calls() {
    let provider = RecordingProvider::new();
    let (engine, handle, shutdown_tx, _event_rx) = spawn_engine(provider.clone());

    // No events at all; the engine must sit idle without polling anything.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();
    engine.await.unwrap().unwrap();
    drop(handle);

    assert!(provider.calls().is_empty());
}
