//! Minimal embedding example for ingdns-core
//!
//! This example demonstrates using ingdns-core as a library in a custom
//! application: the application owns the watch transport (here, a scripted
//! sequence of events) and the engine lifecycle.

use ingdns_core::snapshot::{IngressKey, IngressSnapshot, LoadBalancerEntry};
use ingdns_core::traits::{DnsProvider, RecordType, UpsertOutcome, WithdrawOutcome};
use ingdns_core::{ChannelEventSource, Result, SyncConfig, SyncEngine};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Custom DNS provider for embedded usage
struct EmbeddedProvider {
    mutation_calls: AtomicUsize,
}

impl EmbeddedProvider {
    fn new() -> Self {
        Self {
            mutation_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for EmbeddedProvider {
    async fn upsert(
        &self,
        hostname: &str,
        target: &str,
        record_type: RecordType,
    ) -> Result<UpsertOutcome> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] Upserting {} record {} -> {}", record_type, hostname, target);

        // Simulate a successful write
        Ok(UpsertOutcome::Created {
            target: target.to_string(),
        })
    }

    async fn withdraw(&self, hostname: &str) -> Result<WithdrawOutcome> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] Withdrawing records for {}", hostname);

        Ok(WithdrawOutcome::Withdrawn)
    }

    fn supports_host(&self, _hostname: &str) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded ingdns-core Example ===\n");

    // Create custom components
    let (source, handle) = ChannelEventSource::new();
    let provider: Arc<dyn DnsProvider> = Arc::new(EmbeddedProvider::new());

    // Create configuration
    let config = SyncConfig::new(ingdns_core::ProviderConfig::Custom {
        factory: "embedded".to_string(),
        config: serde_json::json!({ "note": "provider constructed directly" }),
    });

    // Create engine
    println!("1. Creating engine...");
    let (engine, mut event_rx) = SyncEngine::new(Box::new(source), provider, config)?;

    // Spawn event listener (optional)
    let event_listener = tokio::spawn(async move {
        println!("2. Event listener started");
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
        println!("Event listener stopped");
    });

    // Run engine in background
    println!("3. Starting engine in background...");
    let engine_handle = tokio::spawn(async move { engine.run().await });

    // Script the lifecycle of one ingress: created bare, assigned an IP,
    // moved behind a load-balancer hostname, then deleted.
    println!("\n4. Feeding a scripted ingress lifecycle...\n");
    let bare = IngressSnapshot::new(IngressKey::new("default", "web"))
        .with_rule_hosts(vec!["demo.example.com".to_string()]);
    let by_ip = bare
        .clone()
        .with_load_balancer(vec![LoadBalancerEntry::from_ip("203.0.113.5")]);
    let by_name = bare
        .clone()
        .with_load_balancer(vec![LoadBalancerEntry::from_hostname("lb.example.net")]);

    handle.added(bare.clone());
    handle.sync_complete();
    handle.updated(bare, by_ip.clone());
    handle.updated(by_ip, by_name.clone());
    handle.deleted(by_name);

    // Dropping the handle ends the event stream; the engine drains its
    // workers and stops on its own.
    drop(handle);

    println!("5. Waiting for the engine to drain and stop...");
    engine_handle.await.expect("engine task panicked")?;

    let _ = tokio::time::timeout(tokio::time::Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Engine lifecycle is fully controlled by the application");
    println!("- The application owns the watch transport and pushes events");
    println!("- End-of-stream is a clean shutdown, no signals required");

    Ok(())
}
