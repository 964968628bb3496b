//! Test doubles and common utilities for architecture contract tests
//!
//! This module provides minimal test doubles that verify architectural
//! constraints without implementing real functionality.

#![allow(dead_code)]

use async_trait::async_trait;
use ingdns_core::config::{ProviderConfig, SyncConfig};
use ingdns_core::error::Result;
use ingdns_core::snapshot::{IngressKey, IngressSnapshot, LoadBalancerEntry};
use ingdns_core::source::SourceHandle;
use ingdns_core::traits::{DnsProvider, RecordType, UpsertOutcome, WithdrawOutcome};
use ingdns_core::{ChannelEventSource, EngineEvent, SyncEngine};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc, oneshot};

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Upsert {
        hostname: String,
        target: String,
        record_type: RecordType,
    },
    Withdraw {
        hostname: String,
    },
}

/// A DnsProvider double that records every call and can inject failures,
/// latency, and per-host gates
pub struct RecordingProvider {
    /// Calls in completion order
    calls: Mutex<Vec<ProviderCall>>,
    /// Hostnames whose mutations fail
    fail_hosts: Mutex<HashSet<String>>,
    /// Artificial latency applied to every call
    delay: Mutex<Option<Duration>>,
    /// Hostnames whose mutations block until released
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    /// Number of injected failures handed out
    failures: AtomicUsize,
}

impl RecordingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_hosts: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            gates: Mutex::new(HashMap::new()),
            failures: AtomicUsize::new(0),
        })
    }

    /// Get the recorded calls, in completion order
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every mutation for `hostname` fail
    pub fn fail_host(&self, hostname: &str) {
        self.fail_hosts.lock().unwrap().insert(hostname.to_string());
    }

    /// Let mutations for `hostname` succeed again
    pub fn heal_host(&self, hostname: &str) {
        self.fail_hosts.lock().unwrap().remove(hostname);
    }

    /// Number of injected failures handed out so far
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Apply artificial latency to every call
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Block mutations for `hostname` until the returned gate is released
    /// with `add_permits`
    pub fn gate_host(&self, hostname: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(hostname.to_string(), Arc::clone(&gate));
        gate
    }

    async fn pass_checkpoints(&self, hostname: &str) -> Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let gate = self.gates.lock().unwrap().get(hostname).cloned();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .expect("gate semaphore closed unexpectedly");
            permit.forget();
        }

        if self.fail_hosts.lock().unwrap().contains(hostname) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(ingdns_core::Error::provider(
                "recording",
                format!("injected failure for {}", hostname),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl DnsProvider for RecordingProvider {
    async fn upsert(
        &self,
        hostname: &str,
        target: &str,
        record_type: RecordType,
    ) -> Result<UpsertOutcome> {
        self.pass_checkpoints(hostname).await?;

        self.calls.lock().unwrap().push(ProviderCall::Upsert {
            hostname: hostname.to_string(),
            target: target.to_string(),
            record_type,
        });

        Ok(UpsertOutcome::Created {
            target: target.to_string(),
        })
    }

    async fn withdraw(&self, hostname: &str) -> Result<WithdrawOutcome> {
        self.pass_checkpoints(hostname).await?;

        self.calls.lock().unwrap().push(ProviderCall::Withdraw {
            hostname: hostname.to_string(),
        });

        Ok(WithdrawOutcome::Withdrawn)
    }

    fn supports_host(&self, _hostname: &str) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig::new(ProviderConfig::Cloudflare {
        api_token: "test-token".to_string(),
        zone_id: None,
        account_id: None,
    })
}

/// Spawn an engine over a channel source and the given provider.
///
/// Returns the running engine task, the push handle, a shutdown trigger,
/// and the monitoring event receiver. Dropping the handle ends the source
/// stream, which the engine treats as a clean stop; most tests use that
/// instead of the shutdown trigger for deterministic draining.
pub fn spawn_engine(
    provider: Arc<RecordingProvider>,
) -> (
    tokio::task::JoinHandle<Result<()>>,
    SourceHandle,
    oneshot::Sender<()>,
    mpsc::Receiver<EngineEvent>,
) {
    let (source, handle) = ChannelEventSource::new();

    let (engine, event_rx) = SyncEngine::new(Box::new(source), provider, minimal_config())
        .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    (task, handle, shutdown_tx, event_rx)
}

/// Snapshot with rule hostnames and no assigned address
pub fn snapshot(name: &str, rule_hosts: &[&str]) -> IngressSnapshot {
    IngressSnapshot::new(IngressKey::new("default", name))
        .with_rule_hosts(rule_hosts.iter().map(|h| h.to_string()).collect())
}

/// Same snapshot with an IP entry point assigned
pub fn with_ip(snapshot: &IngressSnapshot, ip: &str) -> IngressSnapshot {
    snapshot
        .clone()
        .with_load_balancer(vec![LoadBalancerEntry::from_ip(ip)])
}

/// Same snapshot with a hostname entry point assigned
pub fn with_lb_hostname(snapshot: &IngressSnapshot, hostname: &str) -> IngressSnapshot {
    snapshot
        .clone()
        .with_load_balancer(vec![LoadBalancerEntry::from_hostname(hostname)])
}
