//! DNS synchronization engine
//!
//! The SyncEngine is responsible for:
//! - Consuming ingress events from an EventSource
//! - Deciding which DNS mutations each event requires (reconcile planning)
//! - Applying mutations via the DnsProvider
//! - Emitting events for monitoring/logging
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ EventSource  │─── SourceEvent ────┐
//! └──────────────┘                    │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  SyncEngine  │── routes by IngressKey
//!                            └──────────────┘
//!                               │         │
//!                       ┌───────┘         └───────┐
//!                       ▼                         ▼
//!               ┌──────────────┐         ┌──────────────┐
//!               │ worker ns/a  │   ...   │ worker ns/z  │
//!               └──────────────┘         └──────────────┘
//!                       │                         │
//!                       └───────────┬─────────────┘
//!                                   ▼
//!                           ┌──────────────┐
//!                           │ DnsProvider  │
//!                           └──────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Event arrives and is routed to the worker owning its key
//! 2. Worker compares old and new address (update events)
//! 3. If changed, a plan is computed from the new snapshot
//! 4. Each planned op becomes one provider call; failures are isolated
//! 5. Engine events are emitted for monitoring
//!
//! ## Ordering
//!
//! Events for one ingress are handled strictly in delivery order by a
//! dedicated worker with a bounded queue; events for different ingresses
//! proceed concurrently. A worker lives until engine shutdown; the set of
//! distinct identities is bounded by the cluster, and keeping the worker
//! around means a delete followed by a re-create cannot interleave with the
//! tail of the previous lifecycle.

pub mod reconcile;

pub use reconcile::{RecordOp, plan_removal, plan_update};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::snapshot::{IngressKey, IngressSnapshot, address_changed};
use crate::traits::{DnsProvider, EventSource, IngressEvent, RecordType, SourceEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started consuming the source
    Started,

    /// The source finished replaying current state
    InitialSyncComplete,

    /// An ingress address changed and a reconciliation was planned
    AddressChanged {
        key: IngressKey,
        previous: Option<String>,
        current: Option<String>,
    },

    /// A record upsert succeeded
    UpsertApplied {
        hostname: String,
        target: String,
        record_type: RecordType,
    },

    /// A record upsert failed
    UpsertFailed { hostname: String, error: String },

    /// A record withdrawal succeeded
    Withdrawn { hostname: String },

    /// A record withdrawal failed
    WithdrawFailed { hostname: String, error: String },

    /// An ingress was deleted and its records withdrawn
    IngressRemoved { key: IngressKey },

    /// Engine stopped
    Stopped { reason: String },
}

/// DNS synchronization engine
///
/// The engine orchestrates the observed-event → DNS-mutation flow. It holds
/// no per-ingress state beyond the routing table of workers: every decision
/// is derived from the snapshots the event carries, so replaying an event
/// stream after a restart converges on the same provider calls.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Start with [`SyncEngine::run()`]
/// 3. Engine runs until the source ends or a shutdown signal arrives
pub struct SyncEngine {
    /// Event source to consume
    source: Box<dyn EventSource>,

    /// DNS provider shared by all workers
    provider: Arc<dyn DnsProvider>,

    /// Depth of each per-ingress work queue
    queue_depth: usize,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,

    /// Set once the source reports its initial replay is done
    initial_synced: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Create a new synchronization engine
    ///
    /// # Parameters
    ///
    /// - `source`: Event source implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: Controller configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events for monitoring
    pub fn new(
        source: Box<dyn EventSource>,
        provider: Arc<dyn DnsProvider>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            provider,
            queue_depth: config.engine.ingress_queue_depth,
            event_tx: tx,
            initial_synced: Arc::new(AtomicBool::new(false)),
        };

        Ok((engine, rx))
    }

    /// Run the engine
    ///
    /// Consumes the event stream until it ends or SIGINT arrives.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Test-only helper to run the engine with a controlled shutdown signal
    ///
    /// **TESTING ONLY**: contract tests require controlled shutdown.
    /// Production code should use `run()`, which shuts down on OS signals
    /// or end-of-stream instead of a programmatic channel.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    /// Internal run implementation that accepts an optional shutdown signal
    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(EngineEvent::Started);
        info!(
            "synchronizing DNS via provider {} from source {}",
            self.provider.provider_name(),
            self.source.source_name()
        );

        let mut stream = self.source.watch();
        let mut routes: HashMap<IngressKey, mpsc::Sender<IngressEvent>> = HashMap::new();
        let mut workers: JoinSet<()> = JoinSet::new();

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for provided shutdown signal
            loop {
                tokio::select! {
                    maybe_event = stream.next() => {
                        match maybe_event {
                            Some(event) => self.dispatch(event, &mut routes, &mut workers).await,
                            None => {
                                info!("event source closed, stopping");
                                self.emit_event(EngineEvent::Stopped {
                                    reason: "Event source closed".to_string(),
                                });
                                break;
                            }
                        }
                    }

                    _ = &mut rx => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT/SIGTERM
            loop {
                tokio::select! {
                    maybe_event = stream.next() => {
                        match maybe_event {
                            Some(event) => self.dispatch(event, &mut routes, &mut workers).await,
                            None => {
                                info!("event source closed, stopping");
                                self.emit_event(EngineEvent::Stopped {
                                    reason: "Event source closed".to_string(),
                                });
                                break;
                            }
                        }
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        // Closing the routes drains each worker's queue and lets it exit.
        drop(routes);
        while workers.join_next().await.is_some() {}
        info!("all ingress workers drained, engine stopped");

        Ok(())
    }

    /// Route one source event
    ///
    /// Ingress events go to the worker owning their key, spawning it on
    /// first sight; the sync marker flips the startup-logging switch.
    async fn dispatch(
        &self,
        event: SourceEvent,
        routes: &mut HashMap<IngressKey, mpsc::Sender<IngressEvent>>,
        workers: &mut JoinSet<()>,
    ) {
        match event {
            SourceEvent::InitialSyncComplete => {
                self.initial_synced.store(true, Ordering::SeqCst);
                info!("initial sync complete, {} ingresses known", routes.len());
                self.emit_event(EngineEvent::InitialSyncComplete);
            }
            SourceEvent::Ingress(event) => {
                let key = event.key().clone();
                let tx = routes
                    .entry(key.clone())
                    .or_insert_with(|| self.spawn_worker(key.clone(), workers))
                    .clone();

                // A full queue applies backpressure here rather than
                // reordering; send only fails if the worker died.
                if tx.send(event).await.is_err() {
                    warn!("worker for {} is gone, dropping event", key);
                    routes.remove(&key);
                }
            }
        }
    }

    /// Spawn the dedicated worker task for one ingress
    fn spawn_worker(
        &self,
        key: IngressKey,
        workers: &mut JoinSet<()>,
    ) -> mpsc::Sender<IngressEvent> {
        let (tx, mut rx) = mpsc::channel(self.queue_depth);

        let worker = IngressWorker {
            key,
            provider: Arc::clone(&self.provider),
            event_tx: self.event_tx.clone(),
            initial_synced: Arc::clone(&self.initial_synced),
        };

        workers.spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = worker.apply(event).await {
                    // Surfaced, not retried: planning is idempotent, so the
                    // next delivery of this state re-issues an equivalent
                    // request safely.
                    error!("reconciliation for {} failed: {}", worker.key, e);
                }
            }
            debug!("worker for {} stopped", worker.key);
        });

        tx
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging a warning if the channel is full. Dropping
        // monitoring events bounds memory when nobody drains the receiver.
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Per-ingress reconciliation worker
///
/// Owns no state between events: the event itself carries everything needed
/// for the old-vs-new comparison.
struct IngressWorker {
    key: IngressKey,
    provider: Arc<dyn DnsProvider>,
    event_tx: mpsc::Sender<EngineEvent>,
    initial_synced: Arc<AtomicBool>,
}

impl IngressWorker {
    /// Handle one event for this worker's ingress
    async fn apply(&self, event: IngressEvent) -> Result<()> {
        match event {
            IngressEvent::Added(snapshot) => {
                self.observe_added(&snapshot);
                Ok(())
            }
            IngressEvent::Updated { old, new } => self.reconcile_update(&old, &new).await,
            IngressEvent::Deleted(last) => self.remove(&last).await,
        }
    }

    /// Handle an add event
    ///
    /// No DNS mutation happens here: a freshly created ingress has no
    /// settled entry point yet, and its first address assignment arrives as
    /// an update event. Resync replays land here too, which is why the
    /// pre-sync variant logs quietly.
    fn observe_added(&self, snapshot: &IngressSnapshot) {
        if self.initial_synced.load(Ordering::SeqCst) {
            info!("ingress {} added: {}", self.key, snapshot.describe());
        } else {
            debug!("ingress {} replayed during initial sync", self.key);
        }
    }

    /// Handle an update event
    async fn reconcile_update(&self, old: &IngressSnapshot, new: &IngressSnapshot) -> Result<()> {
        let previous = old.address();
        let current = new.address();

        if !address_changed(previous, current) {
            debug!("ingress {} updated without address change", self.key);
            return Ok(());
        }

        info!(
            "ingress {} address changed: {} -> {}",
            self.key,
            previous.unwrap_or("none"),
            current.unwrap_or("none"),
        );
        self.emit(EngineEvent::AddressChanged {
            key: self.key.clone(),
            previous: previous.map(str::to_string),
            current: current.map(str::to_string),
        });

        if let Some(target) = current
            && RecordType::for_target(target) == RecordType::Cname
        {
            self.probe_target(target).await;
        }

        self.execute(plan_update(old, new)).await
    }

    /// Handle a delete event
    async fn remove(&self, last: &IngressSnapshot) -> Result<()> {
        info!("ingress {} deleted, withdrawing its records", self.key);

        let result = self.execute(plan_removal(last)).await;
        self.emit(EngineEvent::IngressRemoved {
            key: self.key.clone(),
        });
        result
    }

    /// Apply a plan, one provider call per op
    ///
    /// A failing hostname never stops the remaining ops; failures are
    /// counted, emitted, and folded into one error for the caller.
    async fn execute(&self, ops: Vec<RecordOp>) -> Result<()> {
        let mut failed = 0usize;

        for op in ops {
            if !self.provider.supports_host(op.hostname()) {
                warn!(
                    "provider {} does not manage host {}, skipping",
                    self.provider.provider_name(),
                    op.hostname()
                );
                continue;
            }

            match op {
                RecordOp::Upsert {
                    hostname,
                    target,
                    record_type,
                } => match self.provider.upsert(&hostname, &target, record_type).await {
                    Ok(outcome) => {
                        debug!(
                            "upserted {} record {} -> {}: {:?}",
                            record_type, hostname, target, outcome
                        );
                        self.emit(EngineEvent::UpsertApplied {
                            hostname,
                            target,
                            record_type,
                        });
                    }
                    Err(e) => {
                        failed += 1;
                        error!("upsert of {} -> {} failed: {}", hostname, target, e);
                        self.emit(EngineEvent::UpsertFailed {
                            hostname,
                            error: e.to_string(),
                        });
                    }
                },
                RecordOp::Withdraw { hostname } => match self.provider.withdraw(&hostname).await {
                    Ok(outcome) => {
                        debug!("withdrew record for {}: {:?}", hostname, outcome);
                        self.emit(EngineEvent::Withdrawn { hostname });
                    }
                    Err(e) => {
                        failed += 1;
                        error!("withdrawal of {} failed: {}", hostname, e);
                        self.emit(EngineEvent::WithdrawFailed {
                            hostname,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        if failed > 0 {
            Err(Error::dns_provider(format!(
                "{} record mutation(s) failed for {}",
                failed, self.key
            )))
        } else {
            Ok(())
        }
    }

    /// Best-effort forward resolution of an alias target.
    ///
    /// Advisory only: the record stays a CNAME whether or not the name
    /// resolves yet, since a not-yet-propagated load-balancer hostname is
    /// still the correct alias target. The outcome is a health signal.
    async fn probe_target(&self, target: &str) {
        match tokio::net::lookup_host((target, 0u16)).await {
            Ok(_) => debug!("alias target {} resolves", target),
            Err(e) => warn!(
                "alias target {} does not resolve yet ({}); keeping CNAME",
                target, e
            ),
        }
    }

    fn emit(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event");
        }
    }
}
