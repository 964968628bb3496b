// # Event Source Trait
//
// Defines the interface for delivering ingress change notifications.
//
// ## Implementations
//
// - Channel-backed (embedding): `crate::source::ChannelEventSource`
// - External: whatever owns the actual watch subscription (a Kubernetes
//   informer, a polling client, a replayed log) bridges into the channel
//   source or implements this trait directly.
//
// ## Usage
//
// ```rust,ignore
// use ingdns_core::EventSource;
// use tokio_stream::StreamExt;
//
// let source = /* EventSource implementation */;
// let mut stream = source.watch();
// while let Some(event) = stream.next().await {
//     println!("observed: {:?}", event);
// }
// ```

use crate::snapshot::{IngressKey, IngressSnapshot};
use std::pin::Pin;
use tokio_stream::Stream;

/// A change notification for one ingress resource.
///
/// Updated carries both sides of the change so the engine can compare the
/// old and new address without holding any cache of its own; the event
/// source is the component responsible for retaining state across events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressEvent {
    /// The resource was first observed
    Added(IngressSnapshot),
    /// The resource changed; both snapshots describe the same identity
    Updated {
        /// Snapshot before the change (whatever the source last knew)
        old: IngressSnapshot,
        /// Snapshot after the change
        new: IngressSnapshot,
    },
    /// The resource was removed; the snapshot is the last known state
    Deleted(IngressSnapshot),
}

impl IngressEvent {
    /// Identity of the resource this event concerns
    pub fn key(&self) -> &IngressKey {
        match self {
            IngressEvent::Added(snapshot) | IngressEvent::Deleted(snapshot) => &snapshot.key,
            IngressEvent::Updated { new, .. } => &new.key,
        }
    }
}

/// Item yielded by [`EventSource::watch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A change to one ingress resource
    Ingress(IngressEvent),
    /// Emitted once, after the source has replayed the current state of all
    /// resources it knows about. Used to tone down startup logging; it does
    /// not change reconciliation behavior.
    InitialSyncComplete,
}

/// Trait for event source implementations
///
/// # Delivery Contract
///
/// - Events for one [`IngressKey`] must arrive in causal order; events for
///   different keys may interleave freely.
/// - A disconnect/resync is delivered as plain events (typically the full
///   current state replayed). The engine handles replay without special
///   cases, so sources need no dedup bookkeeping.
/// - The stream ends only when the source shuts down for good; the engine
///   treats end-of-stream as a clean stop.
///
/// # Trust Level: Semi-Trusted
///
/// Sources observe and report; they must not make reconciliation decisions,
/// call DNS providers, or retry on the engine's behalf.
pub trait EventSource: Send + Sync {
    /// Watch for ingress events.
    ///
    /// Returns a stream of [`SourceEvent`] items. Must be cancellation-safe:
    /// dropping the stream releases whatever the source holds for it.
    fn watch(&self) -> Pin<Box<dyn Stream<Item = SourceEvent> + Send + 'static>>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing event sources from configuration
pub trait EventSourceFactory: Send + Sync {
    /// Create an EventSource instance from configuration
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn EventSource>, crate::Error>;
}
