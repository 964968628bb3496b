// # Channel Event Source
//
// Channel-backed implementation of EventSource.
//
// ## Purpose
//
// Bridges an external watch subscription into the engine: whatever owns the
// transport (a Kubernetes informer, a replayed event log, a test) pushes
// SourceEvents through a cloneable handle, and the engine consumes them as a
// stream. The channel is unbounded because the pushing side usually cannot
// tolerate backpressure without dropping its own upstream connection; bounds
// are applied downstream by the per-ingress work queues.
//
// ## When to Use
//
// - Embedding the engine in an application that already watches resources
// - Daemon integration layers that decode events from an external feed
// - Tests that need full control over event timing

use crate::snapshot::IngressSnapshot;
use crate::traits::{EventSource, IngressEvent, SourceEvent};
use std::pin::Pin;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Push side of a [`ChannelEventSource`].
///
/// Cheap to clone; all clones feed the same stream. Pushing after the engine
/// stopped is a no-op that reports `false`.
#[derive(Clone)]
pub struct SourceHandle {
    tx: mpsc::UnboundedSender<SourceEvent>,
}

impl SourceHandle {
    /// Push a raw source event. Returns `false` when the consuming stream is
    /// gone and the event was discarded.
    pub fn send(&self, event: SourceEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Report a newly observed resource
    pub fn added(&self, snapshot: IngressSnapshot) -> bool {
        self.send(SourceEvent::Ingress(IngressEvent::Added(snapshot)))
    }

    /// Report a change to a resource
    pub fn updated(&self, old: IngressSnapshot, new: IngressSnapshot) -> bool {
        self.send(SourceEvent::Ingress(IngressEvent::Updated { old, new }))
    }

    /// Report a removed resource, with its last known snapshot
    pub fn deleted(&self, last: IngressSnapshot) -> bool {
        self.send(SourceEvent::Ingress(IngressEvent::Deleted(last)))
    }

    /// Signal that the initial replay of current state is complete
    pub fn sync_complete(&self) -> bool {
        self.send(SourceEvent::InitialSyncComplete)
    }
}

/// Channel-backed event source implementation
///
/// # Example
///
/// ```rust
/// use ingdns_core::snapshot::{IngressKey, IngressSnapshot};
/// use ingdns_core::source::ChannelEventSource;
///
/// let (source, handle) = ChannelEventSource::new();
/// handle.added(IngressSnapshot::new(IngressKey::new("default", "web")));
/// handle.sync_complete();
/// // hand `source` to the engine, keep `handle` for the watch bridge
/// ```
pub struct ChannelEventSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<SourceEvent>>>,
}

impl ChannelEventSource {
    /// Create a source and the handle that feeds it
    pub fn new() -> (Self, SourceHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        let source = Self {
            rx: Mutex::new(Some(rx)),
        };

        (source, SourceHandle { tx })
    }
}

impl EventSource for ChannelEventSource {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = SourceEvent> + Send + 'static>> {
        // The receiver moves into the first stream; a second watch() gets a
        // stream that ends immediately, which the engine treats as a clean
        // source shutdown.
        let rx = self.rx.lock().ok().and_then(|mut guard| guard.take());

        match rx {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => {
                tracing::error!("watch() called twice on channel event source");
                let (_tx, rx) = mpsc::unbounded_channel();
                Box::pin(UnboundedReceiverStream::new(rx))
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "channel"
    }
}
