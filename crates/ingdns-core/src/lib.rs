// # ingdns-core
//
// Core library for the ingress-dns reconciliation controller.
//
// ## Architecture Overview
//
// This library keeps external DNS records pointed at the current
// load-balancer address of ingress resources:
// - **EventSource**: Trait for delivering ingress change events
// - **DnsProvider**: Trait for applying DNS record mutations via provider APIs
// - **SyncEngine**: Core engine that orchestrates the event → mutation flow
// - **ProviderRegistry**: Plugin-based registry for providers and sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Deciding what must change is separate from
//    watching resources and from talking to providers
// 2. **Event-Driven**: Async streams deliver change notifications; nothing
//    polls
// 3. **Stateless Core**: Every event carries the snapshots it needs; the
//    event source owns cache retention, so replaying events is always safe
// 4. **Per-Key Ordering**: Events for one ingress are serialized by a
//    dedicated worker; unrelated ingresses reconcile concurrently
// 5. **Idempotency**: Plans are pure functions of snapshots and provider
//    mutations absorb repeats, which removes apply-tracking bookkeeping

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, ProviderConfig, SourceConfig, SyncConfig};
pub use engine::{EngineEvent, RecordOp, SyncEngine};
pub use error::{Error, Result};
pub use registry::ProviderRegistry;
pub use snapshot::{IngressKey, IngressSnapshot, LoadBalancerEntry, address_changed};
pub use source::{ChannelEventSource, SourceHandle};
pub use traits::{
    DnsProvider, EventSource, IngressEvent, RecordType, SourceEvent, UpsertOutcome,
    WithdrawOutcome,
};
