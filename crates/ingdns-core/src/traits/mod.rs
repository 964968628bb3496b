//! Boundary contracts for the ingress-dns controller
//!
//! This module defines the abstract interfaces the core depends on.
//!
//! - [`EventSource`]: Deliver ingress change events in causal per-key order
//! - [`DnsProvider`]: Apply idempotent DNS record mutations

pub mod dns_provider;
pub mod event_source;

pub use dns_provider::{
    DnsProvider, DnsProviderFactory, RecordType, UpsertOutcome, WithdrawOutcome,
};
pub use event_source::{EventSource, EventSourceFactory, IngressEvent, SourceEvent};
