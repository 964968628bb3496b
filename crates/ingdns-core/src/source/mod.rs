//! Event source implementations bundled with the core
//!
//! The only built-in source is channel-backed: the embedding application (or
//! daemon) owns the actual watch transport and pushes digested events through
//! a [`SourceHandle`]. External transports with their own lifecycle implement
//! [`crate::traits::EventSource`] directly instead.

pub mod channel;

pub use channel::{ChannelEventSource, SourceHandle};
