// # DNS Provider Trait
//
// Defines the interface for applying DNS record mutations via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `ingdns-provider-cloudflare` crate
// - Future: Route53, DigitalOcean, RFC 2136, etc.
//
// ## Trust Level: Untrusted
//
// Providers are external integrations with strict limitations. Allowed:
// HTTP/HTTPS calls to their own endpoints, parsing their own responses,
// returning success or failure per call. Forbidden: retry/backoff logic
// (owned by the caller, which can replay safely because every mutation is
// idempotent), spawning tasks, caching state between calls, deciding
// whether a mutation is needed (owned by `SyncEngine`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// DNS record type for a reconciled hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// Address record: hostname maps to an IP literal
    A,
    /// Alias record: hostname maps to another hostname
    Cname,
}

impl RecordType {
    /// Record type for a concrete target address.
    ///
    /// The choice is syntactic: a target that parses as an IPv4 or IPv6
    /// literal gets an A record, anything else a CNAME. Whether an alias
    /// target currently resolves is deliberately not consulted: a freshly
    /// provisioned load-balancer hostname that has not propagated yet is
    /// still a CNAME target, and folding resolvability into the choice would
    /// make the record type flap.
    pub fn for_target(target: &str) -> RecordType {
        if target.parse::<IpAddr>().is_ok() {
            RecordType::A
        } else {
            RecordType::Cname
        }
    }

    /// Classify an optional address.
    ///
    /// `None` (or an empty string) means there is nothing to write and no
    /// mutation may be attempted.
    pub fn classify(address: Option<&str>) -> Option<RecordType> {
        address
            .filter(|target| !target.is_empty())
            .map(Self::for_target)
    }

    /// Wire name of the record type ("A" / "CNAME")
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an upsert operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed; one was created
    Created {
        /// The target written
        target: String,
    },
    /// A record existed with a different target and was rewritten
    Updated {
        /// The previous target
        previous: String,
        /// The target written
        target: String,
    },
    /// The record already carried the requested target (no-op)
    Unchanged {
        /// The current target
        target: String,
    },
}

/// Result of a withdraw operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    /// A managed record existed and was removed
    Withdrawn,
    /// No record existed for the hostname (no-op)
    Absent,
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the engine shares one provider
/// across its per-ingress workers.
///
/// # Idempotency
///
/// Both operations must be safe to call repeatedly with identical arguments.
/// The engine relies on this: after a crash-restart the event source replays
/// state, the engine replans the same mutations, and re-applying them must
/// be a no-op. Each call reports success or failure individually; providers
/// must not batch silently.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create or update the record for `hostname` so it points at `target`.
    ///
    /// Cases an implementation must handle:
    /// - No record exists → create it, return `Created`
    /// - Record exists with a different target → rewrite it, return `Updated`
    /// - Record exists with the same target → no-op, return `Unchanged`
    async fn upsert(
        &self,
        hostname: &str,
        target: &str,
        record_type: RecordType,
    ) -> Result<UpsertOutcome, crate::Error>;

    /// Remove the managed record for `hostname`, if any.
    ///
    /// Withdrawing a hostname that has no record is not an error; return
    /// `Absent`.
    async fn withdraw(&self, hostname: &str) -> Result<WithdrawOutcome, crate::Error>;

    /// Check if this provider can manage records for the given hostname
    fn supports_host(&self, hostname: &str) -> bool;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
