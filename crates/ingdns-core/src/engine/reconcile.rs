//! Reconciliation planning
//!
//! Planning turns an observed change into the list of DNS mutations that
//! converge the provider on the desired state. It is pure and stateless:
//! the same pair of snapshots always plans the same ops, in the same order,
//! which is what makes replayed events (crash-restart resync, caller-level
//! retry) safe to hand straight back to the provider.

use crate::snapshot::{IngressSnapshot, address_changed};
use crate::traits::RecordType;

/// One DNS mutation the provider must apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOp {
    /// Point `hostname` at `target` with the given record type
    Upsert {
        /// Hostname owned by the ingress
        hostname: String,
        /// Address the hostname should resolve to
        target: String,
        /// A for IP-literal targets, CNAME for name targets
        record_type: RecordType,
    },
    /// Remove the managed record for `hostname`
    Withdraw {
        /// Hostname owned by the ingress
        hostname: String,
    },
}

impl RecordOp {
    /// The hostname this op concerns
    pub fn hostname(&self) -> &str {
        match self {
            RecordOp::Upsert { hostname, .. } | RecordOp::Withdraw { hostname } => hostname,
        }
    }
}

/// Plan the mutations an update event requires.
///
/// Empty when the observed address did not change; equal addresses never
/// replan even on the first sighting, because the record type is recomputed
/// from scratch whenever a plan does run. Hostnames always come from the new
/// snapshot. When the address disappeared entirely, the hostnames are
/// withdrawn instead of written.
pub fn plan_update(old: &IngressSnapshot, new: &IngressSnapshot) -> Vec<RecordOp> {
    if !address_changed(old.address(), new.address()) {
        return Vec::new();
    }

    match new.address() {
        Some(target) => {
            let record_type = RecordType::for_target(target);
            new.hostnames()
                .iter()
                .map(|hostname| RecordOp::Upsert {
                    hostname: hostname.clone(),
                    target: target.to_string(),
                    record_type,
                })
                .collect()
        }
        None => plan_removal(new),
    }
}

/// Plan the withdrawals for a deleted (or address-less) ingress.
pub fn plan_removal(last: &IngressSnapshot) -> Vec<RecordOp> {
    last.hostnames()
        .iter()
        .map(|hostname| RecordOp::Withdraw {
            hostname: hostname.clone(),
        })
        .collect()
}
