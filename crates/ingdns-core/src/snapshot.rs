//! Observed ingress state
//!
//! An [`IngressSnapshot`] is the immutable picture of one ingress resource at
//! the moment an event was delivered: the hostnames it declares and the
//! load-balancer entry points it currently carries. The event source builds a
//! fresh snapshot for every observed change; nothing in this crate mutates one
//! after construction.
//!
//! The snapshot owns the two pure derivations the synchronizer runs on every
//! event: which hostnames the resource claims for DNS ([`IngressSnapshot::hostnames`])
//! and which single address those hostnames should resolve to
//! ([`IngressSnapshot::address`]).

use serde::{Deserialize, Serialize};

/// Identity of an ingress resource: a (namespace, name) pair, stable for the
/// resource's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressKey {
    /// Namespace the resource lives in
    pub namespace: String,
    /// Resource name, unique within its namespace
    pub name: String,
}

impl IngressKey {
    /// Create a new ingress key
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for IngressKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One load-balancer entry point as reported in the resource's status.
///
/// Either field may be missing; an empty string is treated the same as a
/// missing field when extracting the address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerEntry {
    /// DNS hostname of the entry point, if the platform assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// IP literal of the entry point, if the platform assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl LoadBalancerEntry {
    /// Entry point known by hostname
    pub fn from_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            ip: None,
        }
    }

    /// Entry point known by IP literal
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            hostname: None,
            ip: Some(ip.into()),
        }
    }
}

/// Immutable snapshot of one ingress resource at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressSnapshot {
    /// Resource identity
    pub key: IngressKey,
    /// Hostnames declared for TLS routing, in declaration order
    #[serde(default)]
    pub tls_hosts: Vec<String>,
    /// Hostnames declared on plain routing rules, in declaration order
    #[serde(default)]
    pub rule_hosts: Vec<String>,
    /// Load-balancer entry points currently assigned, in status order
    #[serde(default)]
    pub load_balancer: Vec<LoadBalancerEntry>,
}

impl IngressSnapshot {
    /// Create a snapshot with no hostnames and no assigned entry point
    pub fn new(key: IngressKey) -> Self {
        Self {
            key,
            tls_hosts: Vec::new(),
            rule_hosts: Vec::new(),
            load_balancer: Vec::new(),
        }
    }

    /// Set the TLS hostnames
    pub fn with_tls_hosts(mut self, hosts: Vec<String>) -> Self {
        self.tls_hosts = hosts;
        self
    }

    /// Set the rule hostnames
    pub fn with_rule_hosts(mut self, hosts: Vec<String>) -> Self {
        self.rule_hosts = hosts;
        self
    }

    /// Set the load-balancer entry points
    pub fn with_load_balancer(mut self, entries: Vec<LoadBalancerEntry>) -> Self {
        self.load_balancer = entries;
        self
    }

    /// Hostnames this resource owns for DNS purposes.
    ///
    /// TLS hostnames shadow rule hostnames as a whole: when any TLS hostname
    /// is declared, the rule hostnames are ignored entirely rather than
    /// merged. Order and duplicates are preserved from the declaration. The
    /// assigned address plays no part in the result.
    pub fn hostnames(&self) -> &[String] {
        if !self.tls_hosts.is_empty() {
            &self.tls_hosts
        } else {
            &self.rule_hosts
        }
    }

    /// The single address the resource's hostnames should resolve to, if any.
    ///
    /// Entry points known by hostname outrank entry points known only by IP:
    /// every entry is scanned for a hostname before any IP is considered, and
    /// within each pass the first non-empty field wins. Deterministic for a
    /// given snapshot.
    pub fn address(&self) -> Option<&str> {
        if let Some(hostname) = self
            .load_balancer
            .iter()
            .find_map(|entry| non_empty(entry.hostname.as_deref()))
        {
            return Some(hostname);
        }

        let ip = self
            .load_balancer
            .iter()
            .find_map(|entry| non_empty(entry.ip.as_deref()));

        if ip.is_none() && !self.load_balancer.is_empty() {
            // Entry points with neither field usable degrade to "no address"
            // instead of failing the event.
            tracing::debug!(
                "ingress {} has {} entry point(s) but no usable address",
                self.key,
                self.load_balancer.len()
            );
        }

        ip
    }

    /// Compact JSON rendering of the snapshot for log lines.
    ///
    /// Returns an empty string if serialization fails; a broken log line must
    /// never fail event handling.
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Whether a reconciliation run is required for an old/new address pair.
///
/// Required exactly when the two differ, including the none-to-address and
/// address-to-none transitions. Equal non-empty addresses never require a
/// run; the record type is recomputed fresh on every run anyway.
pub fn address_changed(old: Option<&str>, new: Option<&str>) -> bool {
    old != new
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> IngressKey {
        IngressKey::new("default", "web")
    }

    #[test]
    fn tls_hosts_shadow_rule_hosts() {
        let snapshot = IngressSnapshot::new(key())
            .with_tls_hosts(vec!["secure.example.com".to_string()])
            .with_rule_hosts(vec!["plain.example.com".to_string()]);

        assert_eq!(snapshot.hostnames(), ["secure.example.com".to_string()]);
    }

    #[test]
    fn rule_hosts_used_when_no_tls_hosts() {
        let snapshot = IngressSnapshot::new(key()).with_rule_hosts(vec![
            "a.example.com".to_string(),
            "b.example.com".to_string(),
        ]);

        assert_eq!(
            snapshot.hostnames(),
            ["a.example.com".to_string(), "b.example.com".to_string()]
        );
    }

    #[test]
    fn hostnames_preserve_order_and_duplicates() {
        let snapshot = IngressSnapshot::new(key()).with_tls_hosts(vec![
            "b.example.com".to_string(),
            "a.example.com".to_string(),
            "a.example.com".to_string(),
        ]);

        assert_eq!(
            snapshot.hostnames(),
            [
                "b.example.com".to_string(),
                "a.example.com".to_string(),
                "a.example.com".to_string(),
            ]
        );
    }

    #[test]
    fn no_hostnames_yields_empty_slice() {
        let snapshot = IngressSnapshot::new(key());
        assert!(snapshot.hostnames().is_empty());
    }

    #[test]
    fn address_prefers_hostname_over_ip_across_entries() {
        // The IP-only entry comes first, but any hostname entry outranks it.
        let snapshot = IngressSnapshot::new(key()).with_load_balancer(vec![
            LoadBalancerEntry::from_ip("203.0.113.5"),
            LoadBalancerEntry::from_hostname("lb.example.net"),
        ]);

        assert_eq!(snapshot.address(), Some("lb.example.net"));
    }

    #[test]
    fn address_falls_back_to_first_ip() {
        let snapshot = IngressSnapshot::new(key()).with_load_balancer(vec![
            LoadBalancerEntry::default(),
            LoadBalancerEntry::from_ip("203.0.113.5"),
            LoadBalancerEntry::from_ip("203.0.113.6"),
        ]);

        assert_eq!(snapshot.address(), Some("203.0.113.5"));
    }

    #[test]
    fn address_none_without_entries() {
        assert_eq!(IngressSnapshot::new(key()).address(), None);
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let snapshot = IngressSnapshot::new(key()).with_load_balancer(vec![LoadBalancerEntry {
            hostname: Some(String::new()),
            ip: Some(String::new()),
        }]);

        assert_eq!(snapshot.address(), None);
    }

    #[test]
    fn address_is_deterministic() {
        let snapshot = IngressSnapshot::new(key()).with_load_balancer(vec![
            LoadBalancerEntry::from_hostname("lb.example.net"),
            LoadBalancerEntry::from_ip("203.0.113.5"),
        ]);

        assert_eq!(snapshot.address(), snapshot.address());
    }

    #[test]
    fn change_detection() {
        assert!(!address_changed(None, None));
        assert!(!address_changed(Some("203.0.113.5"), Some("203.0.113.5")));
        assert!(address_changed(None, Some("203.0.113.5")));
        assert!(address_changed(Some("203.0.113.5"), None));
        assert!(address_changed(Some("203.0.113.5"), Some("lb.example.net")));
    }

    #[test]
    fn describe_renders_json() {
        let snapshot =
            IngressSnapshot::new(key()).with_rule_hosts(vec!["a.example.com".to_string()]);
        let description = snapshot.describe();

        assert!(description.contains("\"namespace\":\"default\""));
        assert!(description.contains("a.example.com"));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = IngressSnapshot::new(key())
            .with_tls_hosts(vec!["secure.example.com".to_string()])
            .with_load_balancer(vec![LoadBalancerEntry::from_ip("203.0.113.5")]);

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: IngressSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
