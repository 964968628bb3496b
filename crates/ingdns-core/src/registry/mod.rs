//! Plugin-based component registry
//!
//! The registry allows DNS providers and event sources to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ingdns_core::registry::ProviderRegistry;
//! use ingdns_core::config::ProviderConfig;
//!
//! // Create a registry
//! let registry = ProviderRegistry::new();
//!
//! // Register providers
//! registry.register_provider("cloudflare", Box::new(cloudflare_factory));
//!
//! // Create provider from config
//! let config = ProviderConfig::Cloudflare { /* ... */ };
//! let provider = registry.create_provider(&config)?;
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In ingdns-provider-cloudflare crate
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::{ProviderConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, EventSource, EventSourceFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for plugin-based provider and event source creation
///
/// The registry maintains maps of type names to factory objects, allowing
/// dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: concurrent reads, exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered event source factories
    sources: RwLock<HashMap<String, Box<dyn EventSourceFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare", "route53")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let name = name.into();
        let mut providers = self.providers.write().unwrap();
        providers.insert(name, factory);
    }

    /// Register an event source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "kube-informer")
    /// - `factory`: Factory object for creating event source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn EventSourceFactory>) {
        let name = name.into();
        let mut sources = self.sources.write().unwrap();
        sources.insert(name, factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();
        let providers = self.providers.read().unwrap();

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create an event source from configuration
    ///
    /// The channel source is not created here: its push handle only exists
    /// at construction time, so embedders call `ChannelEventSource::new()`
    /// directly and keep the handle.
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn EventSource>> {
        let source_type = match config {
            SourceConfig::Channel => {
                return Err(Error::config(
                    "channel event source is embedded; construct it with ChannelEventSource::new()",
                ));
            }
            SourceConfig::Custom { factory, .. } => factory.as_str(),
        };

        let sources = self.sources.read().unwrap();

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown event source type: {}", source_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap();
        providers.keys().cloned().collect()
    }

    /// List all registered event source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap();
        sources.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap();
        providers.contains_key(name)
    }

    /// Check if an event source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap();
        sources.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProviderFactory;

    impl DnsProviderFactory for MockProviderFactory {
        fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
            Err(Error::not_found("Mock provider not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ProviderRegistry::new();

        // Initially empty
        assert!(!registry.has_provider("mock"));

        // Register
        registry.register_provider("mock", Box::new(MockProviderFactory));

        // Now present
        assert!(registry.has_provider("mock"));
        assert!(registry.list_providers().contains(&"mock".to_string()));
    }

    #[test]
    fn channel_source_is_not_registry_built() {
        let registry = ProviderRegistry::new();
        assert!(registry.create_source(&SourceConfig::Channel).is_err());
    }

    #[test]
    fn unknown_custom_source_is_an_error() {
        let registry = ProviderRegistry::new();
        let config = SourceConfig::Custom {
            factory: "kube".to_string(),
            config: serde_json::json!({}),
        };
        assert!(registry.create_source(&config).is_err());
    }
}
