//! Configuration types for the ingress-dns controller
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Event source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            source: SourceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.source.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, can be auto-detected)
        zone_id: Option<String>,
        /// Account ID (optional)
        account_id: Option<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Event source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Channel-backed source, fed by the embedding application.
    ///
    /// Built directly with `ChannelEventSource::new()` because the embedder
    /// needs the push handle; the registry cannot hand that back.
    #[default]
    Channel,

    /// Custom event source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the event source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Channel => Ok(()),
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom event source factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom event source config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Channel => "channel",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the monitoring event channel
    ///
    /// When full, new engine events are dropped (with a warning log). This
    /// bounds memory growth when nobody drains the receiver.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Depth of each per-ingress work queue
    ///
    /// Events for one ingress queue here while its worker is busy; a full
    /// queue applies backpressure to the dispatch loop rather than dropping
    /// or reordering events.
    #[serde(default = "default_ingress_queue_depth")]
    pub ingress_queue_depth: usize,

    /// Additional metadata to attach to operations
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "engine event channel capacity must be > 0",
            ));
        }
        if self.ingress_queue_depth == 0 {
            return Err(crate::Error::config("ingress queue depth must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            ingress_queue_depth: default_ingress_queue_depth(),
            metadata: HashMap::new(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_ingress_queue_depth() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloudflare(token: &str) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: token.to_string(),
            zone_id: None,
            account_id: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = SyncConfig::new(cloudflare("test-token"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_api_token_is_rejected() {
        let config = SyncConfig::new(cloudflare(""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn custom_provider_requires_factory_and_config() {
        let missing_factory = ProviderConfig::Custom {
            factory: String::new(),
            config: serde_json::json!({}),
        };
        assert!(missing_factory.validate().is_err());

        let null_config = ProviderConfig::Custom {
            factory: "route53".to_string(),
            config: serde_json::Value::Null,
        };
        assert!(null_config.validate().is_err());
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let mut config = SyncConfig::new(cloudflare("test-token"));
        config.engine.event_channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::new(cloudflare("test-token"));
        config.engine.ingress_queue_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn type_names() {
        assert_eq!(cloudflare("t").type_name(), "cloudflare");
        assert_eq!(SourceConfig::Channel.type_name(), "channel");
        let custom = SourceConfig::Custom {
            factory: "kube".to_string(),
            config: serde_json::json!({}),
        };
        assert_eq!(custom.type_name(), "kube");
    }
}
