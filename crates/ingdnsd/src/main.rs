// # ingdnsd - ingress-dns Daemon
//
// The ingdnsd daemon is a THIN integration layer:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Registering providers
// 4. Bridging the external event feed into the engine
// 5. Starting the sync engine
//
// All reconciliation logic lives in ingdns-core. Do not add business logic,
// DNS logic, or retry logic here.
//
// ## Event Feed
//
// Watching the cluster is owned by an external collaborator. Whatever holds
// the actual subscription (an informer sidecar, a replay tool, `kubectl`
// glue) writes one JSON event per line to this daemon's stdin:
//
// ```json
// {"type":"added","ingress":{"key":{"namespace":"default","name":"web"},"rule_hosts":["a.example.com"]}}
// {"type":"updated","old":{...},"new":{...}}
// {"type":"deleted","ingress":{...}}
// {"type":"sync_complete"}
// ```
//
// Malformed lines are logged and skipped; EOF is a clean shutdown.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### DNS Provider
// - `INGDNS_PROVIDER_TYPE`: Provider type (cloudflare)
// - `INGDNS_PROVIDER_API_TOKEN`: API token
// - `INGDNS_PROVIDER_ZONE_ID`: Zone ID (optional)
// - `INGDNS_MODE`: Set to "dry-run" to log mutations without applying them
//
// ### Engine
// - `INGDNS_QUEUE_DEPTH`: Depth of each per-ingress work queue
// - `INGDNS_EVENT_CHANNEL_CAPACITY`: Monitoring event channel capacity
//
// ### Logging
// - `INGDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export INGDNS_PROVIDER_TYPE=cloudflare
// export INGDNS_PROVIDER_API_TOKEN=your_token
//
// ingress-watch --format ndjson | ingdnsd
// ```

use anyhow::Result;
use ingdns_core::snapshot::IngressSnapshot;
use ingdns_core::source::SourceHandle;
use ingdns_core::{ChannelEventSource, IngressEvent, SourceEvent, SyncEngine};
use serde::Deserialize;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IngdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<IngdnsExitCode> for ExitCode {
    fn from(code: IngdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    provider_type: String,
    provider_api_token: String,
    provider_zone_id: Option<String>,
    provider_account_id: Option<String>,
    queue_depth: Option<usize>,
    event_channel_capacity: Option<usize>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            provider_type: env::var("INGDNS_PROVIDER_TYPE")
                .unwrap_or_else(|_| "cloudflare".to_string()),
            provider_api_token: env::var("INGDNS_PROVIDER_API_TOKEN")?,
            provider_zone_id: env::var("INGDNS_PROVIDER_ZONE_ID").ok(),
            provider_account_id: env::var("INGDNS_PROVIDER_ACCOUNT_ID").ok(),
            queue_depth: env::var("INGDNS_QUEUE_DEPTH").ok().map(|s| s.parse().unwrap_or(64)),
            event_channel_capacity: env::var("INGDNS_EVENT_CHANNEL_CAPACITY")
                .ok()
                .map(|s| s.parse().unwrap_or(1000)),
            log_level: env::var("INGDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Covers required field presence, token sanity (length, placeholder
    /// detection), type enumeration, numeric ranges, and log level.
    fn validate(&self) -> Result<()> {
        if self.provider_api_token.is_empty() {
            anyhow::bail!(
                "INGDNS_PROVIDER_API_TOKEN is required. \
                Set it via: export INGDNS_PROVIDER_API_TOKEN=your_token"
            );
        }

        // Cloudflare API tokens are typically 40 characters alphanumeric.
        // Other providers may have different formats, so only basic checks.
        if self.provider_api_token.len() < 20 {
            anyhow::bail!(
                "INGDNS_PROVIDER_API_TOKEN appears too short ({} chars). \
                Cloudflare tokens are typically 40 characters. \
                Verify your token is correct.",
                self.provider_api_token.len()
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.provider_api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("example")
            || token_lower == "token"
        {
            anyhow::bail!(
                "INGDNS_PROVIDER_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        match self.provider_type.as_str() {
            "cloudflare" => {}
            _ => anyhow::bail!(
                "INGDNS_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare",
                self.provider_type
            ),
        }

        if let Some(depth) = self.queue_depth
            && !(1..=4096).contains(&depth)
        {
            anyhow::bail!("INGDNS_QUEUE_DEPTH must be between 1 and 4096. Got: {}", depth);
        }

        if let Some(capacity) = self.event_channel_capacity
            && !(1..=100_000).contains(&capacity)
        {
            anyhow::bail!(
                "INGDNS_EVENT_CHANNEL_CAPACITY must be between 1 and 100000. Got: {}",
                capacity
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "INGDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the engine configuration from the validated values
    fn sync_config(&self) -> ingdns_core::SyncConfig {
        let provider = ingdns_core::ProviderConfig::Cloudflare {
            api_token: self.provider_api_token.clone(),
            zone_id: self.provider_zone_id.clone(),
            account_id: self.provider_account_id.clone(),
        };

        let mut config = ingdns_core::SyncConfig::new(provider);
        if let Some(depth) = self.queue_depth {
            config.engine.ingress_queue_depth = depth;
        }
        if let Some(capacity) = self.event_channel_capacity {
            config.engine.event_channel_capacity = capacity;
        }
        config
    }
}

/// One line of the stdin event feed
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Added {
        ingress: IngressSnapshot,
    },
    Updated {
        old: IngressSnapshot,
        new: IngressSnapshot,
    },
    Deleted {
        ingress: IngressSnapshot,
    },
    SyncComplete,
}

impl From<WireEvent> for SourceEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Added { ingress } => SourceEvent::Ingress(IngressEvent::Added(ingress)),
            WireEvent::Updated { old, new } => {
                SourceEvent::Ingress(IngressEvent::Updated { old, new })
            }
            WireEvent::Deleted { ingress } => SourceEvent::Ingress(IngressEvent::Deleted(ingress)),
            WireEvent::SyncComplete => SourceEvent::InitialSyncComplete,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IngdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IngdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IngdnsExitCode::ConfigError.into();
    }

    info!("Starting ingdnsd daemon");
    info!("Provider type: {}", config.provider_type);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IngdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            IngdnsExitCode::RuntimeError
        } else {
            IngdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    // Create provider registry and register built-ins
    let registry = ingdns_core::ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        ingdns_provider_cloudflare::register(&registry);
    }

    let sync_config = config.sync_config();
    let provider: Arc<dyn ingdns_core::DnsProvider> =
        Arc::from(registry.create_provider(&sync_config.provider)?);

    // The event feed arrives on stdin; bridge it into a channel source.
    let (source, handle) = ChannelEventSource::new();
    let bridge = tokio::spawn(run_stdin_bridge(handle));

    let (engine, mut event_rx) = SyncEngine::new(Box::new(source), provider, sync_config)?;

    // Keep the monitoring channel drained; the events are already logged by
    // the engine, so debug level is enough here.
    let monitor = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::debug!("engine event: {:?}", event);
        }
    });

    info!("Starting sync engine");
    engine.run().await?;

    bridge.abort();
    monitor.abort();
    info!("Daemon stopped");

    Ok(())
}

/// Read NDJSON events from stdin and push them into the engine's source
///
/// Runs until EOF, a read error, or the engine going away. Malformed lines
/// are skipped: one broken event must not take the feed down.
async fn run_stdin_bridge(handle: SourceHandle) {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match serde_json::from_str::<WireEvent>(line) {
                    Ok(event) => {
                        if !handle.send(event.into()) {
                            info!("Engine stopped consuming events, closing bridge");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Skipping malformed event line: {}", e);
                    }
                }
            }
            Ok(None) => {
                info!("Event feed closed (stdin EOF)");
                break;
            }
            Err(e) => {
                error!("Failed to read event feed: {}", e);
                break;
            }
        }
    }
}
