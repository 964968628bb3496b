// # Cloudflare DNS Provider
//
// Cloudflare implementation of the DnsProvider contract: idempotent upsert
// and withdrawal of A/CNAME records over the Cloudflare API v4.
//
// ## Behavior
//
// - One logical operation per engine call; full error propagation (retry is
//   owned by the caller, never by the provider)
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode for safe testing: all GET lookups run, mutations are logged
//   instead of sent
// - Zone auto-discovery from the hostname, or an explicit zone ID
// - NO retry/backoff/caching/background tasks (intentionally omitted)
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ingdns_core::config::ProviderConfig;
use ingdns_core::traits::{
    DnsProvider, DnsProviderFactory, RecordType, UpsertOutcome, WithdrawOutcome,
};
use ingdns_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// TTL written on managed records; 1 means "automatic" to Cloudflare
const AUTO_TTL: u32 = 1;

/// An existing DNS record as returned by the list endpoint
#[derive(Debug, Clone)]
struct ExistingRecord {
    id: String,
    content: String,
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider performs all GET requests (zone
/// lookup, record lookup), logs the intended mutation, and does NOT modify
/// DNS records.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, can be auto-detected from the hostname)
    zone_id: Option<String>,

    /// Account ID (optional, for some operations)
    account_id: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip mutations
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("account_id", &self.account_id)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (can be auto-detected)
    /// - `account_id`: Optional account ID
    /// - `dry_run`: If true, perform GET requests but skip mutations
    ///
    /// # Panics
    ///
    /// Panics if the API token is empty; a provider without credentials must
    /// fail at startup, not on the first reconciliation.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        account_id: Option<String>,
        dry_run: bool,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        let api_token = api_token.into();

        if api_token.is_empty() {
            panic!("Cloudflare API token cannot be empty");
        }

        Self {
            api_token,
            zone_id,
            account_id,
            client,
            dry_run,
        }
    }

    /// Create a new Cloudflare provider (production/live mode)
    pub fn new_live(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        account_id: Option<String>,
    ) -> Self {
        Self::new(api_token, zone_id, account_id, false)
    }

    /// Create a new Cloudflare provider (dry-run mode)
    pub fn new_dry_run(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        account_id: Option<String>,
    ) -> Self {
        Self::new(api_token, zone_id, account_id, true)
    }

    /// Get the zone ID for a hostname
    ///
    /// If zone_id is pre-configured, returns it directly. Otherwise, derives
    /// the zone apex from the hostname and queries the Cloudflare API.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn get_zone_id(&self, hostname: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.to_string());
        }

        let zone_name = zone_apex(hostname)?;
        tracing::debug!("Looking up zone ID for zone: {}", zone_name);

        let url = format!("{}/zones?name={}", CLOUDFLARE_API_BASE, zone_name);
        let response = self.get(&url, "zone lookup").await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {}", e)))?;

        let zones = json["result"].as_array().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: result is not an array")
        })?;

        let zone = zones
            .first()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))?;

        let zone_id = zone["id"].as_str().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: zone.id is not a string")
        })?;

        tracing::debug!("Found zone ID: {}", zone_id);
        Ok(zone_id.to_string())
    }

    /// Look up the existing record for a hostname and record type, if any
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=example.com&type=A
    /// Authorization: Bearer <token>
    /// ```
    async fn find_record(
        &self,
        zone_id: &str,
        hostname: &str,
        record_type: RecordType,
    ) -> Result<Option<ExistingRecord>> {
        tracing::debug!("Looking up record: {} (type: {})", hostname, record_type);

        let url = format!(
            "{}/zones/{}/dns_records?name={}&type={}",
            CLOUDFLARE_API_BASE, zone_id, hostname, record_type
        );
        let response = self.get(&url, "record lookup").await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {}", e)))?;

        let records = json["result"].as_array().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: result is not an array")
        })?;

        let Some(record) = records.first() else {
            return Ok(None);
        };

        let id = record["id"].as_str().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: record.id is not a string")
        })?;
        let content = record["content"].as_str().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: content is not a string")
        })?;

        Ok(Some(ExistingRecord {
            id: id.to_string(),
            content: content.to_string(),
        }))
    }

    /// Perform a GET and map failure statuses to provider errors
    async fn get(&self, url: &str, what: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;

        Self::check_status(response, what).await
    }

    /// Map a failing response to the matching error variant
    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "{} rejected: invalid API token or insufficient permissions (status {})",
                what, status
            )),
            404 => Error::not_found(format!("{}: not found (status {})", what, status)),
            409 => Error::provider(
                "cloudflare",
                format!(
                    "{} conflict: record is being modified by another process (status {})",
                    what, status
                ),
            ),
            429 => Error::rate_limited(format!("{}: Cloudflare rate limit exceeded", what)),
            500..=599 => Error::provider(
                "cloudflare",
                format!(
                    "Cloudflare server error (transient) during {}: {} - {}",
                    what, status, error_text
                ),
            ),
            _ => Error::provider(
                "cloudflare",
                format!("{} failed: {} - {}", what, status, error_text),
            ),
        })
    }

    /// Record payload for create/update calls
    fn record_payload(hostname: &str, target: &str, record_type: RecordType) -> Value {
        serde_json::json!({
            "type": record_type.as_str(),
            "name": hostname,
            "content": target,
            "ttl": AUTO_TTL,
            "proxied": false,
        })
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Create or update the record for a hostname
    ///
    /// This implementation:
    /// - Looks up the zone and any existing record of the requested type
    /// - Returns `Unchanged` without a mutation when the content matches
    /// - PUTs an update when the content differs, POSTs a create otherwise
    /// - Never logs the API token, never retries, never caches
    /// - In dry-run mode, logs intended changes without making them
    async fn upsert(
        &self,
        hostname: &str,
        target: &str,
        record_type: RecordType,
    ) -> Result<UpsertOutcome> {
        tracing::info!(
            "Upserting Cloudflare {} record: {} -> {} [mode: {}]",
            record_type,
            hostname,
            target,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let zone_id = self.get_zone_id(hostname).await?;
        let existing = self.find_record(&zone_id, hostname, record_type).await?;

        match existing {
            Some(record) if record.content == target => {
                tracing::info!("Record {} already points at {}", hostname, target);
                Ok(UpsertOutcome::Unchanged {
                    target: target.to_string(),
                })
            }
            Some(record) => {
                let url = format!(
                    "{}/zones/{}/dns_records/{}",
                    CLOUDFLARE_API_BASE, zone_id, record.id
                );
                let payload = Self::record_payload(hostname, target, record_type);

                if self.dry_run {
                    tracing::info!(
                        "[DRY-RUN] Would send PUT to {} with payload: {}",
                        url,
                        payload
                    );
                    return Ok(UpsertOutcome::Updated {
                        previous: record.content,
                        target: target.to_string(),
                    });
                }

                let response = self
                    .client
                    .put(&url)
                    .bearer_auth(&self.api_token)
                    .header("Content-Type", "application/json")
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| {
                        Error::provider("cloudflare", format!("HTTP request failed: {}", e))
                    })?;
                Self::check_status(response, "record update").await?;

                tracing::info!(
                    "Record updated: {} -> {} (was: {})",
                    hostname,
                    target,
                    record.content
                );
                Ok(UpsertOutcome::Updated {
                    previous: record.content,
                    target: target.to_string(),
                })
            }
            None => {
                let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone_id);
                let payload = Self::record_payload(hostname, target, record_type);

                if self.dry_run {
                    tracing::info!(
                        "[DRY-RUN] Would send POST to {} with payload: {}",
                        url,
                        payload
                    );
                    return Ok(UpsertOutcome::Created {
                        target: target.to_string(),
                    });
                }

                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_token)
                    .header("Content-Type", "application/json")
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| {
                        Error::provider("cloudflare", format!("HTTP request failed: {}", e))
                    })?;
                Self::check_status(response, "record create").await?;

                tracing::info!("Record created: {} -> {}", hostname, target);
                Ok(UpsertOutcome::Created {
                    target: target.to_string(),
                })
            }
        }
    }

    /// Remove the managed A/CNAME records for a hostname
    ///
    /// Both managed types are checked because the record type follows the
    /// target: a hostname that moved from an IP to an alias (or back) may
    /// hold either kind when it is withdrawn.
    async fn withdraw(&self, hostname: &str) -> Result<WithdrawOutcome> {
        tracing::info!(
            "Withdrawing Cloudflare records for {} [mode: {}]",
            hostname,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let zone_id = self.get_zone_id(hostname).await?;
        let mut removed = 0usize;

        for record_type in [RecordType::A, RecordType::Cname] {
            let Some(record) = self.find_record(&zone_id, hostname, record_type).await? else {
                continue;
            };

            let url = format!(
                "{}/zones/{}/dns_records/{}",
                CLOUDFLARE_API_BASE, zone_id, record.id
            );

            if self.dry_run {
                tracing::info!(
                    "[DRY-RUN] Would send DELETE to {} ({} record, content {})",
                    url,
                    record_type,
                    record.content
                );
                removed += 1;
                continue;
            }

            let response = self
                .client
                .delete(&url)
                .bearer_auth(&self.api_token)
                .header("Content-Type", "application/json")
                .send()
                .await
                .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;
            Self::check_status(response, "record delete").await?;

            tracing::info!("Record removed: {} ({})", hostname, record_type);
            removed += 1;
        }

        if removed > 0 {
            Ok(WithdrawOutcome::Withdrawn)
        } else {
            tracing::debug!("No managed record found for {}", hostname);
            Ok(WithdrawOutcome::Absent)
        }
    }

    fn supports_host(&self, hostname: &str) -> bool {
        // Basic validation; more sophisticated checks could verify TLD
        // support, zone membership, etc.
        hostname.contains('.') && hostname.len() <= 253
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Derive the zone apex from a hostname
///
/// For "sub.example.com" -> "example.com". Short second-level labels are
/// treated as public-suffix pairs ("deep.example.co.uk" -> "example.co.uk");
/// not perfect, but covers the common cases, and an explicit zone ID
/// sidesteps it entirely.
fn zone_apex(hostname: &str) -> Result<String> {
    let parts: Vec<&str> = hostname.split('.').collect();
    if parts.len() < 2 {
        return Err(Error::config(format!("Invalid hostname: {}", hostname)));
    }

    let apex = if parts.len() >= 3 && parts[parts.len() - 2].len() <= 3 {
        format!(
            "{}.{}.{}",
            parts[parts.len() - 3],
            parts[parts.len() - 2],
            parts[parts.len() - 1]
        )
    } else {
        format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
    };

    Ok(apex)
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                account_id,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                // Check for dry-run mode environment variable
                let dry_run =
                    std::env::var("INGDNS_MODE").unwrap_or_default().to_lowercase() == "dry-run";

                if dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    zone_id.clone(),
                    account_id.clone(),
                    dry_run,
                )))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use ingdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ingdns_provider_cloudflare::register(&registry);
/// ```
pub fn register(registry: &ingdns_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
