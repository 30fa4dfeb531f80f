// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Pictura credit service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Sections holding secrets implement `Debug` by hand
//! so that secret values never reach log output.

use serde::{Deserialize, Serialize};

/// Top-level Pictura configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PicturaConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credit pricing and ledger settings.
    #[serde(default)]
    pub credits: CreditsConfig,

    /// Payment provider (checkout + webhooks).
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Image-generation backend.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Session token settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("pictura").join("pictura.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("pictura.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Credit pricing and ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreditsConfig {
    /// Credits granted when a balance row is first created.
    #[serde(default = "default_starting_grant")]
    pub starting_grant: i64,

    /// Credits bought per whole currency unit (10 means $0.10 per credit).
    #[serde(default = "default_credits_per_major_unit")]
    pub credits_per_major_unit: i64,

    /// Minor currency units per whole unit (cents per dollar).
    #[serde(default = "default_minor_units_per_major_unit")]
    pub minor_units_per_major_unit: i64,

    /// Credits charged per generated image.
    #[serde(default = "default_cost_per_output")]
    pub cost_per_output: i64,

    /// Read-modify-write attempts before giving up on a contended balance.
    #[serde(default = "default_max_update_attempts")]
    pub max_update_attempts: u32,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            starting_grant: default_starting_grant(),
            credits_per_major_unit: default_credits_per_major_unit(),
            minor_units_per_major_unit: default_minor_units_per_major_unit(),
            cost_per_output: default_cost_per_output(),
            max_update_attempts: default_max_update_attempts(),
        }
    }
}

fn default_starting_grant() -> i64 {
    10
}

fn default_credits_per_major_unit() -> i64 {
    10
}

fn default_minor_units_per_major_unit() -> i64 {
    100
}

fn default_cost_per_output() -> i64 {
    2
}

fn default_max_update_attempts() -> u32 {
    5
}

/// Payment provider configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Secret API key used to create checkout sessions.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Shared secret used to verify webhook signatures. Required by `serve`.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Maximum age of a signed webhook timestamp, in seconds.
    #[serde(default = "default_signature_tolerance_secs")]
    pub signature_tolerance_secs: u64,

    /// Payment API base URL.
    #[serde(default = "default_payment_api_base_url")]
    pub api_base_url: String,

    /// ISO 4217 currency code for checkout line items.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Purchasable packages, in whole currency units.
    #[serde(default = "default_packages")]
    pub packages: Vec<i64>,

    /// Where the provider redirects after a completed payment.
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// Where the provider redirects after an abandoned payment.
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            webhook_secret: None,
            signature_tolerance_secs: default_signature_tolerance_secs(),
            api_base_url: default_payment_api_base_url(),
            currency: default_currency(),
            packages: default_packages(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
        }
    }
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("api_base_url", &self.api_base_url)
            .field("currency", &self.currency)
            .field("packages", &self.packages)
            .field("success_url", &self.success_url)
            .field("cancel_url", &self.cancel_url)
            .finish()
    }
}

fn default_signature_tolerance_secs() -> u64 {
    300
}

fn default_payment_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_packages() -> Vec<i64> {
    vec![5, 10, 20, 25]
}

fn default_success_url() -> String {
    "http://localhost:3000/checkout/success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/".to_string()
}

/// Image-generation backend configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Backend API token. `None` disables the generate route.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Backend API base URL.
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Model identifier (`owner/name`).
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Upper bound on one generation, including polling, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between prediction status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Retries of the create call on transient HTTP statuses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn default_generation_base_url() -> String {
    "https://api.replicate.com".to_string()
}

fn default_generation_model() -> String {
    "black-forest-labs/flux-schnell".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    1
}

/// Session token configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HMAC key for signing session tokens. Required by `serve` and `token`.
    #[serde(default)]
    pub session_secret: Option<String>,

    /// Lifetime of issued tokens, in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

fn default_token_ttl_secs() -> u64 {
    86_400
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Expose `/metrics`.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
