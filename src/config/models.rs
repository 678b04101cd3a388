//! Configuration data structures for the sentimark service.
//!
//! This module defines the schema for the application settings: the HTTP
//! server, the Perplexity intelligence upstream, the response cache, PDF
//! report generation and Stripe billing.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream Perplexity API settings.
    #[serde(default)]
    pub perplexity: PerplexityConfig,

    /// In-memory intelligence cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// PDF report generation and storage settings.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Stripe billing settings.
    #[serde(default)]
    pub stripe: StripeConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `3000`
    #[serde(default = "default_port")]
    pub port: u16,

    /// User id assumed when a request carries no `x-user-id` header.
    /// Default: `user-placeholder`
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

/// Settings for the upstream Perplexity API connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct PerplexityConfig {
    /// API key sent as a bearer token. Also read from `PERPLEXITY_API_KEY`.
    #[serde(default)]
    pub api_key: String,

    /// Base URL for the Perplexity API.
    /// Default: `https://api.perplexity.ai`
    #[serde(default = "default_perplexity_base_url")]
    pub api_base_url: String,

    /// Request timeout in seconds.
    /// Default: `60`
    #[serde(default = "default_perplexity_timeout")]
    pub timeout_seconds: u64,

    /// Maximum upstream calls inside one rate-limit window.
    /// Default: `50`
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: usize,

    /// Length of the sliding rate-limit window in seconds.
    /// Default: `60`
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

/// Settings for the intelligence response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of live entries; least recently used entries are
    /// dropped beyond this.
    /// Default: `1000`
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Interval between sweeps of expired cache entries and expired reports.
    /// Default: `300` (5 minutes)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

/// Settings for PDF report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Directory generated PDFs are written to.
    /// Default: `tmp/reports`
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding `report-template.html` and `report-styles.css`.
    /// When unset the templates compiled into the binary are used.
    #[serde(default)]
    pub template_dir: Option<String>,

    /// Days a generated report stays downloadable.
    /// Default: `7`
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Run the browser without a visible window.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Disable the chromium sandbox (needed in most containers).
    /// Default: `false`
    #[serde(default)]
    pub no_sandbox: bool,

    /// Explicit chromium executable; autodetected when unset.
    #[serde(default)]
    pub chrome_executable: Option<String>,

    /// Upper bound for loading the populated page, in milliseconds.
    /// Default: `30000`
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Check the caller's tier and usage before generating a report.
    /// Default: `false`
    #[serde(default)]
    pub enforce_feature_gates: bool,
}

/// Settings for the Stripe billing integration.
#[derive(Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Secret API key. Also read from `STRIPE_SECRET_KEY`.
    /// Subscription routes answer `SERVICE_UNAVAILABLE` while this is empty.
    #[serde(default)]
    pub secret_key: String,

    /// Webhook signing secret. Also read from `STRIPE_WEBHOOK_SECRET`.
    #[serde(default)]
    pub webhook_secret: String,

    /// Base URL for the Stripe REST API.
    /// Default: `https://api.stripe.com/v1`
    #[serde(default = "default_stripe_base_url")]
    pub api_base_url: String,

    /// Public URL of the web app, used for checkout and portal redirects.
    /// Also read from `NEXT_PUBLIC_BASE_URL`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Stripe price id of the Pro plan.
    #[serde(default)]
    pub pro_price_id: String,

    /// Stripe price id of the Enterprise plan.
    #[serde(default)]
    pub enterprise_price_id: String,

    /// Trial length granted on checkout.
    /// Default: `0`
    #[serde(default)]
    pub trial_days: u32,

    /// Allowed clock skew for webhook signatures, in seconds.
    /// Default: `300`
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_seconds: i64,

    /// Request timeout in seconds.
    /// Default: `30`
    #[serde(default = "default_stripe_timeout")]
    pub timeout_seconds: u64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Secrets never reach log output through Debug.
impl std::fmt::Debug for PerplexityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerplexityConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("api_base_url", &self.api_base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_requests_per_window", &self.max_requests_per_window)
            .field("window_seconds", &self.window_seconds)
            .finish()
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &redacted(&self.secret_key))
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .field("api_base_url", &self.api_base_url)
            .field("public_base_url", &self.public_base_url)
            .field("pro_price_id", &self.pro_price_id)
            .field("enterprise_price_id", &self.enterprise_price_id)
            .field("trial_days", &self.trial_days)
            .field("webhook_tolerance_seconds", &self.webhook_tolerance_seconds)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "[UNSET]"
    } else {
        "[REDACTED]"
    }
}

impl StripeConfig {
    /// Whether enough is configured to talk to Stripe.
    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_user_id: default_user_id(),
        }
    }
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_perplexity_base_url(),
            timeout_seconds: default_perplexity_timeout(),
            max_requests_per_window: default_max_requests(),
            window_seconds: default_window_seconds(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            template_dir: None,
            retention_days: default_retention_days(),
            headless: true,
            no_sandbox: false,
            chrome_executable: None,
            navigation_timeout_ms: default_navigation_timeout(),
            enforce_feature_gates: false,
        }
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            api_base_url: default_stripe_base_url(),
            public_base_url: default_public_base_url(),
            pro_price_id: String::new(),
            enterprise_price_id: String::new(),
            trial_days: 0,
            webhook_tolerance_seconds: default_webhook_tolerance(),
            timeout_seconds: default_stripe_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_user_id() -> String {
    "user-placeholder".to_string()
}

fn default_perplexity_base_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_perplexity_timeout() -> u64 {
    60
}

fn default_max_requests() -> usize {
    50
}

fn default_window_seconds() -> u64 {
    60
}

fn default_max_entries() -> usize {
    1000
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

fn default_output_dir() -> String {
    "tmp/reports".to_string()
}

fn default_retention_days() -> i64 {
    7
}

fn default_true() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_stripe_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
