// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use std::path::PathBuf;

/// Plain environment variables honored for compatibility with existing
/// deployments, mapped onto their configuration keys.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("PERPLEXITY_API_KEY", "perplexity.api_key"),
    ("STRIPE_SECRET_KEY", "stripe.secret_key"),
    ("STRIPE_WEBHOOK_SECRET", "stripe.webhook_secret"),
    ("NEXT_PUBLIC_BASE_URL", "stripe.public_base_url"),
];

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Legacy plain environment variables (highest)
    /// 2. `SENTIMARK__*` environment variables
    /// 3. Config file
    /// 4. Defaults (lowest)
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`AppConfig::load`], reading an explicit config file when given.
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let file = path
            .map(str::to_string)
            .unwrap_or_else(Self::default_config_path);

        let mut builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // Load from config file if it exists
            .add_source(File::with_name(&file).required(path.is_some()))
            // Override with environment variables (SENTIMARK__PERPLEXITY__API_KEY, ...)
            .add_source(
                Environment::with_prefix("SENTIMARK")
                    .prefix_separator("__")
                    .separator("__"),
            );

        for (var, key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sentimark")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }

    /// Render the resolved configuration as TOML with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        for secret in [
            &mut shown.perplexity.api_key,
            &mut shown.stripe.secret_key,
            &mut shown.stripe.webhook_secret,
        ] {
            if !secret.is_empty() {
                *secret = "[REDACTED]".to_string();
            }
        }
        toml::to_string_pretty(&shown).map_err(|e| AppError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.perplexity.max_requests_per_window, 50);
        assert_eq!(config.perplexity.window_seconds, 60);
        assert_eq!(config.cache.sweep_interval_seconds, 300);
        assert_eq!(config.reports.retention_days, 7);
        assert_eq!(config.reports.navigation_timeout_ms, 30_000);
        assert!(!config.stripe.is_configured());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 4100\n\n[perplexity]\nmax_requests_per_window = 5\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.perplexity.max_requests_per_window, 5);
        assert_eq!(config.perplexity.window_seconds, 60);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.perplexity.api_key = "pplx-very-secret".to_string();
        config.stripe.secret_key = "sk_test_secret".to_string();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("pplx-very-secret"));
        assert!(!rendered.contains("sk_test_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_redacted_toml() {
        let mut config = AppConfig::default();
        config.stripe.webhook_secret = "whsec_abc".to_string();
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("whsec_abc"));
        assert!(rendered.contains("[stripe]"));
    }
}
