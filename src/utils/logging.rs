//! Structured logging and security-focused trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! sensitive data (API keys, webhook secrets) from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Secret prefixes and the placeholder each one is replaced with.
const SECRET_PATTERNS: &[(&str, &str)] = &[
    ("pplx-", "[REDACTED_PERPLEXITY_KEY]"),
    ("sk_live_", "[REDACTED_STRIPE_KEY]"),
    ("sk_test_", "[REDACTED_STRIPE_KEY]"),
    ("rk_live_", "[REDACTED_STRIPE_KEY]"),
    ("rk_test_", "[REDACTED_STRIPE_KEY]"),
    ("whsec_", "[REDACTED_WEBHOOK_SECRET]"),
];

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| AppError::Internal(format!("Failed to initialize logging: {}", e)))
}

/// Sanitizes sensitive information from log messages.
///
/// Every occurrence of a known secret prefix (Perplexity `pplx-` keys,
/// Stripe `sk_`/`rk_` keys, `whsec_` webhook secrets) is replaced, up to the
/// next whitespace or quote, with a `\[REDACTED_*\]` placeholder. Upstream
/// error bodies pass through here before they reach a log sink or a client.
pub fn sanitize(input: &str) -> String {
    let mut result = input.to_string();

    for (prefix, placeholder) in SECRET_PATTERNS {
        let mut search_from = 0;
        while let Some(offset) = result[search_from..].find(prefix) {
            let start = search_from + offset;
            // Search for the end of the token (delimiter or end of string)
            let end = result[start..]
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ',')
                .map(|i| start + i)
                .unwrap_or(result.len());
            result.replace_range(start..end, placeholder);
            search_from = start + placeholder.len();
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_perplexity_key() {
        let input = "Authorization: Bearer pplx-abc123def456";
        let output = sanitize(input);
        assert!(output.contains("[REDACTED_PERPLEXITY_KEY]"));
        assert!(!output.contains("pplx-abc123def456"));
    }

    #[test]
    fn test_sanitize_stripe_secrets() {
        let input = r#"{"key": "sk_test_51Habc", "secret": "whsec_xyz"}"#;
        let output = sanitize(input);
        assert!(output.contains("[REDACTED_STRIPE_KEY]"));
        assert!(output.contains("[REDACTED_WEBHOOK_SECRET]"));
        assert!(!output.contains("sk_test_51Habc"));
        assert!(!output.contains("whsec_xyz"));
    }

    #[test]
    fn test_sanitize_restricted_keys() {
        let output = sanitize("live rk_live_AAA test rk_test_BBB");
        assert_eq!(
            output,
            "live [REDACTED_STRIPE_KEY] test [REDACTED_STRIPE_KEY]"
        );
    }

    #[test]
    fn test_sanitize_repeated_tokens() {
        let output = sanitize("pplx-one and pplx-two");
        assert_eq!(
            output,
            "[REDACTED_PERPLEXITY_KEY] and [REDACTED_PERPLEXITY_KEY]"
        );
    }

    #[test]
    fn test_sanitize_leaves_plain_text() {
        assert_eq!(sanitize("market not found"), "market not found");
    }
}
