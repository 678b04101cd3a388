// Perplexity API client with response caching and rate limiting
// Author: kelexine (https://github.com/kelexine)

use super::parse::{self, RawFallback};
use super::prompts::{self, SYSTEM_PROMPT};
use super::rate_limit::RateLimiter;
use crate::cache::{CacheStats, TtlCache};
use crate::config::{CacheConfig, PerplexityConfig};
use crate::error::{AppError, Result};
use crate::models::{Endpoint, IntelligenceMetadata, IntelligenceResponse};
use crate::utils::logging::sanitize;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    return_citations: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Answer text and citation count of one upstream completion.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub content: String,
    pub citations: usize,
}

/// Client for the Perplexity research API.
///
/// Every endpoint goes through the same path: cache lookup, rate-limit slot,
/// upstream completion, lenient parse, cache store. Nothing is retried;
/// upstream failures surface as `PERPLEXITY_ERROR`.
pub struct PerplexityClient {
    http_client: Client,
    api_key: Zeroizing<String>,
    base_url: String,
    cache: TtlCache<IntelligenceResponse>,
    rate_limiter: RateLimiter,
}

impl PerplexityClient {
    /// Build a client. Fails when no API key is configured.
    pub fn new(config: &PerplexityConfig, cache_config: &CacheConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Config(
                "PERPLEXITY_API_KEY is required (perplexity.api_key)".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .use_rustls_tls()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            "Perplexity client ready: base={}, limit={} per {}s",
            config.api_base_url, config.max_requests_per_window, config.window_seconds
        );

        Ok(Self {
            http_client,
            api_key: Zeroizing::new(config.api_key.clone()),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            cache: TtlCache::new(cache_config.max_entries),
            rate_limiter: RateLimiter::new(
                config.max_requests_per_window,
                Duration::from_secs(config.window_seconds),
            ),
        })
    }

    pub async fn get_market_context(&self, market_id: &str) -> Result<IntelligenceResponse> {
        self.fetch(Endpoint::Context, market_id).await
    }

    pub async fn get_news_flash(&self, market_id: &str) -> Result<IntelligenceResponse> {
        self.fetch(Endpoint::News, market_id).await
    }

    pub async fn get_expert_analysis(&self, market_id: &str) -> Result<IntelligenceResponse> {
        self.fetch(Endpoint::Experts, market_id).await
    }

    /// One brief per market per UTC day.
    pub async fn get_daily_brief(&self, market_id: &str) -> Result<IntelligenceResponse> {
        self.fetch(Endpoint::Brief, market_id).await
    }

    pub async fn get_historical_trends(&self, market_id: &str) -> Result<IntelligenceResponse> {
        self.fetch(Endpoint::Trends, market_id).await
    }

    /// Serve `endpoint` for `market_id` from the cache or upstream.
    pub async fn fetch(&self, endpoint: Endpoint, market_id: &str) -> Result<IntelligenceResponse> {
        let market_id = market_id.trim();
        if market_id.is_empty() {
            return Err(AppError::InvalidInput(
                "marketId parameter is required".to_string(),
            ));
        }

        let key = endpoint.cache_key(market_id, chrono::Utc::now().date_naive());

        if let Some(entry) = self.cache.get(&key) {
            debug!("Cache hit: {}", key);
            crate::metrics::record_cache_hit();
            let mut response = entry.value;
            response.metadata.cached = true;
            response.metadata.cache_expiry = Some(entry.expires_at.to_rfc3339());
            return Ok(response);
        }
        crate::metrics::record_cache_miss();

        let prompt = prompts::build(endpoint, market_id);
        let result = self.query(endpoint, &prompt).await?;

        let (data, degraded) = match parse::parse(endpoint, &result.content) {
            Ok(data) => (data, false),
            Err(fallback) => {
                Self::log_fallback(endpoint, market_id, &fallback);
                (parse::fallback_data(endpoint, &fallback), true)
            }
        };

        let response = IntelligenceResponse {
            market_id: market_id.to_string(),
            endpoint,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
            metadata: IntelligenceMetadata {
                sources: result.citations,
                confidence: calculate_confidence(&result.content, result.citations),
                freshness: endpoint.freshness(),
                cached: false,
                cache_expiry: None,
                degraded,
            },
        };

        self.cache.insert(key, response.clone(), endpoint.ttl());
        crate::metrics::update_cache_entries(self.cache.len());

        info!(
            "Fetched {} intelligence for market {} ({} sources)",
            endpoint, market_id, result.citations
        );
        Ok(response)
    }

    /// Run one chat completion against the upstream API.
    pub async fn query(&self, endpoint: Endpoint, prompt: &str) -> Result<QueryResult> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/chat/completions", self.base_url);
        let model = endpoint.model();
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: endpoint.max_tokens(),
            temperature: 0.7,
            return_citations: true,
        };

        debug!("Calling {} with model {}", url, model);
        let started = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                crate::metrics::record_perplexity_call(endpoint.as_str(), "error", started.elapsed().as_secs_f64());
                AppError::Perplexity(e.to_string())
            })?;

        let status = response.status();
        let elapsed = started.elapsed().as_secs_f64();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            crate::metrics::record_perplexity_call(endpoint.as_str(), status.as_str(), elapsed);
            warn!("Perplexity returned {} for {}: {}", status, endpoint, sanitize(&text));
            return Err(AppError::PerplexityStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Perplexity(format!("Invalid response body: {}", e)))?;
        crate::metrics::record_perplexity_call(endpoint.as_str(), status.as_str(), elapsed);

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Perplexity("Response contained no choices".to_string()))?;

        Ok(QueryResult {
            content,
            citations: parsed.citations.map(|c| c.len()).unwrap_or(0),
        })
    }

    /// Drop expired cache entries; called by the maintenance task.
    pub fn sweep_cache(&self) -> usize {
        let removed = self.cache.sweep();
        crate::metrics::record_cache_expired(removed);
        crate::metrics::update_cache_entries(self.cache.len());
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn log_fallback(endpoint: Endpoint, market_id: &str, fallback: &RawFallback) {
        warn!(
            "Unstructured {} content for market {}, serving defaults: {}",
            endpoint, market_id, fallback.reason
        );
        crate::metrics::record_degraded_parse(endpoint.as_str());
    }
}

/// Heuristic confidence in `[0, 1]` from citation count and whether the
/// answer looks structured.
pub fn calculate_confidence(content: &str, citations: usize) -> f64 {
    let mut confidence: f64 = 0.5;

    confidence += match citations {
        n if n > 10 => 0.3,
        n if n > 5 => 0.2,
        n if n > 0 => 0.1,
        _ => 0.0,
    };

    if content.contains('{') && content.contains('}') {
        confidence += 0.2;
    }

    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(calculate_confidence("plain", 0), 0.5);
        assert!((calculate_confidence("plain", 3) - 0.6).abs() < 1e-9);
        assert!((calculate_confidence("plain", 6) - 0.7).abs() < 1e-9);
        assert!((calculate_confidence("{\"a\":1}", 6) - 0.9).abs() < 1e-9);
        assert_eq!(calculate_confidence("{\"a\":1}", 11), 1.0);
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let result = PerplexityClient::new(&PerplexityConfig::default(), &CacheConfig::default());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_blank_market_id_is_invalid() {
        let config = PerplexityConfig {
            api_key: "pplx-test".to_string(),
            ..Default::default()
        };
        let client = PerplexityClient::new(&config, &CacheConfig::default()).unwrap();
        let err = client.get_news_flash("  ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
