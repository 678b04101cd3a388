// Per-endpoint routing table: models, cache keys, TTLs and HTTP caching
// Author: kelexine (https://github.com/kelexine)

use crate::models::{Endpoint, Freshness};
use chrono::NaiveDate;
use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Context,
        Endpoint::News,
        Endpoint::Experts,
        Endpoint::Brief,
        Endpoint::Trends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Context => "context",
            Endpoint::News => "news",
            Endpoint::Experts => "experts",
            Endpoint::Brief => "brief",
            Endpoint::Trends => "trends",
        }
    }

    /// Prefix of the cache key, shared by every market.
    pub fn cache_prefix(&self) -> &'static str {
        match self {
            Endpoint::Context => "market_context",
            Endpoint::News => "news_flash",
            Endpoint::Experts => "expert_analysis",
            Endpoint::Brief => "daily_brief",
            Endpoint::Trends => "historical_trends",
        }
    }

    /// Composite cache key. The daily brief is additionally keyed by the UTC
    /// date so a new brief is produced every day.
    pub fn cache_key(&self, market_id: &str, today: NaiveDate) -> String {
        match self {
            Endpoint::Brief => format!(
                "{}:{}:{}",
                self.cache_prefix(),
                market_id,
                today.format("%Y-%m-%d")
            ),
            _ => format!("{}:{}", self.cache_prefix(), market_id),
        }
    }

    /// How long a fetched payload is served from the cache.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(match self {
            Endpoint::News => 15 * MINUTE,
            Endpoint::Context => HOUR,
            Endpoint::Experts => 6 * HOUR,
            Endpoint::Brief => DAY,
            Endpoint::Trends => 7 * DAY,
        })
    }

    /// Upstream model; news favours the fast model, analysis the reasoning one.
    pub fn model(&self) -> &'static str {
        match self {
            Endpoint::Context => "sonar-pro",
            Endpoint::News => "sonar",
            Endpoint::Experts | Endpoint::Brief | Endpoint::Trends => "sonar-reasoning-pro",
        }
    }

    pub fn max_tokens(&self) -> u32 {
        if self.model() == "sonar" {
            500
        } else {
            2000
        }
    }

    pub fn freshness(&self) -> Freshness {
        match self {
            Endpoint::Context | Endpoint::News => Freshness::Realtime,
            Endpoint::Experts | Endpoint::Brief => Freshness::Recent,
            Endpoint::Trends => Freshness::Historical,
        }
    }

    /// `Cache-Control` header for the HTTP response. Cached payloads may be
    /// kept downstream for the full TTL, fresh ones for a shorter period.
    pub fn cache_control(&self, cached: bool) -> String {
        let max_age = match (self, cached) {
            (Endpoint::Context, true) => HOUR,
            (Endpoint::Context, false) => 5 * MINUTE,
            (Endpoint::News, true) => 15 * MINUTE,
            (Endpoint::News, false) => 5 * MINUTE,
            (Endpoint::Experts, true) => 6 * HOUR,
            (Endpoint::Experts, false) => 30 * MINUTE,
            (Endpoint::Brief, true) => DAY,
            (Endpoint::Brief, false) => HOUR,
            (Endpoint::Trends, true) => 7 * DAY,
            (Endpoint::Trends, false) => DAY,
        };
        format!("public, max-age={}", max_age)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        assert_eq!(Endpoint::Context.cache_key("m1", day), "market_context:m1");
        assert_eq!(Endpoint::News.cache_key("m1", day), "news_flash:m1");
        assert_eq!(Endpoint::Experts.cache_key("m1", day), "expert_analysis:m1");
        assert_eq!(Endpoint::Brief.cache_key("m1", day), "daily_brief:m1:2025-11-15");
        assert_eq!(Endpoint::Trends.cache_key("m1", day), "historical_trends:m1");
    }

    #[test]
    fn test_ttls() {
        assert_eq!(Endpoint::News.ttl(), Duration::from_secs(900));
        assert_eq!(Endpoint::Context.ttl(), Duration::from_secs(3600));
        assert_eq!(Endpoint::Experts.ttl(), Duration::from_secs(21_600));
        assert_eq!(Endpoint::Brief.ttl(), Duration::from_secs(86_400));
        assert_eq!(Endpoint::Trends.ttl(), Duration::from_secs(604_800));
    }

    #[test]
    fn test_models_and_max_tokens() {
        assert_eq!(Endpoint::News.max_tokens(), 500);
        assert_eq!(Endpoint::Context.model(), "sonar-pro");
        assert_eq!(Endpoint::Context.max_tokens(), 2000);
        assert_eq!(Endpoint::Trends.model(), "sonar-reasoning-pro");
    }

    #[test]
    fn test_cache_control_headers() {
        let expected = [
            (Endpoint::Context, 3600, 300),
            (Endpoint::News, 900, 300),
            (Endpoint::Experts, 21_600, 1800),
            (Endpoint::Brief, 86_400, 3600),
            (Endpoint::Trends, 604_800, 86_400),
        ];
        for (endpoint, cached, fresh) in expected {
            assert_eq!(endpoint.cache_control(true), format!("public, max-age={}", cached));
            assert_eq!(endpoint.cache_control(false), format!("public, max-age={}", fresh));
        }
    }
}
