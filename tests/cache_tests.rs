// Cache tests - testing only public APIs
// Author: kelexine (https://github.com/kelexine)

use sentimark::cache::TtlCache;
use sentimark::config::CacheConfig;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_cache_config_defaults() {
    let config = CacheConfig::default();

    assert_eq!(config.max_entries, 1000);
    assert_eq!(config.sweep_interval_seconds, 300);
}

#[test]
fn test_stats_start_empty() {
    let cache: TtlCache<String> = TtlCache::new(8);
    let stats = cache.stats();

    assert!(cache.is_empty());
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.inserts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_independently() {
    let cache = TtlCache::new(16);
    cache.insert("news_flash:m1", "news", Duration::from_secs(900));
    cache.insert("daily_brief:m1", "brief", Duration::from_secs(86_400));

    tokio::time::advance(Duration::from_secs(901)).await;

    assert!(cache.get("news_flash:m1").is_none());
    assert_eq!(cache.get("daily_brief:m1").map(|e| e.value), Some("brief"));
}

#[test]
fn test_remove_and_clear() {
    let cache = TtlCache::new(4);
    cache.insert("a", 1u8, Duration::from_secs(60));
    cache.insert("b", 2u8, Duration::from_secs(60));

    assert_eq!(cache.remove("a"), Some(1));
    assert_eq!(cache.remove("a"), None);
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_shared_across_tasks() {
    let cache = Arc::new(TtlCache::new(128));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache.insert(format!("market_context:m{}", i), i, Duration::from_secs(60));
                cache.get(&format!("market_context:m{}", i)).map(|e| e.value)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), Some(i));
    }
    assert_eq!(cache.len(), 8);
    assert_eq!(cache.stats().inserts, 8);
}
