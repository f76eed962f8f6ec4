//! Cache behavior tests

use crate::{CacheConfig, TtlCache};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn cache() -> TtlCache<String, String> {
    TtlCache::with_config(CacheConfig::without_sweeper())
}

#[tokio::test(start_paused = true)]
async fn test_basic_operations() {
    let cache = cache();

    cache.set("key1".to_string(), "value1".to_string(), Duration::from_secs(10));
    assert_eq!(cache.get("key1"), Some("value1".to_string()));
    assert!(cache.contains("key1"));
    assert!(!cache.contains("key2"));

    assert!(cache.delete("key1"));
    assert!(!cache.delete("key1"));
    assert_eq!(cache.get("key1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_checked_on_read() {
    let cache = cache();
    cache.set("k".to_string(), "v".to_string(), Duration::from_secs(5));

    tokio::time::advance(Duration::from_millis(4999)).await;
    assert_eq!(cache.get("k"), Some("v".to_string()));

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(cache.get("k"), None);

    // Still physically present until a sweep runs
    assert_eq!(cache.len(), 1);
    let stats = cache.stats();
    assert_eq!((stats.total, stats.active, stats.expired), (1, 0, 1));
}

#[tokio::test(start_paused = true)]
async fn test_overwrite_restarts_expiry() {
    let cache = cache();
    cache.set("k".to_string(), "old".to_string(), Duration::from_secs(5));
    tokio::time::advance(Duration::from_secs(4)).await;

    cache.set("k".to_string(), "new".to_string(), Duration::from_secs(5));
    tokio::time::advance(Duration::from_secs(4)).await;

    assert_eq!(cache.get("k"), Some("new".to_string()));
    assert_eq!(cache.remaining_ttl("k"), Some(Duration::from_secs(1)));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_ttl_saturates() {
    let cache = cache();
    cache.set("k".to_string(), "v".to_string(), Duration::from_secs(u64::MAX));

    tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
    assert_eq!(cache.get("k"), Some("v".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_zero_ttl_is_never_visible() {
    let cache = cache();
    cache.set("k".to_string(), "v".to_string(), Duration::ZERO);
    assert_eq!(cache.get("k"), None);
}

#[tokio::test(start_paused = true)]
async fn test_insert_uses_default_ttl() {
    let cache: TtlCache<String, u32> = TtlCache::with_config(CacheConfig {
        sweep_interval: Duration::ZERO,
        default_ttl: Duration::from_secs(30),
    });
    cache.insert("k".to_string(), 7);
    assert_eq!(cache.remaining_ttl("k"), Some(Duration::from_secs(30)));
}

#[tokio::test(start_paused = true)]
async fn test_clear_and_stats() {
    let cache = cache();
    cache.set("a".to_string(), "1".to_string(), Duration::from_secs(1));
    cache.set("b".to_string(), "2".to_string(), Duration::from_secs(60));
    cache.get("a");
    cache.get("missing");

    tokio::time::advance(Duration::from_secs(2)).await;
    let stats = cache.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.writes, 2);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats().hits, 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_purge() {
    let cache = cache();
    cache.set("short".to_string(), "1".to_string(), Duration::from_secs(1));
    cache.set("long".to_string(), "2".to_string(), Duration::from_secs(600));

    assert_eq!(cache.purge_expired(), 0);
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().swept, 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_removes_unread_entries() {
    let cache: TtlCache<String, String> = TtlCache::with_config(CacheConfig {
        sweep_interval: Duration::from_secs(120),
        default_ttl: Duration::from_secs(60),
    });
    assert!(cache.sweeper_running());

    for i in 0..10 {
        cache.set(format!("k{i}"), "v".to_string(), Duration::from_secs(30));
    }
    assert_eq!(cache.len(), 10);

    tokio::time::sleep(Duration::from_secs(121)).await;
    assert_eq!(cache.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_shared_by_clones() {
    let cache: TtlCache<String, String> = TtlCache::with_config(CacheConfig {
        sweep_interval: Duration::from_secs(1),
        default_ttl: Duration::from_secs(60),
    });
    let clone = cache.clone();
    drop(cache);
    assert!(clone.sweeper_running());

    clone.stop_sweeper();
    assert!(!clone.sweeper_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access() {
    let cache: Arc<TtlCache<u32, u32>> = Arc::new(TtlCache::with_config(CacheConfig::without_sweeper()));
    let mut handles = Vec::new();

    for worker in 0..8u32 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for i in 0..200u32 {
                let key = (worker * 1000) + i;
                cache.set(key, i, Duration::from_secs(60));
                assert_eq!(cache.get(&key), Some(i));
                if i % 2 == 0 {
                    cache.delete(&key);
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len(), 8 * 100);
}

proptest! {
    #[test]
    fn prop_visible_strictly_before_ttl(ttl_ms in 1u64..10_000, elapsed_ms in 0u64..20_000) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let visible = runtime.block_on(async {
            let cache: TtlCache<&'static str, u64> =
                TtlCache::with_config(CacheConfig::without_sweeper());
            cache.set("k", 42, Duration::from_millis(ttl_ms));
            tokio::time::advance(Duration::from_millis(elapsed_ms)).await;
            cache.get("k").is_some()
        });

        prop_assert_eq!(visible, elapsed_ms < ttl_ms);
    }
}
