use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use moka::Expiry;
use moka::future::Cache;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::config::CacheConfig;

/// Passing this as the TTL to [`ResponseCache::set`] selects the cache's default expiration.
pub const DEFAULT_EXPIRATION: Duration = Duration::ZERO;

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Bytes,
    ttl: Duration,
}

/// Each entry expires after its own TTL, counted from the last write.
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache of encoded GET response envelopes, keyed by request path
/// (plus a canonical query encoding for listings).
///
/// Writes never invalidate entries: a cached read stays served until its TTL
/// lapses even if the underlying record changed. The number of entries is
/// bounded; past `max_entries` the least useful ones are evicted.
pub struct ResponseCache {
    entries: Cache<String, CacheEntry>,
    default_ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration, max_entries: u64, enabled: bool) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(EntryExpiry)
                .build(),
            default_ttl,
            enabled,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::from_secs(config.expiration_secs),
            config.max_entries,
            config.enabled,
        )
    }

    /// Look up a live entry. Expired entries are never returned.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        if !self.enabled {
            return None;
        }
        self.entries.get(key).await.map(|entry| entry.body)
    }

    /// Store `body` under `key`. A zero `ttl` uses the default expiration.
    pub async fn set(&self, key: impl Into<String>, body: Bytes, ttl: Duration) {
        if !self.enabled {
            return;
        }
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        self.entries.insert(key.into(), CacheEntry { body, ttl }).await;
    }

    /// Run pending evictions and return roughly how many entries went away.
    pub async fn delete_expired(&self) -> u64 {
        let before = self.entries.entry_count();
        self.entries.run_pending_tasks().await;
        before.saturating_sub(self.entries.entry_count())
    }

    /// Entry count as of the last maintenance run.
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn a background task that periodically sweeps expired cache entries until `shutdown` fires.
pub fn spawn_sweeper(
    cache: Arc<ResponseCache>,
    interval: Duration,
    tracker: &TaskTracker,
    shutdown: CancellationToken,
) {
    tracker.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.delete_expired().await;
                    if removed > 0 {
                        info!(removed, "Swept expired cache entries");
                    }
                }
            }
        }
    });
}
