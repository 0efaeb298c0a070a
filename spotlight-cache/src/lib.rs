//! In-process response cache, bounded by capacity and time-to-live.
//!
//! Grounded in this workspace's `MemoryCache` shape (a mutex-guarded map of
//! keys to values with simple hit/miss bookkeeping) generalized to carry a
//! per-entry timestamp so entries can both expire and be evicted in
//! insertion order once the map is full.

pub mod key;

pub use key::{build_cache_key, tenant_prefix};

use spotlight_core::{CacheConfig, SearchResponse};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry {
    response: SearchResponse,
    stored_at: Instant,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct ResponseCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
    stats: Mutex<CacheStats>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: config.ttl,
            capacity: config.capacity,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Returns a fresh (non-expired) cached response, if any.
    pub fn get(&self, key: &str) -> Option<SearchResponse> {
        let entries = self.entries.lock().unwrap();
        let hit = entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.response.clone());
        drop(entries);
        self.record(hit.is_some());
        hit
    }

    /// Returns a cached response regardless of expiry, for the
    /// stale-on-timeout fallback path. Does not affect hit/miss stats —
    /// callers only reach for this after a normal `get` miss.
    pub fn get_stale(&self, key: &str) -> Option<SearchResponse> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|entry| entry.response.clone())
    }

    pub fn put(&self, key: String, response: SearchResponse) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
                drop(entries);
                self.stats.lock().unwrap().evictions += 1;
                entries = self.entries.lock().unwrap();
            }
        }
        entries.insert(
            key,
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drops every entry belonging to `tenant_id`, used after a reindex
    /// makes that tenant's cached responses potentially stale.
    pub fn invalidate_tenant(&self, tenant_id: &str) {
        let prefix = tenant_prefix(tenant_id);
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(tenant_id, removed, "invalidated cached responses for tenant");
        }
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap()
    }

    fn record(&self, hit: bool) {
        let mut stats = self.stats.lock().unwrap();
        if hit {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
    }
}
