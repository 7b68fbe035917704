use super::entry::{CacheEntry, CachedAnswer};
use super::key::CacheKey;
use gloryhole_domain::config::CacheConfig;
use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::FxBuildHasher;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Which TTL bound applies to an inserted answer.
#[derive(Debug, Clone, Copy)]
pub enum TtlHint {
    /// Upstream/local TTL, clamped into `[min_ttl, max_ttl]`.
    Positive(u32),
    /// NXDOMAIN / NODATA / blocked: `negative_ttl`.
    Negative,
    /// Policy REDIRECT answers: `redirect_ttl`.
    Redirect,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

type ShardMap = LruCache<CacheKey, Arc<CacheEntry>, FxBuildHasher>;

struct Shard {
    entries: Mutex<ShardMap>,
}

impl Shard {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::with_hasher(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
                FxBuildHasher,
            )),
        }
    }
}

/// Sharded, TTL-aware response cache. Shard selection is a stable hash of
/// the key; each shard owns an LRU map behind its own mutex, so there is no
/// global lock. Counters are atomics, never lock-protected.
///
/// Expired entries are misses on `get` and are physically removed by
/// `cleanup` (or displaced by LRU pressure), never synchronously on read.
pub struct ResponseCache {
    shards: Box<[Shard]>,
    shard_mask: u64,
    enabled: bool,
    min_ttl: u32,
    max_ttl: u32,
    negative_ttl: u32,
    redirect_ttl: u32,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let shard_count = config.shard_count.next_power_of_two().max(1);
        let per_shard = (config.max_entries / shard_count).max(1);
        let shards: Box<[Shard]> = (0..shard_count).map(|_| Shard::new(per_shard)).collect();

        info!(
            shards = shard_count,
            per_shard,
            enabled = config.enabled,
            "Response cache initialized"
        );

        Self {
            shards,
            shard_mask: (shard_count - 1) as u64,
            enabled: config.enabled,
            min_ttl: config.min_ttl,
            max_ttl: config.max_ttl,
            negative_ttl: config.negative_ttl,
            redirect_ttl: config.redirect_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    fn shard_for(&self, key: &CacheKey) -> &Shard {
        &self.shards[(key.shard_hash() & self.shard_mask) as usize]
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<CacheEntry>> {
        if !self.enabled {
            return None;
        }

        let mut entries = self.shard_for(key).entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let entry = Arc::clone(entry);
                drop(entries);
                entry.record_hit();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            _ => {
                drop(entries);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, answer: CachedAnswer, ttl: TtlHint) {
        self.put_at(key, answer, ttl, Instant::now());
    }

    pub fn put_at(&self, key: CacheKey, answer: CachedAnswer, ttl: TtlHint, now: Instant) {
        if !self.enabled {
            return;
        }

        let ttl = match ttl {
            TtlHint::Positive(hint) => hint.clamp(self.min_ttl, self.max_ttl),
            TtlHint::Negative => self.negative_ttl,
            TtlHint::Redirect => self.redirect_ttl,
        };
        let entry = Arc::new(CacheEntry::new(answer, ttl, now));

        let mut entries = self.shard_for(&key).entries.lock().unwrap();
        if let Some((evicted_key, _)) = entries.push(key.clone(), entry) {
            if evicted_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        drop(entries);
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove expired entries across all shards in parallel.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub fn cleanup_at(&self, now: Instant) -> usize {
        let removed: usize = self
            .shards
            .par_iter()
            .map(|shard| {
                let mut entries = shard.entries.lock().unwrap();
                let expired: Vec<CacheKey> = entries
                    .iter()
                    .filter(|(_, entry)| entry.is_expired(now))
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in &expired {
                    entries.pop(key);
                }
                expired.len()
            })
            .sum();

        if removed > 0 {
            debug!(removed, "Cache cleanup removed expired entries");
        }
        removed
    }

    /// Swap every shard's map for an empty one.
    pub fn purge(&self) {
        for shard in self.shards.iter() {
            let mut entries = shard.entries.lock().unwrap();
            let capacity = entries.cap();
            *entries = LruCache::with_hasher(capacity, FxBuildHasher);
        }
        info!("Response cache purged");
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.entries.lock().unwrap().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
