use hickory_proto::op::ResponseCode;
use hickory_proto::rr::Record;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// The cached answer payload: response code plus record sections.
/// Negative entries (NXDOMAIN / NODATA) keep their SOA authority so the
/// served response still carries it.
#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub response_code: ResponseCode,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub negative: bool,
    /// Synthesized by the blocklist or a policy BLOCK.
    pub blocked: bool,
}

impl CachedAnswer {
    pub fn positive(response_code: ResponseCode, answers: Vec<Record>) -> Self {
        Self {
            response_code,
            answers,
            authorities: Vec::new(),
            negative: false,
            blocked: false,
        }
    }

    pub fn negative(response_code: ResponseCode, authorities: Vec<Record>) -> Self {
        Self {
            response_code,
            answers: Vec::new(),
            authorities,
            negative: true,
            blocked: false,
        }
    }

    pub fn marked_blocked(mut self) -> Self {
        self.blocked = true;
        self
    }
}

/// One cache entry. Immutable after insertion except the atomic hit count;
/// readers never need an exclusive lock, the shard mutex serializes only
/// map mutations.
#[derive(Debug)]
pub struct CacheEntry {
    pub answer: CachedAnswer,
    pub inserted_at: Instant,
    pub expires_at: Instant,
    pub ttl: u32,
    hit_count: AtomicU64,
}

impl CacheEntry {
    pub fn new(answer: CachedAnswer, ttl: u32, now: Instant) -> Self {
        // A zero TTL would violate expires_at > inserted_at.
        let ttl = ttl.max(1);
        Self {
            answer,
            inserted_at: now,
            expires_at: now + Duration::from_secs(u64::from(ttl)),
            ttl,
            hit_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Seconds of life left, for rewriting record TTLs on a hit.
    pub fn remaining_secs(&self, now: Instant) -> u32 {
        self.expires_at
            .saturating_duration_since(now)
            .as_secs()
            .min(u64::from(u32::MAX)) as u32
    }

    pub fn record_hit(&self) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_window() {
        let now = Instant::now();
        let entry = CacheEntry::new(
            CachedAnswer::positive(ResponseCode::NoError, vec![]),
            30,
            now,
        );
        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + Duration::from_secs(29)));
        assert!(entry.is_expired(now + Duration::from_secs(30)));
        assert!(entry.expires_at > entry.inserted_at);
    }

    #[test]
    fn zero_ttl_is_raised_to_one() {
        let now = Instant::now();
        let entry = CacheEntry::new(
            CachedAnswer::positive(ResponseCode::NoError, vec![]),
            0,
            now,
        );
        assert_eq!(entry.ttl, 1);
        assert!(entry.expires_at > entry.inserted_at);
    }

    #[test]
    fn hit_count_is_atomic_increment() {
        let entry = CacheEntry::new(
            CachedAnswer::positive(ResponseCode::NoError, vec![]),
            10,
            Instant::now(),
        );
        entry.record_hit();
        entry.record_hit();
        assert_eq!(entry.hits(), 2);
    }

    #[test]
    fn remaining_secs_counts_down() {
        let now = Instant::now();
        let entry = CacheEntry::new(
            CachedAnswer::positive(ResponseCode::NoError, vec![]),
            300,
            now,
        );
        assert_eq!(entry.remaining_secs(now), 300);
        assert_eq!(entry.remaining_secs(now + Duration::from_secs(100)), 200);
        assert_eq!(entry.remaining_secs(now + Duration::from_secs(400)), 0);
    }
}
