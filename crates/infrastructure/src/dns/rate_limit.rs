use gloryhole_domain::config::{RateLimitAction, RateLimitConfig};
use ipnetwork::IpNetwork;
use lru::LruCache;
use rustc_hash::{FxBuildHasher, FxHasher};
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const SHARD_COUNT: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Limited(RateLimitAction),
}

type ClientTable = LruCache<IpAddr, Bucket, FxBuildHasher>;

/// Per-client token buckets in sharded, LRU-bounded tables. The shard
/// mutex is held only for the bucket update; inserts and evictions are the
/// LRU map's own business. Disabled means always-allow at zero cost.
pub struct RateLimiter {
    enabled: bool,
    rps: f64,
    burst: f64,
    action: RateLimitAction,
    idle_timeout: Duration,
    trusted: Vec<IpNetwork>,
    shards: Box<[Mutex<ClientTable>]>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_shard = (config.max_tracked / SHARD_COUNT).max(1);
        let shards: Box<[Mutex<ClientTable>]> = (0..SHARD_COUNT)
            .map(|_| {
                Mutex::new(LruCache::with_hasher(
                    NonZeroUsize::new(per_shard).unwrap(),
                    FxBuildHasher,
                ))
            })
            .collect();

        if config.enabled {
            info!(
                rps = config.rps,
                burst = config.burst,
                max_tracked = config.max_tracked,
                "Rate limiter enabled"
            );
        }

        Self {
            enabled: config.enabled,
            rps: config.rps,
            burst: config.burst,
            action: config.action,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            trusted: config.trusted_proxy_cidrs.clone(),
            shards,
        }
    }

    #[inline]
    fn shard_for(&self, client: IpAddr) -> &Mutex<ClientTable> {
        let mut hasher = FxHasher::default();
        client.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    pub fn check(&self, client: IpAddr) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: IpAddr, now: Instant) -> RateDecision {
        if !self.enabled {
            return RateDecision::Allow;
        }
        if self.trusted.iter().any(|cidr| cidr.contains(client)) {
            return RateDecision::Allow;
        }

        let mut table = self.shard_for(client).lock().unwrap();
        let bucket = match table.get_mut(&client) {
            Some(bucket) => bucket,
            None => {
                table.push(
                    client,
                    Bucket {
                        tokens: self.burst,
                        last_refill: now,
                        last_seen: now,
                    },
                );
                table.get_mut(&client).unwrap()
            }
        };

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst);
        bucket.last_refill = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateDecision::Allow
        } else {
            RateDecision::Limited(self.action)
        }
    }

    /// Remove entries idle longer than the configured window. Run off the
    /// hot path by the sweep job.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut table = shard.lock().unwrap();
            let idle: Vec<IpAddr> = table
                .iter()
                .filter(|(_, bucket)| {
                    now.saturating_duration_since(bucket.last_seen) > self.idle_timeout
                })
                .map(|(ip, _)| *ip)
                .collect();
            for ip in &idle {
                table.pop(ip);
            }
            removed += idle.len();
        }
        if removed > 0 {
            debug!(removed, "Rate limiter sweep removed idle clients");
        }
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rps: f64, burst: f64) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            rps,
            burst,
            action: RateLimitAction::Refuse,
            cleanup_interval_secs: 60,
            idle_timeout_secs: 300,
            max_tracked: 1024,
            trusted_proxy_cidrs: vec![],
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn burst_then_limit() {
        let limiter = RateLimiter::new(&config(1.0, 1.0));
        let now = Instant::now();

        assert_eq!(limiter.check_at(ip("10.0.0.1"), now), RateDecision::Allow);
        for _ in 0..4 {
            assert_eq!(
                limiter.check_at(ip("10.0.0.1"), now),
                RateDecision::Limited(RateLimitAction::Refuse)
            );
        }
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = RateLimiter::new(&config(2.0, 2.0));
        let now = Instant::now();

        assert_eq!(limiter.check_at(ip("10.0.0.1"), now), RateDecision::Allow);
        assert_eq!(limiter.check_at(ip("10.0.0.1"), now), RateDecision::Allow);
        assert!(matches!(
            limiter.check_at(ip("10.0.0.1"), now),
            RateDecision::Limited(_)
        ));

        // One second refills two tokens at rps=2.
        let later = now + Duration::from_secs(1);
        assert_eq!(limiter.check_at(ip("10.0.0.1"), later), RateDecision::Allow);
        assert_eq!(limiter.check_at(ip("10.0.0.1"), later), RateDecision::Allow);
        assert!(matches!(
            limiter.check_at(ip("10.0.0.1"), later),
            RateDecision::Limited(_)
        ));
    }

    #[test]
    fn refill_is_capped_at_burst() {
        let limiter = RateLimiter::new(&config(10.0, 3.0));
        let now = Instant::now();
        assert_eq!(limiter.check_at(ip("10.0.0.1"), now), RateDecision::Allow);

        // A long idle period refills to burst, not beyond.
        let later = now + Duration::from_secs(3600);
        for _ in 0..3 {
            assert_eq!(limiter.check_at(ip("10.0.0.1"), later), RateDecision::Allow);
        }
        assert!(matches!(
            limiter.check_at(ip("10.0.0.1"), later),
            RateDecision::Limited(_)
        ));
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(&config(1.0, 1.0));
        let now = Instant::now();

        assert_eq!(limiter.check_at(ip("10.0.0.1"), now), RateDecision::Allow);
        assert!(matches!(
            limiter.check_at(ip("10.0.0.1"), now),
            RateDecision::Limited(_)
        ));
        assert_eq!(limiter.check_at(ip("10.0.0.2"), now), RateDecision::Allow);
    }

    #[test]
    fn disabled_always_allows() {
        let mut cfg = config(1.0, 1.0);
        cfg.enabled = false;
        let limiter = RateLimiter::new(&cfg);
        let now = Instant::now();
        for _ in 0..100 {
            assert_eq!(limiter.check_at(ip("10.0.0.1"), now), RateDecision::Allow);
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn trusted_proxies_bypass_limiting() {
        let mut cfg = config(1.0, 1.0);
        cfg.trusted_proxy_cidrs = vec!["192.168.1.0/24".parse().unwrap()];
        let limiter = RateLimiter::new(&cfg);
        let now = Instant::now();
        for _ in 0..10 {
            assert_eq!(limiter.check_at(ip("192.168.1.5"), now), RateDecision::Allow);
        }
    }

    #[test]
    fn sweep_removes_idle_clients() {
        let limiter = RateLimiter::new(&config(1.0, 1.0));
        let now = Instant::now();
        limiter.check_at(ip("10.0.0.1"), now);
        limiter.check_at(ip("10.0.0.2"), now);
        assert_eq!(limiter.tracked_clients(), 2);

        let removed = limiter.sweep_at(now + Duration::from_secs(301));
        assert_eq!(removed, 2);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn drop_action_is_reported() {
        let mut cfg = config(1.0, 1.0);
        cfg.action = RateLimitAction::Drop;
        let limiter = RateLimiter::new(&cfg);
        let now = Instant::now();
        limiter.check_at(ip("10.0.0.1"), now);
        assert_eq!(
            limiter.check_at(ip("10.0.0.1"), now),
            RateDecision::Limited(RateLimitAction::Drop)
        );
    }
}
