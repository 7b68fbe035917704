use gloryhole_domain::config::{CacheConfig, RateLimitConfig};
use gloryhole_infrastructure::dns::cache::{CacheKey, CachedAnswer, ResponseCache, TtlHint};
use gloryhole_infrastructure::dns::rate_limit::RateLimiter;
use gloryhole_jobs::{CacheMaintenanceJob, RateLimitSweepJob};
use gloryhole_domain::RecordType;
use hickory_proto::op::ResponseCode;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cache_maintenance_removes_expired_entries() {
    let cache = Arc::new(ResponseCache::new(&CacheConfig {
        min_ttl: 1,
        ..CacheConfig::default()
    }));
    cache.put(
        CacheKey::new("short.example", RecordType::A, 1),
        CachedAnswer::positive(ResponseCode::NoError, vec![]),
        TtlHint::Positive(1),
    );
    assert_eq!(cache.len(), 1);

    let token = CancellationToken::new();
    let job = Arc::new(CacheMaintenanceJob::new(cache.clone(), 1).with_cancellation(token.clone()));
    job.start().await;

    sleep(Duration::from_millis(2400)).await;
    assert_eq!(cache.len(), 0, "expired entry should be swept");
    token.cancel();
}

#[tokio::test]
async fn rate_limit_sweep_drops_idle_clients() {
    let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
        enabled: true,
        idle_timeout_secs: 0,
        ..RateLimitConfig::default()
    }));
    limiter.check("10.0.0.1".parse().unwrap());
    limiter.check("10.0.0.2".parse().unwrap());
    assert_eq!(limiter.tracked_clients(), 2);

    let token = CancellationToken::new();
    let job = Arc::new(RateLimitSweepJob::new(limiter.clone(), 1).with_cancellation(token.clone()));
    job.start().await;

    sleep(Duration::from_millis(1300)).await;
    assert_eq!(limiter.tracked_clients(), 0);
    token.cancel();
}
