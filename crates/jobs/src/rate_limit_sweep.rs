use gloryhole_infrastructure::dns::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Evicts rate-limiter entries for clients that have gone quiet.
pub struct RateLimitSweepJob {
    limiter: Arc<RateLimiter>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl RateLimitSweepJob {
    pub fn new(limiter: Arc<RateLimiter>, interval_secs: u64) -> Self {
        Self {
            limiter,
            interval_secs,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "Starting rate limiter sweep job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("RateLimitSweepJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = self.limiter.sweep();
                        debug!(removed, "Rate limiter sweep completed");
                    }
                }
            }
        });
    }
}
