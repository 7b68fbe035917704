use gloryhole_infrastructure::dns::cache::ResponseCache;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically removes expired cache entries (the cache never removes
/// them synchronously on reads).
pub struct CacheMaintenanceJob {
    cache: Arc<ResponseCache>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl CacheMaintenanceJob {
    pub fn new(cache: Arc<ResponseCache>, interval_secs: u64) -> Self {
        Self {
            cache,
            interval_secs,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "Starting cache maintenance job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("CacheMaintenanceJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = self.cache.cleanup();
                        debug!(removed, "Cache maintenance pass completed");
                    }
                }
            }
        });
    }
}
