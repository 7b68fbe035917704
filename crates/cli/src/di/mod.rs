//! Dependency wiring: builds the pipeline components from configuration
//! and hands the assembled handler to the server.

use crate::bootstrap::blocklist::FileBlocklistFeeder;
use gloryhole_application::ports::{MetricsRecorder, QueryLogStore};
use gloryhole_application::use_cases::CleanupOldQueryLogsUseCase;
use gloryhole_domain::config::Config;
use gloryhole_domain::LocalRecord;
use gloryhole_infrastructure::dns::blocklist::{BlocklistSet, DomainSetSnapshot, Whitelist};
use gloryhole_infrastructure::dns::cache::ResponseCache;
use gloryhole_infrastructure::dns::forwarding::endpoint::build_pool;
use gloryhole_infrastructure::dns::forwarding::{ConditionalForwarder, UpstreamForwarder};
use gloryhole_infrastructure::dns::kill_switch::KillSwitch;
use gloryhole_infrastructure::dns::local_records::LocalRecordsStore;
use gloryhole_infrastructure::dns::policy::PolicyEngine;
use gloryhole_infrastructure::dns::query_log::QueryLogWriter;
use gloryhole_infrastructure::dns::rate_limit::RateLimiter;
use gloryhole_infrastructure::dns::QueryHandler;
use gloryhole_infrastructure::metrics::AtomicMetricsRecorder;
use gloryhole_infrastructure::repositories::SqliteQueryLogStore;
use gloryhole_jobs::{CacheMaintenanceJob, JobRunner, QueryLogRetentionJob, RateLimitSweepJob};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct AppContext {
    pub handler: Arc<QueryHandler>,
    pub cache: Arc<ResponseCache>,
    pub rate_limiter: Arc<RateLimiter>,
    pub kill_switch: Arc<KillSwitch>,
    pub blocklist: Arc<BlocklistSet>,
    pub metrics: Arc<AtomicMetricsRecorder>,
    pub store: Arc<dyn QueryLogStore>,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let shutdown = CancellationToken::new();

        let pool = crate::bootstrap::database::connect(&config.storage.database_url).await?;
        let store: Arc<dyn QueryLogStore> = Arc::new(SqliteQueryLogStore::new(pool));
        let metrics = Arc::new(AtomicMetricsRecorder::new());

        let (log_writer, _writer_task) = QueryLogWriter::spawn(
            Arc::clone(&store),
            &config.storage,
            Arc::clone(&metrics) as Arc<dyn MetricsRecorder>,
            shutdown.clone(),
            Duration::from_millis(config.server.shutdown_drain_ms),
        );

        let feeder = Arc::new(FileBlocklistFeeder::new(config.blocking.clone()));

        let whitelist_payload = feeder.load_whitelist().await?;
        let whitelist = Arc::new(Whitelist::new(DomainSetSnapshot::compile(
            &whitelist_payload.domains,
            &whitelist_payload.patterns,
        )?));

        let blocklist = Arc::new(BlocklistSet::empty().with_feeder(feeder));
        if config.blocking.enabled {
            let size = blocklist.reload().await?;
            info!(size, "Blocklist compiled");
        } else {
            info!("Blocking disabled by configuration");
        }

        let local_records = Arc::new(LocalRecordsStore::new(config.local.cname_chase_depth));
        let records: Vec<LocalRecord> = config
            .local
            .records
            .iter()
            .map(|record| record.compile())
            .collect::<Result<_, _>>()?;
        local_records.set_records(records);

        let policies = Arc::new(PolicyEngine::from_rules(config.policies.clone())?);
        let conditional = Arc::new(ConditionalForwarder::from_rules(
            config.forwarder.rules.clone(),
        )?);
        let default_pool = build_pool(&config.forwarder.default_upstreams)?;

        let cache = Arc::new(ResponseCache::new(&config.cache));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let kill_switch = Arc::new(KillSwitch::new());
        let _expirer = kill_switch.spawn_expirer(shutdown.clone());

        let handler = Arc::new(
            QueryHandler::builder()
                .cache(Arc::clone(&cache))
                .cache_config(config.cache.clone())
                .blocklist(Arc::clone(&blocklist))
                .whitelist(whitelist)
                .local_records(local_records)
                .policies(policies)
                .conditional(conditional)
                .forwarder(Arc::new(UpstreamForwarder::new()))
                .default_pool(default_pool)
                .forwarder_config(config.forwarder.clone())
                .rate_limiter(Arc::clone(&rate_limiter))
                .kill_switch(Arc::clone(&kill_switch))
                .metrics(Arc::clone(&metrics) as Arc<dyn MetricsRecorder>)
                .log_writer(log_writer)
                .decision_trace(config.server.decision_trace)
                .query_deadline(Duration::from_millis(config.server.query_deadline_ms))
                .build(),
        );

        Ok(Self {
            handler,
            cache,
            rate_limiter,
            kill_switch,
            blocklist,
            metrics,
            store,
            shutdown,
        })
    }

    pub async fn start_jobs(&self, config: &Config) {
        let cleanup = Arc::new(CleanupOldQueryLogsUseCase::new(Arc::clone(&self.store)));

        JobRunner::new()
            .with_retention(
                QueryLogRetentionJob::new(cleanup, config.storage.retention_days)
                    .with_interval(config.storage.retention_interval_secs)
                    .with_cancellation(self.shutdown.clone()),
            )
            .with_cache_maintenance(
                CacheMaintenanceJob::new(
                    Arc::clone(&self.cache),
                    config.cache.cleanup_interval_secs,
                )
                .with_cancellation(self.shutdown.clone()),
            )
            .with_rate_limit_sweep(
                RateLimitSweepJob::new(
                    Arc::clone(&self.rate_limiter),
                    config.rate_limit.cleanup_interval_secs,
                )
                .with_cancellation(self.shutdown.clone()),
            )
            .start()
            .await;
    }
}
