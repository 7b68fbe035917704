//! Glory-Hole Background Jobs
//!
//! Periodic maintenance off the query hot path: cache cleanup, rate
//! limiter sweeps and query log retention. All jobs run on their own
//! intervals and stop via a shared `CancellationToken`.
pub mod cache_maintenance;
pub mod query_log_retention;
pub mod rate_limit_sweep;
pub mod runner;

pub use cache_maintenance::CacheMaintenanceJob;
pub use query_log_retention::QueryLogRetentionJob;
pub use rate_limit_sweep::RateLimitSweepJob;
pub use runner::JobRunner;
