pub mod blocklist_feeder;
pub mod metrics;
pub mod query_log_store;

pub use blocklist_feeder::{BlocklistFeeder, BlocklistPayload};
pub use metrics::{MetricsRecorder, NoopMetrics};
pub use query_log_store::{QueryLogFilter, QueryLogStore, StoredDecision};
