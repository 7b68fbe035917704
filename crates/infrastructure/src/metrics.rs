use gloryhole_application::ports::MetricsRecorder;
use gloryhole_domain::RecordType;
use std::sync::atomic::{AtomicU64, Ordering};

/// Histogram bucket upper bounds, in milliseconds. The last bucket is the
/// overflow.
const DURATION_BUCKETS_MS: [f64; 10] =
    [1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0, 5000.0];

/// In-memory metrics recorder: plain atomics, no exporter binding. An HTTP
/// or Prometheus surface can snapshot it; the core only increments.
#[derive(Default)]
pub struct AtomicMetricsRecorder {
    queries_total: AtomicU64,
    queries_a: AtomicU64,
    queries_aaaa: AtomicU64,
    queries_ptr: AtomicU64,
    queries_txt: AtomicU64,
    queries_other: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    blocked: AtomicU64,
    forwarded: AtomicU64,
    rate_limited: AtomicU64,
    storage_dropped: AtomicU64,
    duration_buckets: [AtomicU64; 11],
    duration_sum_us: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub queries_a: u64,
    pub queries_aaaa: u64,
    pub queries_ptr: u64,
    pub queries_txt: u64,
    pub queries_other: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub blocked: u64,
    pub forwarded: u64,
    pub rate_limited: u64,
    pub storage_dropped: u64,
    pub duration_buckets: Vec<u64>,
    pub duration_sum_ms: f64,
}

impl AtomicMetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_total: self.queries_total.load(Ordering::Relaxed),
            queries_a: self.queries_a.load(Ordering::Relaxed),
            queries_aaaa: self.queries_aaaa.load(Ordering::Relaxed),
            queries_ptr: self.queries_ptr.load(Ordering::Relaxed),
            queries_txt: self.queries_txt.load(Ordering::Relaxed),
            queries_other: self.queries_other.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            storage_dropped: self.storage_dropped.load(Ordering::Relaxed),
            duration_buckets: self
                .duration_buckets
                .iter()
                .map(|b| b.load(Ordering::Relaxed))
                .collect(),
            duration_sum_ms: self.duration_sum_us.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

impl MetricsRecorder for AtomicMetricsRecorder {
    fn query_received(&self, record_type: RecordType) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        let counter = match record_type {
            RecordType::A => &self.queries_a,
            RecordType::Aaaa => &self.queries_aaaa,
            RecordType::Ptr => &self.queries_ptr,
            RecordType::Txt => &self.queries_txt,
            _ => &self.queries_other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn query_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    fn query_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    fn query_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    fn storage_dropped(&self) {
        self.storage_dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn query_duration_ms(&self, ms: f64) {
        let bucket = DURATION_BUCKETS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(DURATION_BUCKETS_MS.len());
        self.duration_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.duration_sum_us
            .fetch_add((ms * 1000.0) as u64, Ordering::Relaxed);
    }
}
