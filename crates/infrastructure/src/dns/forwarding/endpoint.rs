use gloryhole_domain::{DomainError, UpstreamEndpoint};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One upstream endpoint with its advisory health data: an EWMA of
/// round-trip time and an in-flight gauge. Neither gates selection (the
/// forwarder is strictly round-robin) but both feed metrics and logs.
pub struct EndpointState {
    pub endpoint: UpstreamEndpoint,
    pub display: Arc<str>,
    /// Microseconds; 0 means no sample yet.
    rtt_us: AtomicU64,
    in_flight: AtomicU32,
}

impl EndpointState {
    pub fn new(endpoint: UpstreamEndpoint) -> Self {
        let display = Arc::from(endpoint.to_string());
        Self {
            endpoint,
            display,
            rtt_us: AtomicU64::new(0),
            in_flight: AtomicU32::new(0),
        }
    }

    /// Fold a new sample into the EWMA (1/8 weight).
    pub fn record_rtt(&self, rtt: Duration) {
        let sample = rtt.as_micros().min(u128::from(u64::MAX)) as u64;
        let previous = self.rtt_us.load(Ordering::Relaxed);
        let next = if previous == 0 {
            sample
        } else {
            previous - previous / 8 + sample / 8
        };
        self.rtt_us.store(next.max(1), Ordering::Relaxed);
    }

    pub fn rtt(&self) -> Option<Duration> {
        match self.rtt_us.load(Ordering::Relaxed) {
            0 => None,
            us => Some(Duration::from_micros(us)),
        }
    }

    pub fn begin_request(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn end_request(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

/// Parse endpoint specs into shared endpoint states.
pub fn build_pool(specs: &[String]) -> Result<Vec<Arc<EndpointState>>, DomainError> {
    specs
        .iter()
        .map(|spec| {
            spec.parse::<UpstreamEndpoint>()
                .map(|endpoint| Arc::new(EndpointState::new(endpoint)))
        })
        .collect()
}
