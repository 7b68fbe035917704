use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

struct Gate {
    name: &'static str,
    enabled: AtomicBool,
    expires_at: Mutex<Option<Instant>>,
}

impl Gate {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            enabled: AtomicBool::new(true),
            expires_at: Mutex::new(None),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Zero duration disables indefinitely; positive schedules re-enable.
    fn disable(&self, duration: Duration, now: Instant) {
        let expires = if duration.is_zero() {
            None
        } else {
            Some(now + duration)
        };
        *self.expires_at.lock().unwrap() = expires;
        self.enabled.store(false, Ordering::Release);
        info!(
            stage = self.name,
            auto_enable = expires.is_some(),
            "Kill-switch engaged"
        );
    }

    fn enable(&self) {
        *self.expires_at.lock().unwrap() = None;
        self.enabled.store(true, Ordering::Release);
        info!(stage = self.name, "Kill-switch released");
    }

    /// Flip back on if the expiry has passed. Returns true when flipped.
    fn poll(&self, now: Instant) -> bool {
        let mut expires = self.expires_at.lock().unwrap();
        match *expires {
            Some(at) if now >= at => {
                *expires = None;
                self.enabled.store(true, Ordering::Release);
                info!(stage = self.name, "Kill-switch auto-expired, stage re-enabled");
                true
            }
            _ => false,
        }
    }
}

/// Runtime gates for the blocklist and policy stages, with optional
/// auto-expiry. Flag reads are plain atomic loads; a background worker
/// polls pending expirations on a sub-second interval.
pub struct KillSwitch {
    blocklist: Gate,
    policies: Gate,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self {
            blocklist: Gate::new("blocklist"),
            policies: Gate::new("policies"),
        }
    }

    pub fn blocklist_enabled(&self) -> bool {
        self.blocklist.is_enabled()
    }

    pub fn policies_enabled(&self) -> bool {
        self.policies.is_enabled()
    }

    pub fn disable_blocklist(&self, duration: Duration) {
        self.blocklist.disable(duration, Instant::now());
    }

    pub fn enable_blocklist(&self) {
        self.blocklist.enable();
    }

    pub fn disable_policies(&self, duration: Duration) {
        self.policies.disable(duration, Instant::now());
    }

    pub fn enable_policies(&self) {
        self.policies.enable();
    }

    pub fn poll_expirations(&self) {
        self.poll_expirations_at(Instant::now());
    }

    pub fn poll_expirations_at(&self, now: Instant) {
        self.blocklist.poll(now);
        self.policies.poll(now);
    }

    /// Background expirer; one per process.
    pub fn spawn_expirer(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let switch = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Kill-switch expirer shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        switch.poll_expirations();
                    }
                }
            }
        })
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}
