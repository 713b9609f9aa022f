//! Minimum-interval throttling for generator calls.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Enforces a minimum interval between consecutive calls.
///
/// Construct one per process and share it (e.g. behind an `Arc`) between
/// every caller of the rate-limited service. Callers queue on an internal
/// mutex, so concurrent [`acquire`](MinIntervalThrottle::acquire)s are
/// released one at a time, each at least `min_interval` after the previous.
///
/// Time is read from `tokio::time`, so tests can drive it with a paused clock.
#[derive(Debug)]
pub struct MinIntervalThrottle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl MinIntervalThrottle {
    /// Create a throttle allowing one call per `min_interval`.
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_call: Mutex::new(None) }
    }

    /// The configured minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a call may proceed, then record it as started.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;
        let mut waited = Duration::ZERO;

        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                debug!(wait_ms = waited.as_millis() as u64, "throttling generator call");
                sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
        waited
    }
}
