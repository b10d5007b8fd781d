use crate::llm::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum spacing between physical requests.
///
/// The lock is held across the wait, so concurrent callers sharing one
/// limiter line up instead of all sleeping out the same gap.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
            clock,
        }
    }

    /// Waits until the interval since the previous request has passed, then
    /// stamps and returns the send time.
    pub async fn acquire(&self) -> Instant {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!("Throttling request for {}ms", wait.as_millis());
                self.clock.sleep(wait).await;
            }
        }

        let now = self.clock.now();
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    pub async fn last_request_time(&self) -> Option<Instant> {
        *self.last_request.lock().await
    }
}
