// Minimum-interval rate limiter for page fetches.
//
// Each fetch waits until at least `1 / requests_per_second` has passed since
// the previous one. The limiter is Clone and shares its state, so every
// concurrent re-analysis task draws from the same budget.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    interval: Duration,
    /// Earliest instant the next request may go out
    next_allowed: Option<Instant>,
}

impl RateLimiter {
    /// Allow `requests_per_second` requests per second. Must be positive.
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                interval: Duration::from_secs_f64(1.0 / requests_per_second),
                next_allowed: None,
            })),
        }
    }

    /// Wait for this caller's slot.
    ///
    /// The slot is reserved under the lock and the sleep happens outside it,
    /// so concurrent callers queue up one interval apart.
    pub async fn acquire(&self) {
        let wait_until = {
            let mut inner = self.inner.lock().await;
            let now = Instant::now();
            let slot = match inner.next_allowed {
                Some(next) if next > now => next,
                _ => now,
            };
            inner.next_allowed = Some(slot + inner.interval);
            slot
        };

        tokio::time::sleep_until(wait_until).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_second_request_waits_one_interval() {
        let limiter = RateLimiter::new(4.0); // 250ms apart
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(200),
            "Expected ~250ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_clones_share_budget() {
        let limiter = RateLimiter::new(4.0);
        let clone = limiter.clone();
        limiter.acquire().await;
        let start = Instant::now();
        clone.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
