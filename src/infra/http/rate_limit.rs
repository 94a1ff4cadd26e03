use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request against its client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub retry_after_secs: u64,
}

/// Fixed-window request counter keyed by client identity.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        let now = Instant::now();
        let window = self.window;

        let mut entry = self
            .buckets
            .entry(client.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });
        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);

        let reset_in = window.saturating_sub(now.duration_since(entry.started));
        RateDecision {
            allowed: entry.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            retry_after_secs: ceil_secs(reset_in).max(1),
        }
    }

    /// Drop windows that have already elapsed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, w| now.duration_since(w.started) < self.window);
        before.saturating_sub(self.buckets.len())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rejects_after_ceiling_until_window_resets() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("10.0.0.1");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let rejected = limiter.check("10.0.0.1");
        assert!(!rejected.allowed);
        assert_eq!(rejected.retry_after_secs, 60);

        tokio::time::advance(Duration::from_secs(45)).await;
        let still = limiter.check("10.0.0.1");
        assert!(!still.allowed);
        assert_eq!(still.retry_after_secs, 15);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(limiter.check("10.0.0.1").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn prune_drops_only_elapsed_windows() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 5);
        limiter.check("old");
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.check("new");
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(limiter.prune(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
