//! Sliding-window per-client rate limiter.
//!
//! Tracks request timestamps per client key (typically the peer address).
//! Constructed once per process and shared by handle; state is in-memory
//! only and resets on restart. Client keys are never evicted — unbounded
//! key growth over the process lifetime is a known, accepted gap.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// In-memory sliding-window rate limiter.
///
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly). The
/// prune-check-append sequence runs under a single guard, so concurrent
/// requests from the same key cannot double-count.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The per-window request cap (used in the denial message).
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Check if the client may proceed. Returns `true` if allowed.
    ///
    /// A denied call records nothing, so denials do not extend the window.
    pub fn allow(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        let timestamps = clients.entry(client_key.to_string()).or_default();

        // Remove expired timestamps
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests as usize {
            warn!(client = %client_key, "Rate limit exceeded");
            return false;
        }

        timestamps.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_cap_then_denies() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        for i in 0..10 {
            assert!(limiter.allow("1.2.3.4"), "call {i} should be allowed");
        }
        assert!(!limiter.allow("1.2.3.4"), "11th call must be denied");
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn window_expiry_readmits() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.allow("c"));
        assert!(!limiter.allow("c"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow("c"));
    }

    #[test]
    fn denied_calls_do_not_extend_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(40));
        assert!(limiter.allow("d"));
        std::thread::sleep(Duration::from_millis(25));
        // Denied — but must not refresh the recorded timestamp.
        assert!(!limiter.allow("d"));
        std::thread::sleep(Duration::from_millis(25));
        assert!(limiter.allow("d"));
    }

    #[test]
    fn shared_across_threads() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(60)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..25).filter(|_| limiter.allow("shared")).count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 100);
        assert!(!limiter.allow("shared"));
    }
}
