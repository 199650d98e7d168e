use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter keyed by operation name.
///
/// Each check records the current instant, evicts instants older than the
/// window, and reports whether the window is over its limit. Callers decide
/// what to do with a limited verdict; there is no queueing or backoff here.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        RateLimiter {
            limit,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record one hit for `key` and return true when the window is exhausted.
    pub fn is_limited(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap();
        let window = hits.entry(key.to_string()).or_default();

        window.push_back(now);
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) > self.window {
                window.pop_front();
            } else {
                break;
            }
        }

        window.len() > self.limit
    }
}
