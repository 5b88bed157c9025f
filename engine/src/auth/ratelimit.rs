//! Per-username failed-login counter with time-window reset.
//!
//! Deliberately simple: one counter and one window-start timestamp per
//! username, reset wholesale once the window elapses rather than a sliding
//! window. A login storm against one username is what this defends
//! against, not precise rate accounting.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::Error;

struct Counter {
    failures: u32,
    window_start: Instant,
}

pub struct LoginRateLimiter {
    max_attempts: u32,
    window: Duration,
    counters: Mutex<HashMap<String, Counter>>,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self { max_attempts, window, counters: Mutex::new(HashMap::new()) }
    }

    /// Must be called before attempting to verify a login's credentials.
    /// Returns `TooManyRequests` if `username` has exceeded its failure
    /// budget within the current window.
    pub fn check(&self, username: &str) -> Result<(), Error> {
        let mut guard = self.counters.lock().expect("rate limiter lock poisoned");
        if let Some(counter) = guard.get_mut(username) {
            if counter.window_start.elapsed() >= self.window {
                counter.failures = 0;
                counter.window_start = Instant::now();
            }
            if counter.failures >= self.max_attempts {
                return Err(Error::TooManyRequests(format!("too many failed login attempts for '{username}'")));
            }
        }
        Ok(())
    }

    pub fn record_failure(&self, username: &str) {
        let mut guard = self.counters.lock().expect("rate limiter lock poisoned");
        let counter = guard.entry(username.to_string()).or_insert_with(|| Counter { failures: 0, window_start: Instant::now() });
        if counter.window_start.elapsed() >= self.window {
            counter.failures = 0;
            counter.window_start = Instant::now();
        }
        counter.failures += 1;
    }

    pub fn reset(&self, username: &str) {
        self.counters.lock().expect("rate limiter lock poisoned").remove(username);
    }
}
