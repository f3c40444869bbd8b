use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Sliding-window rate limiter for dialogue requests.
///
/// Shared by every concurrent `ask` on one orchestrator. Never blocks or
/// queues: a denied request is simply not recorded.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    /// A limit of 0 means unlimited (always allows).
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    pub fn allow_at(&self, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }

        let mut admitted = self.admitted.lock().unwrap_or_else(PoisonError::into_inner);

        // Remove expired entries
        if let Some(cutoff) = now.checked_sub(self.window) {
            while admitted.front().is_some_and(|&t| t <= cutoff) {
                admitted.pop_front();
            }
        }

        if admitted.len() >= self.limit as usize {
            return false;
        }

        admitted.push_back(now);
        true
    }

    /// Requests currently counted against the window.
    pub fn in_window(&self) -> usize {
        self.admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
