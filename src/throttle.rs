//! Minimum-interval gate shared by source polling and environment queries.
//!
//! Uses `tokio::time::Instant` so paused-clock tests drive it deterministically.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// Ready immediately; the interval applies from the first acquisition on.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Counts as if just acquired.
    pub fn armed(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Some(Instant::now()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time left before the next acquisition is allowed.
    pub fn remaining(&self) -> Duration {
        match self.last {
            None => Duration::ZERO,
            Some(t) => self.min_interval.saturating_sub(t.elapsed()),
        }
    }

    /// Non-blocking: acquire and return true, or leave state untouched.
    pub fn try_acquire(&mut self) -> bool {
        if self.remaining().is_zero() {
            self.last = Some(Instant::now());
            true
        } else {
            false
        }
    }

    /// Sleep out whatever remains of the interval, then acquire.
    pub async fn acquire(&mut self) {
        let wait = self.remaining();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.last = Some(Instant::now());
    }
}
