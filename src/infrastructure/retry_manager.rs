//! Retry policy and human-like pacing
//!
//! Navigation is retried a bounded number of times with a randomized pause
//! between attempts. The same pause paces per-item extraction so the run
//! keeps a human browsing rhythm.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Uniform pause bounds, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl DelayRange {
    pub const fn new(min_seconds: f64, max_seconds: f64) -> Self {
        Self { min_seconds, max_seconds }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn is_valid(&self) -> bool {
        self.min_seconds >= 0.0 && self.min_seconds <= self.max_seconds
    }

    /// Draw a duration uniformly from the range.
    ///
    /// Equal or inverted bounds yield the minimum.
    pub fn sample(&self) -> Duration {
        let min = self.min_seconds.max(0.0);
        let seconds = if self.max_seconds > min {
            min + fastrand::f64() * (self.max_seconds - min)
        } else {
            min
        };
        Duration::from_secs_f64(seconds)
    }
}

/// Randomized pause between browsing actions
#[derive(Debug, Clone, Copy)]
pub struct HumanDelay {
    range: DelayRange,
}

impl HumanDelay {
    pub const fn new(range: DelayRange) -> Self {
        Self { range }
    }

    pub async fn pause(&self) {
        let delay = self.range.sample();
        if !delay.is_zero() {
            debug!("Human-like pause for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

/// Bounded attempt counter for a retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Configured attempts, never less than one
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Record a failed attempt and pause if another attempt follows.
    ///
    /// Returns whether the caller should try again.
    pub async fn after_failure(&self, operation: &str, attempt: u32, error: &str, delay: &HumanDelay) -> bool {
        warn!("{} failed (attempt {}/{}): {}", operation, attempt, self.max_attempts(), error);
        if self.has_attempts_left(attempt) {
            delay.pause().await;
            true
        } else {
            false
        }
    }
}
