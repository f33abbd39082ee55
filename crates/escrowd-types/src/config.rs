//! Engine configuration.
//!
//! All timing knobs live here rather than as process-wide mutable state;
//! the engine takes a config at construction and never reads globals.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

use crate::constants;

/// Configuration for the escrow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Window between entering VERIFYING and automatic release eligibility.
    pub auto_release_window_secs: u64,
    /// Interval between scheduled sweep runs.
    pub sweep_interval_secs: u64,
    /// Timeout when acquiring a per-transaction release lock.
    pub lock_timeout_ms: u64,
    /// Attempts per release call before surrendering to the sweep.
    pub release_retry_attempts: u32,
    /// Backoff between release retry attempts.
    pub release_retry_backoff_ms: u64,
}

impl EngineConfig {
    /// The auto-release window as a chrono duration (for deadline math).
    #[must_use]
    pub fn auto_release_window(&self) -> Duration {
        Duration::seconds(i64::try_from(self.auto_release_window_secs).unwrap_or(i64::MAX))
    }

    /// The sweep interval as a std duration (for `tokio::time::interval`).
    #[must_use]
    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval_secs)
    }

    /// The lock timeout as a std duration (for `tokio::time::timeout`).
    #[must_use]
    pub fn lock_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.lock_timeout_ms)
    }

    /// The retry backoff as a std duration.
    #[must_use]
    pub fn release_retry_backoff(&self) -> StdDuration {
        StdDuration::from_millis(self.release_retry_backoff_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_release_window_secs: constants::DEFAULT_AUTO_RELEASE_WINDOW_SECS,
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
            lock_timeout_ms: constants::DEFAULT_LOCK_TIMEOUT_MS,
            release_retry_attempts: constants::DEFAULT_RELEASE_RETRY_ATTEMPTS,
            release_retry_backoff_ms: constants::DEFAULT_RELEASE_RETRY_BACKOFF_MS,
        }
    }
}
