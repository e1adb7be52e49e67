//! Sync driver configuration.

use std::time::Duration;

/// How long the driver waits on the result queue before re-checking its loop
/// conditions. A latency/responsiveness knob, not a correctness parameter.
pub const DEFAULT_QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How many recent headers the driver replays on resume to recover
/// non-canonical tips already on disk. Tunable; whether 128 covers every
/// tie-break scenario is an open question inherited from the protocol.
pub const DEFAULT_RESUME_LOOKBACK: u64 = 128;

/// How many recent headers the exchange receives as bootstrap context at
/// startup.
pub const DEFAULT_BOOTSTRAP_HEADERS: u64 = 65_536;

/// How many blocks below the confirmed head the fork-choice view retains.
/// Must stay at least as large as the resume look-back.
pub const DEFAULT_PRUNE_WINDOW: u64 = 128;

/// Configuration for the sync driver.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bounded wait on the result queue per loop iteration.
    pub queue_poll_interval: Duration,
    /// Headers replayed into the fork-choice view on resume.
    pub resume_lookback: u64,
    /// Headers handed to the exchange as bootstrap context.
    pub bootstrap_headers: u64,
    /// Retention window of the fork-choice view below the confirmed head.
    pub prune_window: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_poll_interval: DEFAULT_QUEUE_POLL_INTERVAL,
            resume_lookback: DEFAULT_RESUME_LOOKBACK,
            bootstrap_headers: DEFAULT_BOOTSTRAP_HEADERS,
            prune_window: DEFAULT_PRUNE_WINDOW,
        }
    }
}

impl SyncConfig {
    /// Set the queue poll interval.
    pub fn with_queue_poll_interval(mut self, interval: Duration) -> Self {
        self.queue_poll_interval = interval;
        self
    }

    /// Set the resume look-back.
    pub fn with_resume_lookback(mut self, lookback: u64) -> Self {
        self.resume_lookback = lookback;
        self
    }

    /// Set the bootstrap header count.
    pub fn with_bootstrap_headers(mut self, count: u64) -> Self {
        self.bootstrap_headers = count;
        self
    }

    /// Set the fork-choice retention window.
    pub fn with_prune_window(mut self, window: u64) -> Self {
        self.prune_window = window;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.queue_poll_interval, Duration::from_millis(100));
        assert_eq!(config.resume_lookback, 128);
        assert_eq!(config.bootstrap_headers, 65_536);
        assert_eq!(config.prune_window, 128);
    }
}
