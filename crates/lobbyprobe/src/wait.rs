//! Bounded polling.
//!
//! Every post-condition check in the engine (dropdown verification, lobby
//! marker disappearance or reappearance) is a [`poll_until`] call with an
//! explicit timeout and interval, so no wait can block forever.

use crate::clock::Clock;
use crate::result::ProbeResult;
use std::time::Duration;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default polling interval (150ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 150;

/// Default timeout (3s)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 3_000;

/// Shortest pause between evaluations; a zero interval still lets time pass
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// POLL OPTIONS
// =============================================================================

/// Timeout and interval of a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Give up once this much time has elapsed
    pub timeout: Duration,
    /// Pause between evaluations
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl PollOptions {
    /// Create options from a timeout and an interval
    #[must_use]
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Create options from milliseconds
    #[must_use]
    pub const fn from_millis(timeout_ms: u64, interval_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        )
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitResult {
    /// Whether the predicate held before the deadline
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of predicate evaluations
    pub polls: u32,
}

impl WaitResult {
    /// Create a successful wait result
    #[must_use]
    pub const fn success(elapsed: Duration, polls: u32) -> Self {
        Self {
            success: true,
            elapsed,
            polls,
        }
    }

    /// Create a timeout wait result
    #[must_use]
    pub const fn timeout(elapsed: Duration, polls: u32) -> Self {
        Self {
            success: false,
            elapsed,
            polls,
        }
    }
}

// =============================================================================
// POLL LOOP
// =============================================================================

/// Evaluate `predicate` until it holds or `options.timeout` elapses.
///
/// The predicate runs at least once. Time is measured on `clock`, so a
/// fake clock makes the loop run without real delays. Predicate errors end
/// the loop and propagate.
pub fn poll_until<F>(clock: &dyn Clock, options: PollOptions, mut predicate: F) -> ProbeResult<WaitResult>
where
    F: FnMut() -> ProbeResult<bool>,
{
    let start = clock.now();
    let mut polls = 0u32;
    loop {
        polls += 1;
        if predicate()? {
            return Ok(WaitResult::success(clock.now().saturating_sub(start), polls));
        }
        let elapsed = clock.now().saturating_sub(start);
        if elapsed >= options.timeout {
            return Ok(WaitResult::timeout(elapsed, polls));
        }
        clock.sleep(options.interval.max(MIN_POLL_INTERVAL).min(options.timeout - elapsed));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::result::ProbeError;

    mod poll_options_tests {
        use super::*;

        #[test]
        fn test_default() {
            let opts = PollOptions::default();
            assert_eq!(opts.timeout, Duration::from_secs(3));
            assert_eq!(opts.interval, Duration::from_millis(150));
        }

        #[test]
        fn test_builders() {
            let opts = PollOptions::from_millis(2_500, 150)
                .with_interval(Duration::from_millis(400))
                .with_timeout(Duration::from_secs(16));
            assert_eq!(opts, PollOptions::from_millis(16_000, 400));
        }
    }

    mod poll_until_tests {
        use super::*;

        #[test]
        fn test_immediate_success_does_not_sleep() {
            let clock = FakeClock::new();
            let result = poll_until(&clock, PollOptions::default(), || Ok(true)).unwrap();
            assert!(result.success);
            assert_eq!(result.polls, 1);
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_success_after_a_few_polls() {
            let clock = FakeClock::new();
            let mut calls = 0;
            let result = poll_until(&clock, PollOptions::from_millis(2_500, 150), || {
                calls += 1;
                Ok(calls == 4)
            })
            .unwrap();
            assert!(result.success);
            assert_eq!(result.polls, 4);
            assert_eq!(result.elapsed, Duration::from_millis(450));
        }

        #[test]
        fn test_timeout_is_bounded() {
            let clock = FakeClock::new();
            let result = poll_until(&clock, PollOptions::from_millis(2_500, 150), || Ok(false)).unwrap();
            assert!(!result.success);
            assert_eq!(result.elapsed, Duration::from_millis(2_500));
            // 0, 150, ..., 2400 and the final check at 2500
            assert_eq!(result.polls, 18);
        }

        #[test]
        fn test_zero_timeout_checks_once() {
            let clock = FakeClock::new();
            let result = poll_until(&clock, PollOptions::from_millis(0, 100), || Ok(false)).unwrap();
            assert!(!result.success);
            assert_eq!(result.polls, 1);
        }

        #[test]
        fn test_zero_interval_still_times_out() {
            let clock = FakeClock::new();
            let result = poll_until(&clock, PollOptions::from_millis(50, 0), || Ok(false)).unwrap();
            assert!(!result.success);
            assert_eq!(result.elapsed, Duration::from_millis(50));
            assert_eq!(result.polls, 51);
            assert_eq!(clock.sleep_count(), 50);
        }

        #[test]
        fn test_predicate_error_propagates() {
            let clock = FakeClock::new();
            let result = poll_until(&clock, PollOptions::default(), || {
                Err(ProbeError::browser("screenshot failed"))
            });
            assert!(result.is_err());
        }
    }
}
