//! Clock abstraction for sleeps and poll deadlines.
//!
//! Every wait in the engine goes through [`Clock`], so tests can swap in a
//! [`FakeClock`] whose `sleep` advances time instantly and deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time and blocking sleeps
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Block for `duration`
    fn sleep(&self, duration: Duration);
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock starting now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Create a shared handle
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Fake clock for deterministic tests.
///
/// Time only moves when someone sleeps or fast-forwards it.
#[derive(Debug, Default)]
pub struct FakeClock {
    /// Current time in milliseconds since creation
    current_ms: AtomicU64,
    /// Number of `sleep` calls observed
    sleeps: AtomicU64,
}

impl FakeClock {
    /// Create a new fake clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared fake clock, keeping a typed handle for assertions
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Get current fake time in milliseconds
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Fast-forward time by duration
    pub fn fast_forward(&self, duration: Duration) {
        self.current_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Fast-forward time by milliseconds
    pub fn fast_forward_ms(&self, ms: u64) {
        self.fast_forward(Duration::from_millis(ms));
    }

    /// Number of sleeps performed through this clock
    #[must_use]
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clone for FakeClock {
    fn clone(&self) -> Self {
        Self {
            current_ms: AtomicU64::new(self.current_ms.load(Ordering::SeqCst)),
            sleeps: AtomicU64::new(self.sleeps.load(Ordering::SeqCst)),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms())
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.fast_forward(duration);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod fake_clock_tests {
        use super::*;

        #[test]
        fn test_starts_at_zero() {
            let clock = FakeClock::new();
            assert_eq!(clock.now(), Duration::ZERO);
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_sleep_advances_instantly() {
            let clock = FakeClock::new();
            let real = Instant::now();
            clock.sleep(Duration::from_secs(30));
            assert_eq!(clock.now_ms(), 30_000);
            assert_eq!(clock.sleep_count(), 1);
            assert!(real.elapsed() < Duration::from_secs(1));
        }

        #[test]
        fn test_fast_forward_does_not_count_as_sleep() {
            let clock = FakeClock::new();
            clock.fast_forward_ms(250);
            assert_eq!(clock.now(), Duration::from_millis(250));
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_clone_snapshots_time() {
            let clock = FakeClock::new();
            clock.fast_forward_ms(100);
            let copy = clock.clone();
            clock.fast_forward_ms(100);
            assert_eq!(copy.now_ms(), 100);
            assert_eq!(clock.now_ms(), 200);
        }

        #[test]
        fn test_usable_as_shared_clock() {
            let fake = FakeClock::shared();
            let shared: SharedClock = fake.clone();
            shared.sleep(Duration::from_millis(400));
            assert_eq!(fake.now_ms(), 400);
        }
    }

    mod system_clock_tests {
        use super::*;

        #[test]
        fn test_now_is_monotonic() {
            let clock = SystemClock::new();
            let a = clock.now();
            clock.sleep(Duration::from_millis(2));
            assert!(clock.now() > a);
        }
    }
}
