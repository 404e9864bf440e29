//! Daemon clocks.
//!
//! Every timestamp the daemon produces (trace ids, capture ranges, event
//! stamps) is a nanosecond value read from a [`Clock`]. Production code uses
//! [`SteadyClock`]; tests drive a [`FakeClock`] by hand.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Source of nanosecond timestamps.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds.
    fn now_ns(&self) -> i64;
}

/// A monotonic clock anchored to the moment the daemon started.
#[derive(Debug, Clone)]
pub struct SteadyClock {
    /// The instant the clock was created.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl SteadyClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

impl Default for SteadyClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SteadyClock {
    fn now_ns(&self) -> i64 {
        // Starts at 1 so a fresh daemon never hands out a zero trace id.
        i64::try_from(self.epoch.elapsed().as_nanos())
            .unwrap_or(i64::MAX)
            .saturating_add(1)
    }
}

/// A manually driven clock for tests.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: AtomicI64,
}

impl FakeClock {
    /// Create a fake clock reading `start_ns`.
    pub fn new(start_ns: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ns),
        }
    }

    /// Set the current time.
    pub fn set(&self, ns: i64) {
        self.now.store(ns, Ordering::SeqCst);
    }

    /// Advance the clock by `delta_ns`.
    pub fn elapse(&self, delta_ns: i64) {
        self.now.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ns(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Convert nanoseconds to fractional milliseconds.
pub fn ns_to_ms(ns: i64) -> f64 {
    ns as f64 / 1_000_000.0
}
