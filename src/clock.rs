//! Time sources used for session timing and log timestamps.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Clock collaborator.
pub trait Clock: Send + Sync {
    /// Monotonic nanoseconds. Only differences are meaningful.
    fn monotonic_nanos(&self) -> i64;

    /// Wall-clock milliseconds since the Unix epoch.
    fn wall_clock_millis(&self) -> i64;
}

/// Real clock.
///
/// Monotonic time is anchored to the wall clock at construction, so values
/// from separate runs land on one comparable time line.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    origin_nanos: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_nanos: Utc::now().timestamp_nanos_opt().unwrap_or(0),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_nanos(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.origin_nanos.saturating_add(elapsed)
    }

    fn wall_clock_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for deterministic sessions.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicI64,
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(nanos: i64, millis: i64) -> Self {
        Self {
            nanos: AtomicI64::new(nanos),
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }

    /// Move both time lines forward by `nanos`.
    pub fn advance(&self, nanos: i64) {
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
        self.millis.fetch_add(nanos / 1_000_000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic_nanos(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }

    fn wall_clock_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
