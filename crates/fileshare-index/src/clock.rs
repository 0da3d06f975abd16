//! Time source abstraction
//!
//! Expiry arithmetic and the expired-record sweep both read the current time
//! through this trait so tests can pin the clock.

use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    /// Current time as UTC epoch seconds.
    fn now_utc_secs(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A settable clock for tests and harnesses.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_utc_secs(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
