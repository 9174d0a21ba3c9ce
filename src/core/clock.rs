//! Time sources
//!
//! View functions take `now` as an explicit unix timestamp so they stay pure;
//! callers obtain it from a [`Clock`]. The process-wide clock samples chrono
//! once and advances with a monotonic `Instant`, so repeated reads during a
//! recompute never go backwards.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Source of unix time in seconds
pub trait Clock: Send + Sync {
    fn now_unix_secs(&self) -> i64;
}

/// Monotonic clock anchored to chrono's wall time at construction
#[derive(Debug)]
pub struct MonotonicClock {
    base_instant: Instant,
    base_timestamp_us: i64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { base_instant: Instant::now(), base_timestamp_us: chrono::Utc::now().timestamp_micros() }
    }

    #[inline(always)]
    pub fn now_micros(&self) -> i64 {
        self.base_timestamp_us + self.base_instant.elapsed().as_micros() as i64
    }

    #[inline(always)]
    pub fn elapsed_micros_since(&self, start_timestamp_us: i64) -> i64 {
        self.now_micros() - start_timestamp_us
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_unix_secs(&self) -> i64 {
        self.now_micros() / 1_000_000
    }
}

/// Settable clock for tests and replays
#[derive(Debug, Default)]
pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn new(unix_secs: i64) -> Self {
        Self(AtomicI64::new(unix_secs))
    }

    pub fn set(&self, unix_secs: i64) {
        self.0.store(unix_secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix_secs(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

static GLOBAL_CLOCK: once_cell::sync::OnceCell<MonotonicClock> = once_cell::sync::OnceCell::new();

fn global() -> &'static MonotonicClock {
    GLOBAL_CLOCK.get_or_init(MonotonicClock::new)
}

/// Current unix time in seconds
#[inline(always)]
pub fn now_unix_secs() -> i64 {
    global().now_unix_secs()
}

/// Current unix time in microseconds
#[inline(always)]
pub fn now_micros() -> i64 {
    global().now_micros()
}

#[inline(always)]
pub fn elapsed_micros_since(start_timestamp_us: i64) -> i64 {
    global().elapsed_micros_since(start_timestamp_us)
}
