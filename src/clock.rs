//! Write timestamps
//!
//! Nanosecond timestamps anchored to the wall clock once, then advanced by
//! a monotonic `Instant`. Successive readings of one clock are strictly
//! increasing, even across threads and even when two reads land in the same
//! nanosecond.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::store::Timestamp;

/// Strictly increasing nanosecond clock
pub struct MonotonicClock {
    /// Monotonic reference point
    anchor: Instant,

    /// Wall-clock nanos since the Unix epoch at `anchor`
    anchor_nanos: i64,

    /// Last value handed out
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let anchor_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or(0);

        Self {
            anchor: Instant::now(),
            anchor_nanos,
            last: AtomicI64::new(0),
        }
    }

    /// Next timestamp: the current reading, or one past the previous value
    /// if the reading has not moved
    pub fn now(&self) -> Timestamp {
        let elapsed = i64::try_from(self.anchor.elapsed().as_nanos()).unwrap_or(i64::MAX);
        let reading = self.anchor_nanos.saturating_add(elapsed);

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = reading.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_CLOCK: OnceLock<MonotonicClock> = OnceLock::new();

/// Timestamp from the process-wide clock
pub fn now_nanos() -> Timestamp {
    PROCESS_CLOCK.get_or_init(MonotonicClock::new).now()
}
