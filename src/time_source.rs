//! Time source abstraction for real and manually driven clocks.
//!
//! Everything that asks "what time is it" or "wait this long" goes through a
//! [`TimeSource`]: the scheduler deciding which jobs are due, the actuator
//! holding a motor pulse, the event log stamping lines. The daemon shares one
//! real clock between its components; tests hand components a [`ManualTimeSource`]
//! whose `sleep` fast-forwards instead of blocking, so a 50 second door pulse
//! costs nothing in a unit test.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

/// Process-wide real clock
static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Get the current instant
    fn now(&self) -> DateTime<Utc>;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: StdDuration);
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }
}

/// Manually driven clock.
///
/// Time only moves when a test calls [`set`](Self::set) or
/// [`advance`](Self::advance), or when a component sleeps on it: `sleep`
/// advances the clock by exactly the requested duration and returns after a
/// minimal real pause so other threads get scheduled.
pub struct ManualTimeSource {
    current: Mutex<DateTime<Utc>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = instant;
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: StdDuration) {
        if let Ok(mut guard) = self.current.lock() {
            *guard += ChronoDuration::milliseconds(by.as_millis() as i64);
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.current
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    fn sleep(&self, duration: StdDuration) {
        self.advance(duration);
        std::thread::sleep(StdDuration::from_millis(1));
    }
}

/// Shared handle to the global time source, for injection into components.
pub fn shared() -> Arc<dyn TimeSource> {
    Arc::clone(TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource)))
}

/// Get the current time from the global time source
pub fn now() -> DateTime<Utc> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource)).now()
}

/// Parse a date in the format "YYYY-MM-DD"
pub fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date format: {e}. Use YYYY-MM-DD"))
}
