use time::{Date, OffsetDateTime, UtcOffset};
use tracing::warn;

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Reads the system clock in a local offset fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Must run before the runtime spawns worker threads; `time` refuses to
    /// read the local offset from a multi-threaded process on unix.
    ///
    /// The offset is read once. After a daylight-saving change "today" and the
    /// nightly purge run one hour off until the process restarts.
    pub fn detect() -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or_else(|e| {
            warn!(error = %e, "local offset unavailable; using UTC");
            UtcOffset::UTC
        });
        Self::new(offset)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Manually driven clock for tests.
#[cfg(test)]
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<OffsetDateTime>,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self { now: std::sync::Mutex::new(now) }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod clock_tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn system_clock_reports_in_its_offset() {
        let clock = SystemClock::new(offset!(+2));
        assert_eq!(clock.now().offset(), offset!(+2));
    }

    #[test]
    fn unix_millis_truncates_nanos() {
        assert_eq!(unix_millis(datetime!(1970-01-01 0:00:01.0019 UTC)), 1001);
    }
}
