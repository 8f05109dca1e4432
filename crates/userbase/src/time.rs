use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock timestamps, in unix milliseconds.
///
/// The store stamps `created_at` through this trait so tests can pin time.
pub trait TimeSource: Send + Sync {
    fn current_millis(&self) -> i64;
}

/// [`TimeSource`] backed by [`SystemTime`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> i64 {
        unix_millis()
    }
}

/// Milliseconds since the unix epoch, saturating at zero for clocks set
/// before 1970.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
