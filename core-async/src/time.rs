//! Time utilities.
//!
//! Re-exports Tokio's timer wheel primitives alongside the std duration types
//! so callers only import one module.

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
pub use tokio::time::{error::Elapsed, interval, sleep, sleep_until, timeout, Interval, Sleep};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Returns 0 if the system clock reports a time before the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_to_millis() {
        assert_eq!(duration_to_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(duration_to_millis(Duration::from_micros(1500)), 1);
        assert_eq!(duration_to_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_now_millis_is_after_epoch() {
        assert!(now_millis() > 0);
    }
}
