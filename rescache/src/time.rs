//! Time-related utility functions.
//!
//! Cache entries record their last access as milliseconds since the Unix
//! epoch so the value survives serialization and process restarts.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Returns 0 if the system clock is set before the epoch.
pub fn now_millis() -> u64 {
    system_time_to_millis(SystemTime::now())
}

/// Convert a `SystemTime` to milliseconds since the Unix epoch.
///
/// Times before the epoch clamp to 0.
///
/// # Example
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use rescache::time::system_time_to_millis;
///
/// let t = UNIX_EPOCH + Duration::from_millis(1_500);
/// assert_eq!(system_time_to_millis(t), 1_500);
/// ```
pub fn system_time_to_millis(system_time: SystemTime) -> u64 {
    system_time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn now_millis_is_monotonic_enough() {
        let a = now_millis();
        std::thread::sleep(Duration::from_millis(5));
        let b = now_millis();
        assert!(b >= a);
    }

    #[test]
    fn system_time_before_epoch_clamps_to_zero() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(system_time_to_millis(before), 0);
    }

    #[test]
    fn system_time_past() {
        let past = SystemTime::now() - Duration::from_secs(60);
        let elapsed = now_millis() - system_time_to_millis(past);
        assert!((59_000..=61_000).contains(&elapsed));
    }
}
