//! Wall-clock access

use chrono::{DateTime, Utc};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Source of the current time
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fractional hours elapsed from `since` to `now`.
///
/// Negative when `since` lies in the future (clock skew between the store
/// and this host).
pub fn elapsed_hours(now: DateTime<Utc>, since: DateTime<Utc>) -> f64 {
    (now - since).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_elapsed_hours_fractional() {
        let now = Utc::now();
        let since = now - Duration::minutes(90);
        assert!((elapsed_hours(now, since) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_hours_future_record() {
        let now = Utc::now();
        let since = now + Duration::hours(2);
        assert!(elapsed_hours(now, since) < 0.0);
    }
}
