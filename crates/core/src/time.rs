use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Render a second count the way students read it on submissions: `59m 3s`.
#[must_use]
pub fn format_minutes_seconds(total_secs: u64) -> String {
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

/// Render a remaining-time display: `05:07`.
#[must_use]
pub fn format_clock(total_secs: u32) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(90));
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_minutes_seconds(3540), "59m 0s");
        assert_eq!(format_minutes_seconds(61), "1m 1s");
        assert_eq!(format_clock(307), "05:07");
        assert_eq!(format_clock(3600), "60:00");
    }
}
