//! Run clock
//!
//! The run date is captured once when the clock is started and reused for
//! every row of the run, so a run's rows always share one `date` value even
//! when the run crosses midnight.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};

/// Clock for a single pipeline run
#[derive(Debug, Clone)]
pub struct RunClock {
    date: NaiveDate,

    /// Frozen instant (tests and replays); `None` reads the system clock
    fixed: Option<DateTime<Utc>>,
}

impl RunClock {
    /// Start a clock on the local calendar date
    pub fn start() -> Self {
        Self {
            date: Local::now().date_naive(),
            fixed: None,
        }
    }

    /// A clock that always reports the same date and instant
    pub fn fixed(date: NaiveDate, instant: DateTime<Utc>) -> Self {
        Self {
            date,
            fixed: Some(instant),
        }
    }

    /// The run's calendar date
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Capture the instant for one record
    pub fn stamp(&self) -> RunInstant {
        RunInstant {
            date: self.date,
            at: self.fixed.unwrap_or_else(Utc::now),
        }
    }
}

/// Date and instant shared by the two rows derived from one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunInstant {
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
}

impl RunInstant {
    /// ISO-8601 with microseconds and an explicit `+00:00` offset
    pub fn timestamp(&self) -> String {
        self.at.to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_is_stable() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let clock = RunClock::fixed(date, at);

        assert_eq!(clock.stamp(), clock.stamp());
        assert_eq!(clock.stamp().date_string(), "2024-01-31");
        assert_eq!(clock.stamp().timestamp(), "2024-01-31T23:59:59.000000+00:00");
    }

    #[test]
    fn started_clock_keeps_run_date() {
        let clock = RunClock::start();
        let first = clock.stamp();
        let second = clock.stamp();

        assert_eq!(first.date, clock.date());
        assert_eq!(second.date, clock.date());
        assert!(second.at >= first.at);
    }
}
