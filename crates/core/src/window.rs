//! Time windows for history queries.

use chrono::{Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::Time;

/// Look-back period for an insight run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    /// Seven days (`1w`)
    Week,
    /// Thirty days (`1m`)
    Month,
}

impl Period {
    /// Length of the period.
    pub fn duration(&self) -> Duration {
        match self {
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
        }
    }

    /// Short code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "1w",
            Period::Month => "1m",
        }
    }
}

/// Error parsing a [`Period`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown period '{0}', expected 1w or 1m")]
pub struct ParsePeriodError(String);

impl std::str::FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1w" | "week" => Ok(Period::Week),
            "1m" | "month" => Ok(Period::Month),
            other => Err(ParsePeriodError(other.to_string())),
        }
    }
}

/// An inclusive range of calendar days plus the clock value of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First day, inclusive
    pub start: NaiveDate,
    /// Last day, inclusive
    pub end: NaiveDate,
    /// When the run was started; used as the insight timestamp
    pub as_of: Time,
}

impl TimeWindow {
    /// Create a window. `start` and `end` are swapped if given out of order.
    pub fn new(start: NaiveDate, end: NaiveDate, as_of: Time) -> Self {
        if start <= end {
            Self { start, end, as_of }
        } else {
            Self { start: end, end: start, as_of }
        }
    }

    /// The period ending at `as_of`, with days taken in the given time zone.
    pub fn ending_at<Tz: TimeZone>(as_of: Time, period: Period, tz: &Tz) -> Self {
        let end = as_of.with_timezone(tz).date_naive();
        let start = (as_of - period.duration()).with_timezone(tz).date_naive();
        Self::new(start, end, as_of)
    }

    /// Whether a day falls inside the window.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}
