//! Common types used across the platform

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Half-open instant interval `[start, end)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The whole UTC day of `date`
    pub fn day(date: NaiveDate) -> Self {
        Self::dates(date, date)
    }

    /// From the start of `start` up to the end of `end` (inclusive dates)
    pub fn dates(start: NaiveDate, end: NaiveDate) -> Self {
        let next = end.checked_add_days(Days::new(1)).unwrap_or(end);
        Self {
            start: midnight(start),
            end: midnight(next),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

/// Inclusive date range for report queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::dates(self.start, self.end)
    }
}
