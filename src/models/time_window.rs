//! Trip window, 30-minute time bins, and local-time helpers.
//!
//! All instants handled here carry the trip's fixed UTC offset. The offset is
//! resolved once from the start location's IANA zone at the trip start (see
//! [`resolve_trip_zone`](crate::services::timezone::resolve_trip_zone)) and
//! never changes for the lifetime of a trip.

use crate::constants::{MAX_TRIP_WINDOW_HOURS, TIME_BIN_MINUTES};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Hard bounds of a trip, expressed in the trip's local offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl TimeRange {
    /// Build a window in `offset`. Rejects empty, inverted, and multi-day windows.
    pub fn new(
        start: OffsetDateTime,
        end: OffsetDateTime,
        offset: UtcOffset,
    ) -> Result<Self, String> {
        if end <= start {
            return Err("end time must be after start time".to_string());
        }
        let window = TimeRange {
            start: start.to_offset(offset),
            end: end.to_offset(offset),
        };
        if window.duration() > Duration::hours(MAX_TRIP_WINDOW_HOURS) {
            return Err(format!(
                "trip window must not exceed {} hours",
                MAX_TRIP_WINDOW_HOURS
            ));
        }
        Ok(window)
    }

    pub fn offset(&self) -> UtcOffset {
        self.start.offset()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Local calendar date of the trip start.
    pub fn local_date(&self) -> Date {
        self.start.date()
    }

    /// Enumerate 30-minute bins from `start` floored through `end` ceiled.
    pub fn bins(&self) -> Vec<TimeBin> {
        let first = floor_to_bin(self.start);
        let last = ceil_to_bin(self.end);
        let step = Duration::minutes(TIME_BIN_MINUTES);

        let mut bins = Vec::new();
        let mut current = first;
        while current < last {
            bins.push(TimeBin { start: current });
            current += step;
        }
        bins
    }
}

/// A 30-minute-aligned departure slice of the trip's day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeBin {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
}

impl TimeBin {
    pub fn end(&self) -> OffsetDateTime {
        self.start + Duration::minutes(TIME_BIN_MINUTES)
    }

    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        instant >= self.start && instant < self.end()
    }
}

/// Floor an instant to the previous bin boundary in its own offset.
pub fn floor_to_bin(instant: OffsetDateTime) -> OffsetDateTime {
    let minutes = i64::from(instant.hour()) * 60 + i64::from(instant.minute());
    let floored = minutes - minutes.rem_euclid(TIME_BIN_MINUTES);
    instant.replace_time(Time::MIDNIGHT) + Duration::minutes(floored)
}

/// Ceil an instant to the next bin boundary; aligned instants are unchanged.
pub fn ceil_to_bin(instant: OffsetDateTime) -> OffsetDateTime {
    let floored = floor_to_bin(instant);
    if floored == instant {
        instant
    } else {
        floored + Duration::minutes(TIME_BIN_MINUTES)
    }
}

/// Parse a local `HH:MM` time of day.
pub fn parse_time_of_day(value: &str) -> Result<Time, String> {
    let (hour, minute) = value
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("Invalid time of day: '{}' (expected HH:MM)", value))?;
    let hour: u8 = hour
        .trim()
        .parse()
        .map_err(|_| format!("Invalid hour in '{}'", value))?;
    let minute: u8 = minute
        .trim()
        .parse()
        .map_err(|_| format!("Invalid minute in '{}'", value))?;
    Time::from_hms(hour, minute, 0).map_err(|e| format!("Invalid time '{}': {}", value, e))
}

/// Parse a local range such as `17:00-19:00`, `17:00–19:00` or `17:00 to 19:00`.
pub fn parse_local_range(value: &str) -> Result<(Time, Time), String> {
    for separator in ["–", "—", " to ", "-"] {
        if let Some((start, end)) = value.split_once(separator) {
            return Ok((parse_time_of_day(start)?, parse_time_of_day(end)?));
        }
    }
    Err(format!("Invalid time range: '{}' (expected HH:MM-HH:MM)", value))
}

/// Resolve a local range on `date` in `offset`. An end before the start
/// rolls over to the following day.
pub fn resolve_local_range(
    date: Date,
    offset: UtcOffset,
    start: Time,
    end: Time,
) -> (OffsetDateTime, OffsetDateTime) {
    let start_at = PrimitiveDateTime::new(date, start).assume_offset(offset);
    let mut end_at = PrimitiveDateTime::new(date, end).assume_offset(offset);
    if end_at < start_at {
        end_at += Duration::days(1);
    }
    (start_at, end_at)
}
