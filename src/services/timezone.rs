//! IANA time-zone lookup for trip start locations.
//!
//! The zone comes from polygon lookup on the coordinates; the UTC offset is
//! then read from tz data at the trip's start instant, so daylight saving is
//! applied for the trip date.

use crate::models::Location;
use chrono::{Offset, TimeZone};
use chrono_tz::Tz;
use std::sync::LazyLock;
use time::{OffsetDateTime, UtcOffset};
use tzf_rs::DefaultFinder;

static FINDER: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

/// Zone of a trip and the UTC offset in effect when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripZone {
    pub name: String,
    pub offset: UtcOffset,
}

/// IANA zone covering a coordinate. Unknown zones resolve to UTC.
pub fn zone_at(latitude: f64, longitude: f64) -> Tz {
    let name = FINDER.get_tz_name(longitude, latitude);
    name.parse().unwrap_or_else(|_| {
        tracing::warn!(
            latitude,
            longitude,
            zone = name,
            "No time zone for coordinates, using UTC"
        );
        chrono_tz::UTC
    })
}

/// UTC offset of `zone` at `instant`, daylight saving included.
pub fn offset_at(zone: Tz, instant: OffsetDateTime) -> UtcOffset {
    let Some(utc) = chrono::DateTime::from_timestamp(instant.unix_timestamp(), 0) else {
        return UtcOffset::UTC;
    };
    let seconds = zone
        .offset_from_utc_datetime(&utc.naive_utc())
        .fix()
        .local_minus_utc();
    UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
}

/// Zone and offset for a trip leaving `location` at `start`.
pub fn resolve_trip_zone(location: &Location, start: OffsetDateTime) -> TripZone {
    let zone = zone_at(location.latitude, location.longitude);
    TripZone {
        name: zone.name().to_string(),
        offset: offset_at(zone, start),
    }
}
