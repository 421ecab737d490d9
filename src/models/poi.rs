use crate::models::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    Food,
    Culture,
    Nature,
    Landmark,
    Shopping,
    Other,
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoiCategory::Food => "food",
            PoiCategory::Culture => "culture",
            PoiCategory::Nature => "nature",
            PoiCategory::Landmark => "landmark",
            PoiCategory::Shopping => "shopping",
            PoiCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PoiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" | "restaurant" | "cafe" | "bakery" => Ok(PoiCategory::Food),
            "culture" | "cultural" | "museum" | "gallery" | "theatre" => Ok(PoiCategory::Culture),
            "nature" | "park" | "beach" | "garden" => Ok(PoiCategory::Nature),
            "landmark" | "viewpoint" | "pier" | "monument" | "historic" => {
                Ok(PoiCategory::Landmark)
            }
            "shopping" | "market" | "mall" => Ok(PoiCategory::Shopping),
            "other" => Ok(PoiCategory::Other),
            _ => Err(format!("Invalid POI category: {}", s)),
        }
    }
}

/// A user-requested place after geocoding. `index` is its position in the
/// request's stop list and is stable for the lifetime of the trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub index: usize,
    pub location: Location,
}

/// A stop enriched with a category, a preferred local visiting window,
/// and a stay duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedPoi {
    pub index: usize,
    pub location: Location,
    pub category: PoiCategory,
    #[serde(with = "time::serde::rfc3339")]
    pub preferred_window_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub preferred_window_end: OffsetDateTime,
    pub rationale: String,
    pub stay_duration_minutes: u32,
}

impl ClassifiedPoi {
    pub fn name(&self) -> &str {
        &self.location.name
    }

    pub fn stay_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.stay_duration_minutes))
    }

    /// Seconds spent outside the preferred window: arriving before it opens
    /// plus leaving after it closes.
    pub fn window_deviation_seconds(
        &self,
        arrival: OffsetDateTime,
        departure: OffsetDateTime,
    ) -> i64 {
        let early = (self.preferred_window_start - arrival).whole_seconds().max(0);
        let late = (departure - self.preferred_window_end).whole_seconds().max(0);
        early + late
    }
}
