use crate::constants::{
    FALLBACK_SPEED_DRIVE_KMH, FALLBACK_SPEED_MIX_KMH, FALLBACK_SPEED_WALK_KMH, MAX_STOPS_PER_TRIP,
};
use crate::models::{ClassifiedPoi, EtaMatrix, Incident, Itinerary, Location, Stop, TimeRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walk,
    Drive,
    Mix,
}

impl TravelMode {
    /// Assumed speed for distance-based fallback estimates
    pub fn fallback_speed_kmh(&self) -> f64 {
        match self {
            TravelMode::Walk => FALLBACK_SPEED_WALK_KMH,
            TravelMode::Drive => FALLBACK_SPEED_DRIVE_KMH,
            TravelMode::Mix => FALLBACK_SPEED_MIX_KMH,
        }
    }

    /// Returns the routing profile name for this mode
    pub fn routing_profile(&self) -> &str {
        match self {
            TravelMode::Walk => "walking",
            TravelMode::Drive => "driving",
            TravelMode::Mix => "transit",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelMode::Walk => write!(f, "walk"),
            TravelMode::Drive => write!(f, "drive"),
            TravelMode::Mix => write!(f, "mix"),
        }
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "walk" | "walking" => Ok(TravelMode::Walk),
            "drive" | "driving" | "car" => Ok(TravelMode::Drive),
            "mix" | "mixed" | "transit" => Ok(TravelMode::Mix),
            _ => Err(format!("Invalid travel mode: '{}'", s)),
        }
    }
}

/// Lifecycle stage of a trip in progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TripStage {
    Draft,
    Classified,
    EtaBuilt,
    Planned,
    Saved,
    Abandoned,
}

impl TripStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStage::Saved | TripStage::Abandoned)
    }
}

impl fmt::Display for TripStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TripStage::Draft => "draft",
            TripStage::Classified => "classified",
            TripStage::EtaBuilt => "eta_built",
            TripStage::Planned => "planned",
            TripStage::Saved => "saved",
            TripStage::Abandoned => "abandoned",
        };
        write!(f, "{}", s)
    }
}

/// The ephemeral record of a trip being planned. Stage outputs are filled in
/// as the trip advances and dropped when it is saved or abandoned.
///
/// `version` starts at 1 and goes up by one on every committed write.
#[derive(Debug, Clone, Serialize)]
pub struct TripWorkingState {
    pub trip_id: String,
    pub owner_id: String,
    pub stage: TripStage,
    pub version: u64,
    pub start: Location,
    /// IANA zone of the start location.
    pub timezone: String,
    pub window: TimeRange,
    pub mode: TravelMode,
    pub stops: Vec<Stop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classified_pois: Option<Vec<ClassifiedPoi>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_matrix: Option<EtaMatrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incidents: Option<Vec<Incident>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Itinerary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TripWorkingState {
    /// Start followed by every stop, in matrix index order.
    pub fn locations(&self) -> Vec<Location> {
        std::iter::once(self.start.clone())
            .chain(self.stops.iter().map(|s| s.location.clone()))
            .collect()
    }

    pub fn clear_outputs(&mut self) {
        self.classified_pois = None;
        self.eta_matrix = None;
        self.incidents = None;
        self.itinerary = None;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitTripRequest {
    pub start_location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    #[serde(default)]
    pub mode: TravelMode,
    pub stops: Vec<String>,
}

impl InitTripRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.start_location.trim().is_empty() {
            return Err("start_location must not be empty".to_string());
        }
        if self.stops.is_empty() {
            return Err("at least one stop is required".to_string());
        }
        if self.stops.len() > MAX_STOPS_PER_TRIP {
            return Err(format!("at most {} stops are allowed", MAX_STOPS_PER_TRIP));
        }
        if self.stops.iter().any(|s| s.trim().is_empty()) {
            return Err("stop names must not be empty".to_string());
        }
        if self.end_time <= self.start_time {
            return Err("end_time must be after start_time".to_string());
        }
        Ok(())
    }
}

/// Durable record of a planned trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedTrip {
    pub trip_id: String,
    pub owner_id: String,
    pub title: String,
    pub start_location: Location,
    pub window: TimeRange,
    pub mode: TravelMode,
    pub itinerary: Itinerary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
