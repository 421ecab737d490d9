use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// How much of the itinerary rests on real routing data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// No leg relied on a fallback estimate
    High,
    /// Some legs did
    Medium,
    /// Every leg did
    Low,
}

impl Confidence {
    pub fn from_fallback_legs(fallback_legs: usize, total_legs: usize) -> Self {
        if fallback_legs == 0 {
            Confidence::High
        } else if fallback_legs < total_legs {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItineraryVisit {
    pub poi_index: usize,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub arrival_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub departure_time: OffsetDateTime,
    /// Travel time of the leg arriving here
    pub travel_seconds: u32,
    pub has_incident: bool,
    pub is_fallback_estimate: bool,
}

/// Ordered visits from the start location. There is no return leg.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Itinerary {
    pub visits: Vec<ItineraryVisit>,
    pub total_travel_seconds: i64,
    pub window_deviation_seconds: i64,
    pub combined_cost: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub finish_by: OffsetDateTime,
    pub confidence: Confidence,
}

impl Itinerary {
    pub fn order(&self) -> Vec<usize> {
        self.visits.iter().map(|v| v.poi_index).collect()
    }
}
