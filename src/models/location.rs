use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geocoded place. Latitude/longitude are the source of truth for every
/// downstream distance and travel-time computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                latitude
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                longitude
            ));
        }
        Ok(Location {
            name: name.into(),
            address: address.into(),
            latitude,
            longitude,
        })
    }

    /// Great-circle distance using the Haversine formula, in kilometers
    pub fn distance_km(&self, other: &Location) -> f64 {
        haversine_km(
            (self.latitude, self.longitude),
            (other.latitude, other.longitude),
        )
    }

    pub fn distance_m(&self, other: &Location) -> f64 {
        self.distance_km(other) * 1000.0
    }

    /// True when both coordinates are bit-identical.
    pub fn same_coordinates(&self, other: &Location) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

/// Haversine distance between two (lat, lng) pairs in kilometers.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
