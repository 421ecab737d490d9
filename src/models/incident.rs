use crate::models::Location;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A traffic incident reported near the trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    pub segment_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub start: Option<OffsetDateTime>,
    pub severity: String,
}

/// Smallest latitude/longitude box holding a set of locations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// `None` for an empty slice.
    pub fn around(locations: &[Location]) -> Option<Self> {
        let first = locations.first()?;
        let mut bbox = BoundingBox {
            min_latitude: first.latitude,
            min_longitude: first.longitude,
            max_latitude: first.latitude,
            max_longitude: first.longitude,
        };
        for location in &locations[1..] {
            bbox.min_latitude = bbox.min_latitude.min(location.latitude);
            bbox.min_longitude = bbox.min_longitude.min(location.longitude);
            bbox.max_latitude = bbox.max_latitude.max(location.latitude);
            bbox.max_longitude = bbox.max_longitude.max(location.longitude);
        }
        Some(bbox)
    }

    /// `min_lat,min_lon,max_lat,max_lon`
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_latitude, self.min_longitude, self.max_latitude, self.max_longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_spans_all_locations() {
        let locations = vec![
            Location::new("Union Square", "", 37.7880, -122.4075).unwrap(),
            Location::new("Pier 39", "", 37.8087, -122.4098).unwrap(),
            Location::new("Ferry Building", "", 37.7955, -122.3937).unwrap(),
        ];
        let bbox = BoundingBox::around(&locations).unwrap();
        assert_eq!(bbox.min_latitude, 37.7880);
        assert_eq!(bbox.max_latitude, 37.8087);
        assert_eq!(bbox.min_longitude, -122.4098);
        assert_eq!(bbox.max_longitude, -122.3937);
        assert_eq!(bbox.to_query(), "37.788,-122.4098,37.8087,-122.3937");

        assert!(BoundingBox::around(&[]).is_none());
    }
}
