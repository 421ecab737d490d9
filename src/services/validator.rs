use crate::error::CoordinateMismatch;
use crate::models::location::haversine_km;
use crate::models::Location;

/// Check that coordinates echoed back by the classifier still point at the
/// geocoded location. Non-finite coordinates never pass.
pub fn validate_coordinates(
    original: &Location,
    returned_latitude: f64,
    returned_longitude: f64,
    tolerance_m: f64,
) -> Result<(), CoordinateMismatch> {
    if !returned_latitude.is_finite() || !returned_longitude.is_finite() {
        return Err(CoordinateMismatch {
            distance_m: f64::INFINITY,
            tolerance_m,
        });
    }

    let distance_m = haversine_km(
        (original.latitude, original.longitude),
        (returned_latitude, returned_longitude),
    ) * 1000.0;

    if distance_m > tolerance_m {
        return Err(CoordinateMismatch {
            distance_m,
            tolerance_m,
        });
    }

    Ok(())
}
