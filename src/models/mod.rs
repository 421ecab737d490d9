pub mod eta;
pub mod incident;
pub mod itinerary;
pub mod location;
pub mod poi;
pub mod time_window;
pub mod trip;

pub use eta::{CellEstimate, EtaCell, EtaMatrix, Leg};
pub use incident::{BoundingBox, Incident};
pub use itinerary::{Confidence, Itinerary, ItineraryVisit};
pub use location::Location;
pub use poi::{ClassifiedPoi, PoiCategory, Stop};
pub use time_window::{TimeBin, TimeRange};
pub use trip::{InitTripRequest, SavedTrip, TravelMode, TripStage, TripWorkingState};
