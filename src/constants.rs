//! Stable application-wide constants.
//!
//! Values here are structural invariants of the planning pipeline and default
//! fallbacks for env-var-based configuration. They should rarely change.
//! For tuning knobs that benefit from runtime experimentation, see
//! [`PlannerConfig`](crate::config::PlannerConfig) and friends instead.

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- External services ---

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_ROUTING_BASE_URL: &str = "https://api.inrix.com/v1";
pub const MAPBOX_GEOCODING_BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

// --- Time discretisation ---

/// Width of one ETA time bin in minutes. Bins are aligned to this boundary
/// in the trip's local offset.
pub const TIME_BIN_MINUTES: i64 = 30;
/// Longest trip window accepted. Multi-day trips are not planned.
pub const MAX_TRIP_WINDOW_HOURS: i64 = 24;

// --- Trip limits ---

/// Maximum number of stops per trip. The ETA matrix grows with
/// `(stops + 1)^2 * bins`, so this bounds the number of routing requests.
pub const MAX_STOPS_PER_TRIP: usize = 12;
/// Default working-state TTL: 24 hours. Overridden by `TRIP_STATE_TTL`.
pub const DEFAULT_TRIP_STATE_TTL_SECONDS: u64 = 86_400;
/// Upper bound on live working states held in memory.
pub const DEFAULT_TRIP_STATE_MAX_ENTRIES: u64 = 10_000;

// --- Classification defaults ---

/// Stay duration applied when the classifier omits one.
pub const DEFAULT_STAY_DURATION_MINUTES: u32 = 45;
/// Additional classification attempts after the first one.
pub const DEFAULT_CLASSIFY_MAX_RETRIES: usize = 2;
/// Round-trip noise allowance for echoed coordinates. Not a relocation allowance.
pub const DEFAULT_COORDINATE_TOLERANCE_METERS: f64 = 10.0;
/// Token budget for a classification response.
pub const CLASSIFY_MAX_TOKENS: u32 = 2_000;
/// Time allowed for one classification attempt before it counts as failed.
pub const DEFAULT_CLASSIFY_REQUEST_TIMEOUT_SECONDS: u64 = 60;
/// HTTP timeout on each Anthropic request.
pub const LLM_HTTP_TIMEOUT_SECONDS: u64 = 60;
/// HTTP timeout on each geocoding request.
pub const GEOCODE_HTTP_TIMEOUT_SECONDS: u64 = 10;

// --- ETA matrix defaults ---

/// Cap on concurrent routing requests during a matrix build.
pub const DEFAULT_ETA_MAX_CONCURRENCY: usize = 8;
/// Per-request timeout for a single routing call.
pub const DEFAULT_ETA_REQUEST_TIMEOUT_SECONDS: u64 = 10;
/// Retries performed by the routing HTTP adapter before giving up on a cell.
pub const ROUTING_MAX_RETRIES: usize = 2;
/// Base backoff between routing retries; doubled on each attempt.
pub const ROUTING_RETRY_BACKOFF_MS: u64 = 250;
/// HTTP timeout on each routing or incidents request.
pub const ROUTING_HTTP_TIMEOUT_SECONDS: u64 = 10;

// --- Fallback travel speeds (km/h) ---
// Used when the routing source fails for a cell: great-circle distance
// divided by the mode's assumed speed.

/// Assumed walking speed.
pub const FALLBACK_SPEED_WALK_KMH: f64 = 5.0;
/// Assumed driving speed in urban traffic.
pub const FALLBACK_SPEED_DRIVE_KMH: f64 = 40.0;
/// Assumed speed for mixed walking/transit/driving.
pub const FALLBACK_SPEED_MIX_KMH: f64 = 25.0;

// --- Planner defaults ---

/// Weight applied to each second of travel in the combined cost.
pub const DEFAULT_PLANNER_TRAVEL_WEIGHT: f64 = 1.0;
/// Weight applied to each second spent outside a preferred window.
/// Kept well below the travel weight so travel time dominates.
pub const DEFAULT_PLANNER_DEVIATION_WEIGHT: f64 = 0.25;
/// Maximum improvement rounds of the local search.
pub const DEFAULT_PLANNER_LOCAL_SEARCH_ITERATIONS: usize = 100;
/// Minimum cost improvement for a local-search move to be accepted.
pub const PLANNER_IMPROVEMENT_EPSILON: f64 = 1e-6;
