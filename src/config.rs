use crate::constants::*;
use std::env;
use std::str::FromStr;

/// Read `name`, falling back to `default`, and parse it.
fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Durable trip storage. In-memory storage is used when unset.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub routing_api_key: String,
    pub routing_base_url: String,
    pub mapbox_api_key: String,
    pub trip_state_ttl: u64,
    pub classifier: ClassifierConfig,
    pub eta: EtaConfig,
    pub planner: PlannerConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Attempts allowed after the first one when a response cannot be parsed
    pub max_retries: usize,

    /// Maximum drift (meters) tolerated between geocoded and echoed coordinates
    pub coordinate_tolerance_m: f64,

    /// Stay applied when the model omits one
    pub default_stay_minutes: u32,

    /// Time allowed for one generation call; expiry consumes an attempt
    pub request_timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_CLASSIFY_MAX_RETRIES,
            coordinate_tolerance_m: DEFAULT_COORDINATE_TOLERANCE_METERS,
            default_stay_minutes: DEFAULT_STAY_DURATION_MINUTES,
            request_timeout_secs: DEFAULT_CLASSIFY_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl ClassifierConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let coordinate_tolerance_m: f64 =
            env_or("COORDINATE_TOLERANCE_M", defaults.coordinate_tolerance_m)?;
        if coordinate_tolerance_m <= 0.0 || coordinate_tolerance_m > 100.0 {
            return Err("COORDINATE_TOLERANCE_M must be between 0 and 100 meters".to_string());
        }

        Ok(Self {
            max_retries: env_or("CLASSIFY_MAX_RETRIES", defaults.max_retries)?,
            coordinate_tolerance_m,
            default_stay_minutes: env_or("CLASSIFY_DEFAULT_STAY_MIN", defaults.default_stay_minutes)?,
            request_timeout_secs: env_or(
                "CLASSIFY_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtaConfig {
    /// Cap on in-flight routing requests
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_ETA_MAX_CONCURRENCY,
            request_timeout_secs: DEFAULT_ETA_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl EtaConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let max_concurrency: usize = env_or("ETA_MAX_CONCURRENCY", defaults.max_concurrency)?;
        if max_concurrency == 0 {
            return Err("ETA_MAX_CONCURRENCY must be at least 1".to_string());
        }

        Ok(Self {
            max_concurrency,
            request_timeout_secs: env_or("ETA_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Cost per second of travel
    pub travel_weight: f64,

    /// Cost per second spent outside a preferred window
    pub deviation_weight: f64,

    /// Upper bound on local-search improvement rounds
    pub local_search_iterations: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            travel_weight: DEFAULT_PLANNER_TRAVEL_WEIGHT,
            deviation_weight: DEFAULT_PLANNER_DEVIATION_WEIGHT,
            local_search_iterations: DEFAULT_PLANNER_LOCAL_SEARCH_ITERATIONS,
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let travel_weight: f64 = env_or("PLANNER_TRAVEL_WEIGHT", defaults.travel_weight)?;
        let deviation_weight: f64 = env_or("PLANNER_DEVIATION_WEIGHT", defaults.deviation_weight)?;
        if travel_weight < 0.0 || deviation_weight < 0.0 {
            return Err("Planner weights must not be negative".to_string());
        }

        Ok(Self {
            travel_weight,
            deviation_weight,
            local_search_iterations: env_or(
                "PLANNER_LOCAL_SEARCH_ITERATIONS",
                defaults.local_search_iterations,
            )?,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY")
                .map_err(|_| "ANTHROPIC_API_KEY must be set")?,
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string()),
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            routing_api_key: env::var("ROUTING_API_KEY")
                .map_err(|_| "ROUTING_API_KEY must be set")?,
            routing_base_url: env::var("ROUTING_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ROUTING_BASE_URL.to_string()),
            mapbox_api_key: env::var("MAPBOX_API_KEY").map_err(|_| "MAPBOX_API_KEY must be set")?,
            trip_state_ttl: env_or("TRIP_STATE_TTL", DEFAULT_TRIP_STATE_TTL_SECONDS)?,
            classifier: ClassifierConfig::from_env()?,
            eta: EtaConfig::from_env()?,
            planner: PlannerConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
