use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::TripStage;

/// Echoed coordinates drifted further than the allowed tolerance.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("coordinates moved {distance_m:.1}m (tolerance {tolerance_m:.1}m)")]
pub struct CoordinateMismatch {
    pub distance_m: f64,
    pub tolerance_m: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("classification response unparseable after {attempts} attempts: {reason}")]
    Unparseable { attempts: usize, reason: String },

    #[error("classification altered coordinates of stop {index} ('{name}'): {mismatch}")]
    CoordinateHallucination {
        index: usize,
        name: String,
        mismatch: CoordinateMismatch,
    },

    #[error("text generation failed after {attempts} attempts: {source}")]
    Generation {
        attempts: usize,
        source: GenerationError,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Transport(String),

    #[error("routing request timed out")]
    Timeout,

    #[error("routing quota exhausted")]
    Quota,

    #[error("malformed routing response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("no match for '{0}'")]
    NoMatch(String),

    #[error("geocoding service error: {0}")]
    Upstream(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("cannot fit stop {poi_index} ('{name}') inside the trip window")]
    Infeasible { poi_index: usize, name: String },

    #[error("nothing to plan: trip has no classified stops")]
    EmptyTrip,

    #[error("ETA matrix covers {matrix_locations} locations, expected {expected}")]
    MatrixMismatch {
        matrix_locations: usize,
        expected: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("invalid transition from {current} to {attempted}")]
    InvalidTransition {
        current: TripStage,
        attempted: TripStage,
    },

    /// Returned both for foreign and for unknown trips.
    #[error("trip not found")]
    NotOwner,
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing caller identity")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::InvalidRequest(e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, e.clone()),
            AppError::Geocode(GeocodeError::NoMatch(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Geocode(GeocodeError::Upstream(e)) => {
                tracing::error!("Geocoding error: {}", e);
                (StatusCode::BAD_GATEWAY, "Geocoding service error".to_string())
            }
            AppError::Classification(e) => {
                tracing::error!("Classification failed: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::Planning(e) => {
                tracing::info!("Planning failed: {}", e);
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            AppError::State(StateError::NotOwner) => {
                (StatusCode::NOT_FOUND, "Trip not found".to_string())
            }
            AppError::State(e @ StateError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal storage error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Persistence(PersistenceError::Database(e))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
