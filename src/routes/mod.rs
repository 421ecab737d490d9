pub mod health;
pub mod trip;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::AppState;

pub const OWNER_HEADER: &str = "x-user-id";

/// Caller identity, already authenticated upstream and forwarded in a header.
#[derive(Debug, Clone)]
pub struct OwnerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| OwnerId(value.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/trip/init", post(trip::init_trip))
        .route("/trip/classify", post(trip::classify_trip))
        .route("/trip/eta", post(trip::build_eta))
        .route("/trip/plan", post(trip::plan_trip))
        .route("/trip/save", post(trip::save_trip))
        .route("/trip/abandon", post(trip::abandon_trip))
        .route("/trip/{trip_id}", get(trip::get_saved_trip))
        .route("/trip/{trip_id}/state", get(trip::get_trip_state))
        .route("/health", get(health::health_check))
        .with_state(state)
}
