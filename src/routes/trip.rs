use crate::error::Result;
use crate::models::{
    ClassifiedPoi, EtaMatrix, Incident, InitTripRequest, Itinerary, Location, SavedTrip, Stop,
    TimeRange, TravelMode, TripStage, TripWorkingState,
};
use crate::routes::OwnerId;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TripRef {
    pub trip_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveTripRequest {
    pub trip_id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct InitTripResponse {
    pub trip_id: String,
    pub stage: TripStage,
    pub start_location: Location,
    pub timezone: String,
    pub window: TimeRange,
    pub mode: TravelMode,
    pub stops: Vec<Stop>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub trip_id: String,
    pub stage: TripStage,
    pub classified_pois: Vec<ClassifiedPoi>,
}

#[derive(Debug, Serialize)]
pub struct EtaResponse {
    pub trip_id: String,
    pub stage: TripStage,
    pub fallback_cells: usize,
    pub incident_cells: usize,
    pub matrix: EtaMatrix,
    pub incidents: Vec<Incident>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub trip_id: String,
    pub stage: TripStage,
    pub itinerary: Itinerary,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub stage: TripStage,
    pub trip: SavedTrip,
}

#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub trip_id: String,
    pub stage: TripStage,
}

/// POST /trip/init
pub async fn init_trip(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(request): Json<InitTripRequest>,
) -> Result<Json<InitTripResponse>> {
    tracing::info!(
        start = %request.start_location,
        stops = request.stops.len(),
        mode = %request.mode,
        "Trip init request"
    );

    let trip = state.machine.init(&owner, request).await?;

    Ok(Json(InitTripResponse {
        trip_id: trip.trip_id,
        stage: trip.stage,
        start_location: trip.start,
        timezone: trip.timezone,
        window: trip.window,
        mode: trip.mode,
        stops: trip.stops,
    }))
}

/// POST /trip/classify
pub async fn classify_trip(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(request): Json<TripRef>,
) -> Result<Json<ClassifyResponse>> {
    let classified_pois = state.machine.classify(&request.trip_id, &owner).await?;

    Ok(Json(ClassifyResponse {
        trip_id: request.trip_id,
        stage: TripStage::Classified,
        classified_pois,
    }))
}

/// POST /trip/eta
pub async fn build_eta(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(request): Json<TripRef>,
) -> Result<Json<EtaResponse>> {
    let outcome = state.machine.build_eta(&request.trip_id, &owner).await?;

    Ok(Json(EtaResponse {
        trip_id: request.trip_id,
        stage: TripStage::EtaBuilt,
        fallback_cells: outcome.matrix.fallback_count(),
        incident_cells: outcome.matrix.incident_count(),
        matrix: outcome.matrix,
        incidents: outcome.incidents,
    }))
}

/// POST /trip/plan
pub async fn plan_trip(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(request): Json<TripRef>,
) -> Result<Json<PlanResponse>> {
    let itinerary = state.machine.plan(&request.trip_id, &owner).await?;

    Ok(Json(PlanResponse {
        trip_id: request.trip_id,
        stage: TripStage::Planned,
        itinerary,
    }))
}

/// POST /trip/save
pub async fn save_trip(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(request): Json<SaveTripRequest>,
) -> Result<Json<SaveResponse>> {
    let trip = state
        .machine
        .save(&request.trip_id, &owner, &request.title)
        .await?;

    Ok(Json(SaveResponse {
        stage: TripStage::Saved,
        trip,
    }))
}

/// POST /trip/abandon
pub async fn abandon_trip(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(request): Json<TripRef>,
) -> Result<Json<StageResponse>> {
    let stage = state.machine.abandon(&request.trip_id, &owner).await?;

    Ok(Json(StageResponse {
        trip_id: request.trip_id,
        stage,
    }))
}

/// GET /trip/{trip_id}
pub async fn get_saved_trip(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Path(trip_id): Path<String>,
) -> Result<Json<SavedTrip>> {
    let trip = state.machine.get_saved(&trip_id, &owner).await?;
    Ok(Json(trip))
}

/// GET /trip/{trip_id}/state
pub async fn get_trip_state(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Path(trip_id): Path<String>,
) -> Result<Json<TripWorkingState>> {
    let trip = state.machine.get_state(&trip_id, &owner).await?;
    Ok(Json(trip))
}
