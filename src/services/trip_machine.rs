use crate::db::TripRepository;
use crate::error::{AppError, GeocodeError, Result, StateError};
use crate::models::{
    ClassifiedPoi, EtaMatrix, Incident, InitTripRequest, Itinerary, SavedTrip, Stop, TimeRange,
    TripStage, TripWorkingState,
};
use crate::services::classifier::{PoiClassifier, TripContext};
use crate::services::eta_builder::EtaMatrixBuilder;
use crate::services::geocoder::Geocoder;
use crate::services::planner::ItineraryPlanner;
use crate::services::timezone::resolve_trip_zone;
use crate::store::TripStateStore;
use futures::future::join_all;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Result of the ETA stage.
#[derive(Debug, Clone)]
pub struct EtaOutcome {
    pub matrix: EtaMatrix,
    pub incidents: Vec<Incident>,
}

/// Owns the lifecycle of trips in progress.
///
/// Each stage loads the working state, checks ownership and the transition,
/// runs its external work without holding any lock, and then writes the
/// result back only if the version it loaded is still current.
pub struct TripStateMachine {
    store: Arc<dyn TripStateStore>,
    geocoder: Arc<dyn Geocoder>,
    classifier: PoiClassifier,
    eta_builder: EtaMatrixBuilder,
    planner: ItineraryPlanner,
    repository: Arc<dyn TripRepository>,
}

impl TripStateMachine {
    pub fn new(
        store: Arc<dyn TripStateStore>,
        geocoder: Arc<dyn Geocoder>,
        classifier: PoiClassifier,
        eta_builder: EtaMatrixBuilder,
        planner: ItineraryPlanner,
        repository: Arc<dyn TripRepository>,
    ) -> Self {
        TripStateMachine {
            store,
            geocoder,
            classifier,
            eta_builder,
            planner,
            repository,
        }
    }

    /// Geocode the request and create a DRAFT trip.
    pub async fn init(&self, owner_id: &str, request: InitTripRequest) -> Result<TripWorkingState> {
        request.validate().map_err(AppError::InvalidRequest)?;

        let start = self.geocoder.geocode(&request.start_location).await?;

        let lookups = join_all(request.stops.iter().map(|name| self.geocoder.geocode(name))).await;
        let mut stops = Vec::with_capacity(lookups.len());
        let mut unmatched = Vec::new();
        for (index, (name, lookup)) in request.stops.iter().zip(lookups).enumerate() {
            match lookup {
                Ok(location) => stops.push(Stop { index, location }),
                Err(GeocodeError::NoMatch(_)) => unmatched.push(name.clone()),
                Err(e) => return Err(e.into()),
            }
        }
        if !unmatched.is_empty() {
            return Err(GeocodeError::NoMatch(unmatched.join(", ")).into());
        }

        let zone = resolve_trip_zone(&start, request.start_time);
        let window = TimeRange::new(request.start_time, request.end_time, zone.offset)
            .map_err(AppError::InvalidRequest)?;

        let now = OffsetDateTime::now_utc();
        let state = TripWorkingState {
            trip_id: format!("t_{}", Uuid::new_v4().simple()),
            owner_id: owner_id.to_string(),
            stage: TripStage::Draft,
            version: 1,
            start,
            timezone: zone.name.clone(),
            window,
            mode: request.mode,
            stops,
            classified_pois: None,
            eta_matrix: None,
            incidents: None,
            itinerary: None,
            created_at: now,
            updated_at: now,
        };

        tracing::info!(
            trip_id = %state.trip_id,
            stops = state.stops.len(),
            timezone = %zone.name,
            offset = %zone.offset,
            window_minutes = state.window.duration().whole_minutes(),
            "Trip initialised"
        );
        self.store.insert(state.clone()).await;
        Ok(state)
    }

    /// Current working state of a trip.
    pub async fn get_state(&self, trip_id: &str, owner_id: &str) -> Result<TripWorkingState> {
        self.load(trip_id, owner_id).await
    }

    pub async fn classify(&self, trip_id: &str, owner_id: &str) -> Result<Vec<ClassifiedPoi>> {
        let state = self.load(trip_id, owner_id).await?;
        check_transition(state.stage, TripStage::Draft, TripStage::Classified)?;

        let context = TripContext {
            start_name: state.start.name.clone(),
            window: state.window,
            mode: state.mode,
        };
        let pois = self.classifier.classify(&state.stops, &context).await?;

        let observed = state.version;
        let mut next = state;
        next.stage = TripStage::Classified;
        next.classified_pois = Some(pois.clone());
        next.eta_matrix = None;
        next.incidents = None;
        next.itinerary = None;
        self.commit(observed, next).await?;

        Ok(pois)
    }

    /// Build the travel matrix and fetch incidents for the trip area.
    pub async fn build_eta(&self, trip_id: &str, owner_id: &str) -> Result<EtaOutcome> {
        let state = self.load(trip_id, owner_id).await?;
        check_transition(state.stage, TripStage::Classified, TripStage::EtaBuilt)?;

        let locations = state.locations();
        let (matrix, incidents) = tokio::join!(
            self.eta_builder.build(&locations, &state.window, state.mode),
            self.eta_builder.incidents(&locations, &state.window),
        );

        let observed = state.version;
        let mut next = state;
        next.stage = TripStage::EtaBuilt;
        next.eta_matrix = Some(matrix.clone());
        next.incidents = Some(incidents.clone());
        next.itinerary = None;
        self.commit(observed, next).await?;

        Ok(EtaOutcome { matrix, incidents })
    }

    pub async fn plan(&self, trip_id: &str, owner_id: &str) -> Result<Itinerary> {
        let state = self.load(trip_id, owner_id).await?;
        check_transition(state.stage, TripStage::EtaBuilt, TripStage::Planned)?;

        let pois = state
            .classified_pois
            .as_deref()
            .ok_or_else(|| AppError::Internal(format!("trip {} has no classification", trip_id)))?;
        let matrix = state
            .eta_matrix
            .as_ref()
            .ok_or_else(|| AppError::Internal(format!("trip {} has no ETA matrix", trip_id)))?;

        let itinerary = self.planner.plan(pois, matrix, &state.window)?;

        let observed = state.version;
        let mut next = state;
        next.stage = TripStage::Planned;
        next.itinerary = Some(itinerary.clone());
        self.commit(observed, next).await?;

        Ok(itinerary)
    }

    /// Claim the SAVED transition, then persist the itinerary.
    ///
    /// A racing writer loses the claim before anything reaches durable
    /// storage. If the repository write fails the PLANNED state is put back.
    pub async fn save(&self, trip_id: &str, owner_id: &str, title: &str) -> Result<SavedTrip> {
        let state = self.load(trip_id, owner_id).await?;
        if state.stage != TripStage::Planned {
            return Err(StateError::InvalidTransition {
                current: state.stage,
                attempted: TripStage::Saved,
            }
            .into());
        }

        let itinerary = state
            .itinerary
            .clone()
            .ok_or_else(|| AppError::Internal(format!("trip {} has no itinerary", trip_id)))?;

        let title = match title.trim() {
            "" => format!("Trip on {}", state.window.local_date()),
            t => t.to_string(),
        };

        let saved = SavedTrip {
            trip_id: state.trip_id.clone(),
            owner_id: state.owner_id.clone(),
            title,
            start_location: state.start.clone(),
            window: state.window,
            mode: state.mode,
            itinerary,
            created_at: OffsetDateTime::now_utc(),
        };

        let observed = state.version;
        let planned = state.clone();
        let mut next = state;
        next.stage = TripStage::Saved;
        next.clear_outputs();
        self.commit(observed, next).await?;

        if let Err(e) = self.repository.save(&saved).await {
            tracing::error!(trip_id = %trip_id, "Failed to persist trip: {}", e);
            if let Err(restore) = self.commit(observed + 1, planned).await {
                tracing::error!(trip_id = %trip_id, "Failed to restore planned trip: {}", restore);
            }
            return Err(e.into());
        }

        tracing::info!(
            trip_id = %saved.trip_id,
            backend = self.repository.backend_name(),
            "Trip saved"
        );
        Ok(saved)
    }

    /// Discard a trip in progress. Repeating it is a no-op.
    pub async fn abandon(&self, trip_id: &str, owner_id: &str) -> Result<TripStage> {
        let state = self.load(trip_id, owner_id).await?;
        if state.stage.is_terminal() {
            return match state.stage {
                TripStage::Abandoned => Ok(TripStage::Abandoned),
                current => Err(StateError::InvalidTransition {
                    current,
                    attempted: TripStage::Abandoned,
                }
                .into()),
            };
        }

        let from = state.stage;
        let observed = state.version;
        let mut next = state;
        next.stage = TripStage::Abandoned;
        next.clear_outputs();
        self.commit(observed, next).await?;

        tracing::info!(trip_id = %trip_id, from = %from, "Trip abandoned");
        Ok(TripStage::Abandoned)
    }

    /// Saved trips come from durable storage, never from the working store.
    pub async fn get_saved(&self, trip_id: &str, owner_id: &str) -> Result<SavedTrip> {
        self.repository
            .get(trip_id, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
    }

    async fn load(&self, trip_id: &str, owner_id: &str) -> Result<TripWorkingState> {
        match self.store.get(trip_id).await {
            Some(state) if state.owner_id == owner_id => Ok(state),
            Some(_) => {
                tracing::warn!(trip_id = %trip_id, "Trip accessed by non-owner");
                Err(StateError::NotOwner.into())
            }
            None => Err(StateError::NotOwner.into()),
        }
    }

    /// Write `next` as version `observed + 1` if the stored version is still `observed`.
    async fn commit(&self, observed: u64, mut next: TripWorkingState) -> Result<()> {
        let trip_id = next.trip_id.clone();
        let attempted = next.stage;
        next.version = observed + 1;
        next.updated_at = OffsetDateTime::now_utc();

        if self.store.compare_and_swap(observed, next).await {
            tracing::info!(trip_id = %trip_id, stage = %attempted, "Trip advanced");
            return Ok(());
        }

        let current = self
            .store
            .get(&trip_id)
            .await
            .map(|s| s.stage)
            .ok_or(StateError::NotOwner)?;
        tracing::warn!(
            trip_id = %trip_id,
            observed_version = observed,
            current = %current,
            attempted = %attempted,
            "Concurrent update rejected"
        );
        Err(StateError::InvalidTransition { current, attempted }.into())
    }
}

/// A stage may run from its source stage, or again from its own result stage.
fn check_transition(
    current: TripStage,
    source: TripStage,
    target: TripStage,
) -> std::result::Result<(), StateError> {
    if current == source || current == target {
        Ok(())
    } else {
        Err(StateError::InvalidTransition {
            current,
            attempted: target,
        })
    }
}
