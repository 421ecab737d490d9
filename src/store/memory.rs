use crate::models::TripWorkingState;
use crate::store::TripStateStore;
use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use std::sync::Arc;
use std::time::Duration;

/// In-memory working-state store backed by moka with TTL and bounded capacity.
/// All methods are `&self`; compare-and-swap uses moka's atomic per-key compute.
pub struct MemoryTripStateStore {
    trips: Cache<String, Arc<TripWorkingState>>,
}

impl MemoryTripStateStore {
    pub fn new(ttl_seconds: u64, max_capacity: u64) -> Self {
        let trips = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        MemoryTripStateStore { trips }
    }
}

#[async_trait]
impl TripStateStore for MemoryTripStateStore {
    async fn get(&self, trip_id: &str) -> Option<TripWorkingState> {
        self.trips.get(trip_id).await.map(|state| (*state).clone())
    }

    async fn insert(&self, state: TripWorkingState) {
        let trip_id = state.trip_id.clone();
        self.trips.insert(trip_id.clone(), Arc::new(state)).await;
        tracing::debug!(trip_id = %trip_id, "Stored new trip state");
    }

    async fn compare_and_swap(&self, expected_version: u64, state: TripWorkingState) -> bool {
        let trip_id = state.trip_id.clone();
        let new_stage = state.stage;
        let new_version = state.version;
        let replacement = Arc::new(state);

        let result = self
            .trips
            .entry(trip_id.clone())
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().version == expected_version => Op::Put(replacement),
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        let swapped = matches!(result, CompResult::ReplacedWith(_));
        tracing::debug!(
            trip_id = %trip_id,
            expected_version,
            version = new_version,
            stage = %new_stage,
            swapped,
            "Trip state compare-and-swap"
        );
        swapped
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
