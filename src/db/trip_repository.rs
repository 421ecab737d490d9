use crate::error::PersistenceError;
use crate::models::SavedTrip;
use async_trait::async_trait;
use moka::future::Cache;
use sqlx::types::Json;
use sqlx::PgPool;

/// Durable storage for saved trips. Lookups are always scoped to the owner.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn save(&self, trip: &SavedTrip) -> Result<(), PersistenceError>;

    /// `None` for unknown trips and for trips owned by someone else.
    async fn get(&self, trip_id: &str, owner_id: &str)
        -> Result<Option<SavedTrip>, PersistenceError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(sqlx::FromRow)]
struct TripRow {
    payload: Json<SavedTrip>,
}

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn save(&self, trip: &SavedTrip) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO trips (trip_id, owner_id, title, payload, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (trip_id) DO UPDATE
             SET title = EXCLUDED.title, payload = EXCLUDED.payload
             WHERE trips.owner_id = EXCLUDED.owner_id",
        )
        .bind(&trip.trip_id)
        .bind(&trip.owner_id)
        .bind(&trip.title)
        .bind(Json(trip))
        .bind(trip.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(trip_id = %trip.trip_id, "Saved trip to database");
        Ok(())
    }

    async fn get(
        &self,
        trip_id: &str,
        owner_id: &str,
    ) -> Result<Option<SavedTrip>, PersistenceError> {
        let row = sqlx::query_as::<_, TripRow>(
            "SELECT payload
             FROM trips
             WHERE trip_id = $1 AND owner_id = $2",
        )
        .bind(trip_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.payload.0))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Process-local repository used when no database is configured.
pub struct MemoryTripRepository {
    trips: Cache<String, SavedTrip>,
}

impl MemoryTripRepository {
    pub fn new(max_capacity: u64) -> Self {
        MemoryTripRepository {
            trips: Cache::builder().max_capacity(max_capacity).build(),
        }
    }
}

impl Default for MemoryTripRepository {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_TRIP_STATE_MAX_ENTRIES)
    }
}

#[async_trait]
impl TripRepository for MemoryTripRepository {
    async fn save(&self, trip: &SavedTrip) -> Result<(), PersistenceError> {
        self.trips.insert(trip.trip_id.clone(), trip.clone()).await;
        Ok(())
    }

    async fn get(
        &self,
        trip_id: &str,
        owner_id: &str,
    ) -> Result<Option<SavedTrip>, PersistenceError> {
        Ok(self
            .trips
            .get(trip_id)
            .await
            .filter(|trip| trip.owner_id == owner_id))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
