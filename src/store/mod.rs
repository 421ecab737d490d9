pub mod memory;

use crate::models::TripWorkingState;
use async_trait::async_trait;

pub use memory::MemoryTripStateStore;

/// Backing store for in-progress trips. Writes are conditional on the version
/// the writer last observed, so a stage call that read stale state cannot
/// overwrite a newer commit, even one that left the stage unchanged.
#[async_trait]
pub trait TripStateStore: Send + Sync {
    async fn get(&self, trip_id: &str) -> Option<TripWorkingState>;

    async fn insert(&self, state: TripWorkingState);

    /// Replace the stored state only if its version is still `expected_version`.
    /// Returns false, leaving the store untouched, otherwise.
    async fn compare_and_swap(&self, expected_version: u64, state: TripWorkingState) -> bool;

    fn backend_name(&self) -> &'static str;
}
