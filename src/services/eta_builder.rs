use crate::config::EtaConfig;
use crate::models::{BoundingBox, CellEstimate, EtaMatrix, Incident, Location, TimeRange, TravelMode};
use crate::services::routing::RoutingSource;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type SlotKey = (usize, usize, usize);

/// Builds the time-binned travel matrix for a trip.
pub struct EtaMatrixBuilder {
    routing: Arc<dyn RoutingSource>,
    config: EtaConfig,
}

impl EtaMatrixBuilder {
    pub fn new(routing: Arc<dyn RoutingSource>, config: EtaConfig) -> Self {
        EtaMatrixBuilder { routing, config }
    }

    /// Query every (from, to, bin) slot with bounded concurrency.
    ///
    /// Never fails: a slot whose request errors, times out, or returns an
    /// unusable duration is filled with a distance-based estimate.
    pub async fn build(
        &self,
        locations: &[Location],
        window: &TimeRange,
        mode: TravelMode,
    ) -> EtaMatrix {
        let bins = window.bins();
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let concurrency = self.config.max_concurrency.max(1);

        let mut jobs = Vec::with_capacity(EtaMatrix::slot_count(locations.len(), bins.len()));
        for (bin_index, bin) in bins.iter().enumerate() {
            for from in 0..locations.len() {
                for to in 0..locations.len() {
                    if from != to {
                        jobs.push((from, to, bin_index, bin.start));
                    }
                }
            }
        }

        tracing::debug!(
            locations = locations.len(),
            bins = bins.len(),
            requests = jobs.len(),
            concurrency,
            "Building ETA matrix"
        );

        let routing = &self.routing;
        let results: HashMap<SlotKey, CellEstimate> = stream::iter(jobs)
            .map(|(from, to, bin_index, departure)| async move {
                let outcome = tokio::time::timeout(
                    timeout,
                    routing.eta(&locations[from], &locations[to], departure, mode),
                )
                .await;

                let estimate = match outcome {
                    Ok(Ok(eta))
                        if eta.duration_seconds.is_finite() && eta.duration_seconds >= 0.0 =>
                    {
                        Some(CellEstimate {
                            duration_seconds: eta.duration_seconds.round() as u32,
                            has_incident: eta.has_incident,
                            is_fallback_estimate: false,
                        })
                    }
                    Ok(Ok(eta)) => {
                        tracing::debug!(
                            from,
                            to,
                            bin = bin_index,
                            "Unusable duration {}",
                            eta.duration_seconds
                        );
                        None
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(from, to, bin = bin_index, "Routing failed: {}", e);
                        None
                    }
                    Err(_) => {
                        tracing::debug!(from, to, bin = bin_index, "Routing timed out");
                        None
                    }
                };

                ((from, to, bin_index), estimate)
            })
            .buffer_unordered(concurrency)
            .filter_map(|(key, estimate)| async move { estimate.map(|e| (key, e)) })
            .collect()
            .await;

        let matrix = EtaMatrix::from_fn(locations.len(), bins, |from, to, bin| {
            results
                .get(&(from, to, bin))
                .copied()
                .unwrap_or_else(|| fallback_estimate(&locations[from], &locations[to], mode))
        });

        let fallbacks = matrix.fallback_count();
        if fallbacks == matrix.cells().len() && fallbacks > 0 {
            tracing::warn!(
                cells = matrix.cells().len(),
                "Routing unavailable, every ETA cell is a fallback estimate"
            );
        }
        tracing::info!(
            cells = matrix.cells().len(),
            fallbacks,
            incidents = matrix.incident_count(),
            "ETA matrix built"
        );

        matrix
    }

    /// Incidents around the trip's locations during its window.
    ///
    /// Best effort: errors and timeouts yield an empty list.
    pub async fn incidents(&self, locations: &[Location], window: &TimeRange) -> Vec<Incident> {
        let Some(area) = BoundingBox::around(locations) else {
            return Vec::new();
        };
        let timeout = Duration::from_secs(self.config.request_timeout_secs);

        match tokio::time::timeout(timeout, self.routing.incidents(&area, window)).await {
            Ok(Ok(incidents)) => {
                tracing::debug!(count = incidents.len(), "Fetched incidents");
                incidents
            }
            Ok(Err(e)) => {
                tracing::warn!(bbox = %area.to_query(), "Incident lookup failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(bbox = %area.to_query(), "Incident lookup timed out");
                Vec::new()
            }
        }
    }
}

/// Great-circle distance divided by the mode's assumed speed.
pub fn fallback_estimate(from: &Location, to: &Location, mode: TravelMode) -> CellEstimate {
    let hours = from.distance_km(to) / mode.fallback_speed_kmh();
    CellEstimate {
        duration_seconds: (hours * 3600.0).round() as u32,
        has_incident: false,
        is_fallback_estimate: true,
    }
}
