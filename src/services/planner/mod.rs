//! Single-day sequencing with hard trip bounds and soft preferred windows.
//!
//! Construction is nearest-feasible-next from the start location, ranked by
//! the travel time of the bin holding the current departure, ties broken by
//! earliest preferred window start and then stop index. When no remaining
//! POI can be appended, the cheapest feasible insertion into the partial
//! route is tried before giving up. A bounded local search then improves
//! the combined cost.

mod local_search;
mod schedule;

use crate::config::PlannerConfig;
use crate::error::PlanningError;
use crate::models::{ClassifiedPoi, Confidence, EtaMatrix, Itinerary, ItineraryVisit, TimeRange};
use schedule::{compute_schedule, PlanContext, Schedule};

pub struct ItineraryPlanner {
    config: PlannerConfig,
}

impl ItineraryPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        ItineraryPlanner { config }
    }

    /// Construct and then improve an itinerary visiting every POI once.
    pub fn plan(
        &self,
        pois: &[ClassifiedPoi],
        matrix: &EtaMatrix,
        window: &TimeRange,
    ) -> Result<Itinerary, PlanningError> {
        let ctx = self.context(pois, matrix, window)?;
        let initial = construct_schedule(&ctx)?;
        let initial_cost = initial.cost;
        let improved = local_search::local_search(initial, &ctx);

        tracing::info!(
            stops = pois.len(),
            construction_cost = initial_cost,
            cost = improved.cost,
            travel_seconds = improved.total_travel_seconds,
            deviation_seconds = improved.deviation_seconds,
            "Itinerary planned"
        );

        Ok(to_itinerary(&improved, pois))
    }

    /// Construction phase only, without local search.
    pub fn construct(
        &self,
        pois: &[ClassifiedPoi],
        matrix: &EtaMatrix,
        window: &TimeRange,
    ) -> Result<Itinerary, PlanningError> {
        let ctx = self.context(pois, matrix, window)?;
        let schedule = construct_schedule(&ctx)?;
        Ok(to_itinerary(&schedule, pois))
    }

    fn context<'a>(
        &'a self,
        pois: &'a [ClassifiedPoi],
        matrix: &'a EtaMatrix,
        window: &'a TimeRange,
    ) -> Result<PlanContext<'a>, PlanningError> {
        if pois.is_empty() {
            return Err(PlanningError::EmptyTrip);
        }

        let expected = pois.len() + 1;
        if matrix.location_count() != expected || pois.iter().any(|p| p.index >= pois.len()) {
            return Err(PlanningError::MatrixMismatch {
                matrix_locations: matrix.location_count(),
                expected,
            });
        }

        Ok(PlanContext {
            pois,
            matrix,
            window,
            config: &self.config,
        })
    }
}

/// Remaining positions ranked by travel time from the end of `route`, then
/// preferred window start, then stop index.
fn rank_candidates(route: &Schedule, remaining: &[usize], ctx: &PlanContext<'_>) -> Vec<usize> {
    let (location, clock) = match route.visits.last() {
        Some(last) => (ctx.location_of(last.position), last.departure),
        None => (0, ctx.window.start),
    };

    let mut ranked: Vec<(u32, time::OffsetDateTime, usize, usize)> = remaining
        .iter()
        .map(|&position| {
            let poi = &ctx.pois[position];
            let travel = ctx
                .matrix
                .leg(location, ctx.location_of(position), clock)
                .map(|leg| leg.duration_seconds)
                .unwrap_or(u32::MAX);
            (travel, poi.preferred_window_start, poi.index, position)
        })
        .collect();
    ranked.sort();
    ranked.into_iter().map(|(_, _, _, position)| position).collect()
}

fn construct_schedule(ctx: &PlanContext<'_>) -> Result<Schedule, PlanningError> {
    let mut remaining: Vec<usize> = (0..ctx.pois.len()).collect();
    let mut route = compute_schedule(&[], ctx).ok_or(PlanningError::EmptyTrip)?;

    while !remaining.is_empty() {
        let ranked = rank_candidates(&route, &remaining, ctx);
        let order = route.order();

        let appended = ranked.iter().find_map(|&position| {
            let mut candidate = order.clone();
            candidate.push(position);
            compute_schedule(&candidate, ctx).map(|schedule| (position, schedule))
        });

        let (placed, schedule) = match appended {
            Some(found) => found,
            None => match cheapest_insertion(&order, &ranked, ctx) {
                Some(found) => {
                    tracing::debug!(
                        poi = %ctx.pois[found.0].name(),
                        "Nearest-next stuck, placed by insertion"
                    );
                    found
                }
                None => {
                    let blocked = &ctx.pois[ranked[0]];
                    tracing::info!(
                        poi_index = blocked.index,
                        placed = order.len(),
                        "No feasible position for '{}'",
                        blocked.name()
                    );
                    return Err(PlanningError::Infeasible {
                        poi_index: blocked.index,
                        name: blocked.name().to_string(),
                    });
                }
            },
        };

        remaining.retain(|&p| p != placed);
        route = schedule;
    }

    Ok(route)
}

/// Cheapest feasible insertion of any ranked candidate into `order`.
/// Earlier candidates and positions win ties.
fn cheapest_insertion(
    order: &[usize],
    ranked: &[usize],
    ctx: &PlanContext<'_>,
) -> Option<(usize, Schedule)> {
    let mut best: Option<(usize, Schedule)> = None;

    for &position in ranked {
        for slot in 0..=order.len() {
            let mut candidate = order.to_vec();
            candidate.insert(slot, position);

            if let Some(schedule) = compute_schedule(&candidate, ctx) {
                let better = best
                    .as_ref()
                    .map_or(true, |(_, current)| schedule.cost < current.cost);
                if better {
                    best = Some((position, schedule));
                }
            }
        }
    }

    best
}

fn to_itinerary(schedule: &Schedule, pois: &[ClassifiedPoi]) -> Itinerary {
    let visits: Vec<ItineraryVisit> = schedule
        .visits
        .iter()
        .map(|v| {
            let poi = &pois[v.position];
            ItineraryVisit {
                poi_index: poi.index,
                name: poi.name().to_string(),
                arrival_time: v.arrival,
                departure_time: v.departure,
                travel_seconds: v.travel_seconds,
                has_incident: v.has_incident,
                is_fallback_estimate: v.is_fallback_estimate,
            }
        })
        .collect();

    let fallback_legs = visits.iter().filter(|v| v.is_fallback_estimate).count();
    let finish_by = visits
        .last()
        .map(|v| v.departure_time)
        .unwrap_or_else(|| time::OffsetDateTime::UNIX_EPOCH);

    Itinerary {
        confidence: Confidence::from_fallback_legs(fallback_legs, visits.len()),
        total_travel_seconds: schedule.total_travel_seconds,
        window_deviation_seconds: schedule.deviation_seconds,
        combined_cost: schedule.cost,
        finish_by,
        visits,
    }
}
