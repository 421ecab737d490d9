use crate::config::PlannerConfig;
use crate::models::{ClassifiedPoi, EtaMatrix, TimeRange};
use time::{Duration, OffsetDateTime};

/// Everything needed to evaluate a visiting order.
pub(crate) struct PlanContext<'a> {
    pub pois: &'a [ClassifiedPoi],
    pub matrix: &'a EtaMatrix,
    pub window: &'a TimeRange,
    pub config: &'a PlannerConfig,
}

impl PlanContext<'_> {
    /// Matrix location of the POI at `position` in `pois`.
    pub fn location_of(&self, position: usize) -> usize {
        self.pois[position].index + 1
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledVisit {
    pub position: usize,
    pub arrival: OffsetDateTime,
    pub departure: OffsetDateTime,
    pub travel_seconds: u32,
    pub has_incident: bool,
    pub is_fallback_estimate: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    pub visits: Vec<ScheduledVisit>,
    pub total_travel_seconds: i64,
    pub deviation_seconds: i64,
    pub cost: f64,
}

impl Schedule {
    pub fn order(&self) -> Vec<usize> {
        self.visits.iter().map(|v| v.position).collect()
    }
}

/// Walk `order` from the trip start, leaving each POI right after its stay.
/// Each leg uses the cell of the bin holding the actual departure time.
/// Returns `None` when any departure falls after the window end.
pub(crate) fn compute_schedule(order: &[usize], ctx: &PlanContext<'_>) -> Option<Schedule> {
    let mut visits = Vec::with_capacity(order.len());
    let mut location = 0;
    let mut clock = ctx.window.start;
    let mut total_travel_seconds = 0_i64;
    let mut deviation_seconds = 0_i64;

    for &position in order {
        let poi = &ctx.pois[position];
        let next = ctx.location_of(position);
        let leg = ctx.matrix.leg(location, next, clock)?;

        let arrival = clock + Duration::seconds(i64::from(leg.duration_seconds));
        let departure = arrival + poi.stay_duration();
        if departure > ctx.window.end {
            return None;
        }

        total_travel_seconds += i64::from(leg.duration_seconds);
        deviation_seconds += poi.window_deviation_seconds(arrival, departure);
        visits.push(ScheduledVisit {
            position,
            arrival,
            departure,
            travel_seconds: leg.duration_seconds,
            has_incident: leg.has_incident,
            is_fallback_estimate: leg.is_fallback_estimate,
        });

        location = next;
        clock = departure;
    }

    let cost = ctx.config.travel_weight * total_travel_seconds as f64
        + ctx.config.deviation_weight * deviation_seconds as f64;

    Some(Schedule {
        visits,
        total_travel_seconds,
        deviation_seconds,
        cost,
    })
}
