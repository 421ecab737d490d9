use super::schedule::{compute_schedule, PlanContext, Schedule};
use crate::constants::PLANNER_IMPROVEMENT_EPSILON;

fn improves(candidate: &Schedule, current: &Schedule) -> bool {
    candidate.cost < current.cost - PLANNER_IMPROVEMENT_EPSILON
}

/// Swap two visits. Returns true if an improvement was made.
fn swap_improve(current: &mut Schedule, ctx: &PlanContext<'_>) -> bool {
    let order = current.order();
    let n = order.len();

    for i in 0..n {
        for j in i + 1..n {
            let mut candidate = order.clone();
            candidate.swap(i, j);

            if let Some(schedule) = compute_schedule(&candidate, ctx) {
                if improves(&schedule, current) {
                    *current = schedule;
                    return true;
                }
            }
        }
    }

    false
}

/// Move one visit to another position. Returns true if an improvement was made.
fn relocate_improve(current: &mut Schedule, ctx: &PlanContext<'_>) -> bool {
    let order = current.order();
    let n = order.len();

    for from in 0..n {
        for to in 0..n {
            // Adjacent moves are swaps, already covered
            if to == from || to + 1 == from || from + 1 == to {
                continue;
            }

            let mut candidate = order.clone();
            let visit = candidate.remove(from);
            candidate.insert(to, visit);

            if let Some(schedule) = compute_schedule(&candidate, ctx) {
                if improves(&schedule, current) {
                    *current = schedule;
                    return true;
                }
            }
        }
    }

    false
}

/// Run swap and relocate moves until no move improves the combined cost or
/// the iteration budget is spent. Only feasible orders are ever accepted,
/// so the result is never worse than the input.
pub(crate) fn local_search(initial: Schedule, ctx: &PlanContext<'_>) -> Schedule {
    let mut current = initial;
    let mut rounds = 0;

    for _ in 0..ctx.config.local_search_iterations {
        let mut improved = swap_improve(&mut current, ctx);
        if relocate_improve(&mut current, ctx) {
            improved = true;
        }

        rounds += 1;
        if !improved {
            break;
        }
    }

    tracing::debug!(rounds, cost = current.cost, "Local search finished");
    current
}
