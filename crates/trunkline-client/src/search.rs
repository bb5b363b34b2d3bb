//! Pluggable route/value search behind the advisory computation.
//!
//! The real reachability/route algorithm is an external collaborator; this
//! module only defines the seam plus a small greedy estimator good enough to
//! suggest values in the walkthrough and in tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use trunkline_protocol::{CompanyId, StopId};

/// Everything a search needs, captured by value so the worker thread owns it.
#[derive(Clone, Debug)]
pub struct RouteRequest {
    pub company: CompanyId,
    /// Reachable stops with their current revenue values.
    pub stop_values: Vec<(StopId, u32)>,
    /// Stop allowance per train being simulated.
    pub train_capacities: Vec<u8>,
}

/// A candidate route valuation. Streamed incrementally; the last one seen
/// before the final flag is the best the search found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteEstimate {
    pub value: u32,
    pub stops: Vec<StopId>,
}

/// Black-box best-route search. Implementations emit monotonically improving
/// estimates and poll `cancelled` between units of work.
pub trait RouteSearch: Send + Sync {
    fn search(
        &self,
        request: &RouteRequest,
        emit: &mut dyn FnMut(RouteEstimate),
        cancelled: &dyn Fn() -> bool,
    );
}

/// Greedy estimator with a few randomized restarts. Each pass assigns the
/// highest-value stops to the trains and emits when it beats the best so far.
pub struct GreedyRouteSearch {
    pub restarts: u8,
}

impl GreedyRouteSearch {
    pub fn new(restarts: u8) -> Self {
        Self { restarts }
    }

    fn run_pass(request: &RouteRequest, order: &[(StopId, u32)]) -> RouteEstimate {
        let mut value = 0u32;
        let mut stops = Vec::new();
        let mut cursor = 0usize;
        for capacity in &request.train_capacities {
            for _ in 0..*capacity {
                let Some((stop, stop_value)) = order.get(cursor) else {
                    break;
                };
                value += stop_value;
                stops.push(*stop);
                cursor += 1;
            }
        }
        RouteEstimate { value, stops }
    }
}

impl RouteSearch for GreedyRouteSearch {
    fn search(
        &self,
        request: &RouteRequest,
        emit: &mut dyn FnMut(RouteEstimate),
        cancelled: &dyn Fn() -> bool,
    ) {
        let mut sorted = request.stop_values.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut best = Self::run_pass(request, &sorted);
        emit(best.clone());

        // Randomized restarts shuffle the assignment order; anything that
        // beats the greedy pass is emitted as a new best.
        let mut rng = StdRng::seed_from_u64(request.company.0 as u64);
        let mut order = sorted;
        for _ in 0..self.restarts {
            if cancelled() {
                return;
            }
            order.shuffle(&mut rng);
            let pass = Self::run_pass(request, &order);
            if pass.value > best.value {
                best = pass;
                emit(best.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RouteRequest {
        RouteRequest {
            company: CompanyId(0),
            stop_values: vec![
                (StopId::new(0), 20),
                (StopId::new(1), 30),
                (StopId::new(2), 10),
            ],
            train_capacities: vec![2],
        }
    }

    #[test]
    fn greedy_takes_highest_values_first() {
        let search = GreedyRouteSearch::new(0);
        let mut estimates = Vec::new();
        search.search(&request(), &mut |e| estimates.push(e), &|| false);
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].value, 50);
        assert_eq!(estimates[0].stops, vec![StopId::new(1), StopId::new(0)]);
    }

    #[test]
    fn cancellation_stops_restarts() {
        let search = GreedyRouteSearch::new(200);
        let mut count = 0usize;
        search.search(&request(), &mut |_| count += 1, &|| true);
        // Only the initial greedy pass runs before the flag is honored.
        assert_eq!(count, 1);
    }

    #[test]
    fn restarts_never_lower_the_best() {
        let search = GreedyRouteSearch::new(8);
        let mut last = 0u32;
        search.search(
            &request(),
            &mut |e| {
                assert!(e.value >= last);
                last = e.value;
            },
            &|| false,
        );
        assert_eq!(last, 50);
    }
}
