//! Branch-and-cut driver.
//!
//! The driver owns the search loop around a [`MipBackend`]. It never changes
//! variable values: it reads the candidates the backend reports, hands them to
//! the separation oracle and adds the resulting cuts to the live model.

use super::{BackendOutcome, BackendStatus, LazyConstraints, MipBackend, SolveLimits};
use crate::error::{Result, RoutingError};
use crate::instance::RoutingInstance;
use crate::model::{LinearConstraint, MipModel, RouteModel, SubtourStrategy};
use crate::separation::{CutStore, EdgeAssignment, SeparationOracle, SubtourOracle};
use crate::solution::{extract_solution, RoutingSolution};
use std::time::{Duration, Instant};

/// States of the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Relaxed,
    IntegralCandidateFound,
    CutInjected,
    Converged,
    TimeLimitReached,
    Infeasible,
}

/// Result of an exact run that produced routes
#[derive(Debug, Clone)]
pub struct ExactResult {
    pub solution: RoutingSolution,
    /// Whether optimality was proven; `false` marks a best-effort answer after the time limit
    pub optimal: bool,
    /// Best bound reported by the backend
    pub lower_bound: Option<f64>,
    /// Number of backend solves
    pub rounds: usize,
    /// Number of subtour cuts added
    pub cuts_added: usize,
    pub nodes_explored: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Solved(ExactResult),
    /// The backend proved that no feasible point exists
    Infeasible,
    /// The time limit expired before any feasible point was known
    NoSolutionWithinLimit,
}

impl SolveOutcome {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveOutcome::Solved(r) if r.optimal)
    }

    pub fn result(&self) -> Option<&ExactResult> {
        match self {
            SolveOutcome::Solved(r) => Some(r),
            _ => None,
        }
    }
}

/// Lazy hook handed to backends with a native callback. Shares the cut store
/// with the driver.
struct LazySession<'s, O: SeparationOracle> {
    route_model: &'s RouteModel,
    oracle: &'s O,
    cuts: &'s CutStore,
}

impl<O: SeparationOracle> LazyConstraints for LazySession<'_, O> {
    fn separate(&self, values: &[f64]) -> Result<Option<LinearConstraint>> {
        let candidate = EdgeAssignment::from_values(&self.route_model.edges, values, 0);
        match self.cuts.separate(self.oracle, &candidate) {
            Ok(found) => Ok(found.map(|(index, cut)| self.route_model.cut_constraint(&cut, index))),
            // Parallel search threads may report a candidate before a cut from
            // another thread reached them: reject it again.
            Err(RoutingError::DuplicateCut(component)) => {
                log::warn!("Candidate repeats subtour {:?}, rejecting again", component);
                let cut = crate::separation::Cut::new(component);
                Ok(Some(self.route_model.cut_constraint(&cut, self.cuts.len())))
            }
            Err(e) => Err(e),
        }
    }
}

pub struct BranchAndCutDriver<'a, O: SeparationOracle = SubtourOracle> {
    instance: &'a RoutingInstance,
    route_model: RouteModel,
    oracle: O,
    cuts: CutStore,
    limits: SolveLimits,
    /// Best feasible assignment known so far (warm start or accepted candidate)
    incumbent: Option<Vec<f64>>,
}

impl<'a> BranchAndCutDriver<'a, SubtourOracle> {
    pub fn new(
        instance: &'a RoutingInstance,
        route_model: RouteModel,
        limits: SolveLimits,
    ) -> Self {
        BranchAndCutDriver {
            instance,
            route_model,
            oracle: SubtourOracle::new(),
            cuts: CutStore::new(),
            limits,
            incumbent: None,
        }
    }
}

impl<'a, O: SeparationOracle> BranchAndCutDriver<'a, O> {
    /// Replace the separation oracle
    pub fn with_oracle<P: SeparationOracle>(self, oracle: P) -> BranchAndCutDriver<'a, P> {
        BranchAndCutDriver {
            instance: self.instance,
            route_model: self.route_model,
            oracle,
            cuts: self.cuts,
            limits: self.limits,
            incumbent: self.incumbent,
        }
    }

    /// Seed the incumbent with a feasible assignment (typically a warm start tour).
    /// Assignments violating the model are ignored.
    pub fn with_incumbent(mut self, values: Vec<f64>) -> Self {
        match self.route_model.model.first_violation(&values, 1e-6) {
            None => self.incumbent = Some(values),
            Some(c) => log::warn!("Ignoring incumbent violating constraint {}", c.name),
        }
        self
    }

    pub fn cuts(&self) -> &CutStore {
        &self.cuts
    }

    fn lazy(&self) -> bool {
        self.route_model.strategy == SubtourStrategy::Lazy
    }

    fn keep_better(&mut self, values: Vec<f64>) {
        let model = &self.route_model.model;
        let better = match &self.incumbent {
            Some(current) => model.objective_value(&values) < model.objective_value(current) - 1e-9,
            None => true,
        };
        if better {
            self.incumbent = Some(values);
        }
    }

    /// Run the search until convergence, infeasibility or the time limit
    pub fn run(mut self, backend: &mut dyn MipBackend) -> Result<SolveOutcome> {
        let start = Instant::now();
        let lazy = self.lazy();
        // Backends without a callback get no hook; their candidates are separated below
        let native_lazy = lazy && backend.supports_lazy_constraints();
        let mut live: MipModel = self.route_model.model.clone();
        let mut state = SearchState::Relaxed;
        let mut candidate: Option<Vec<f64>> = None;
        let mut last: Option<BackendOutcome> = None;
        let mut timed_out = false;
        let mut rounds = 0usize;

        log::info!(
            "Branch-and-cut on {} with backend {} ({:?} subtour elimination)",
            self.instance.name,
            backend.name(),
            self.route_model.strategy
        );

        loop {
            log::debug!("Search state: {:?}", state);
            state = match state {
                SearchState::Relaxed => {
                    let remaining = self.limits.time_limit.saturating_sub(start.elapsed());
                    if remaining == Duration::ZERO {
                        SearchState::TimeLimitReached
                    } else {
                        rounds += 1;
                        let limits = SolveLimits { time_limit: remaining, ..self.limits.clone() };
                        let session = LazySession {
                            route_model: &self.route_model,
                            oracle: &self.oracle,
                            cuts: &self.cuts,
                        };
                        let hook: Option<&dyn LazyConstraints> = if native_lazy {
                            Some(&session)
                        } else {
                            None
                        };
                        let outcome = backend.solve(&live, &limits, hook)?;
                        log::debug!(
                            "Round {}: {:?}, objective {:?}",
                            rounds,
                            outcome.status,
                            outcome.objective
                        );

                        let next = match outcome.status {
                            BackendStatus::Infeasible => SearchState::Infeasible,
                            BackendStatus::Unbounded => {
                                return Err(RoutingError::Backend(
                                    "relaxation is unbounded; the routing model is malformed"
                                        .to_string(),
                                ));
                            }
                            BackendStatus::Optimal => {
                                candidate = Some(outcome.values.clone().ok_or_else(|| {
                                    RoutingError::Backend(
                                        "optimal status without a solution".to_string(),
                                    )
                                })?);
                                SearchState::IntegralCandidateFound
                            }
                            BackendStatus::TimeLimit => {
                                timed_out = true;
                                match outcome.values.clone() {
                                    Some(values) => {
                                        candidate = Some(values);
                                        SearchState::IntegralCandidateFound
                                    }
                                    None => SearchState::TimeLimitReached,
                                }
                            }
                        };
                        last = Some(outcome);
                        next
                    }
                }

                SearchState::IntegralCandidateFound => {
                    let values = candidate.take().ok_or_else(|| {
                        RoutingError::Backend("no candidate to inspect".to_string())
                    })?;
                    let cut = if lazy {
                        let assignment =
                            EdgeAssignment::from_values(&self.route_model.edges, &values, 0);
                        self.cuts.separate(&self.oracle, &assignment)?
                    } else {
                        None
                    };
                    match cut {
                        Some((index, cut)) => {
                            live.add_constraint(self.route_model.cut_constraint(&cut, index));
                            SearchState::CutInjected
                        }
                        None if timed_out => {
                            self.keep_better(values);
                            SearchState::TimeLimitReached
                        }
                        None => {
                            candidate = Some(values);
                            SearchState::Converged
                        }
                    }
                }

                SearchState::CutInjected => {
                    if start.elapsed() >= self.limits.time_limit {
                        SearchState::TimeLimitReached
                    } else {
                        SearchState::Relaxed
                    }
                }

                SearchState::Converged => {
                    let values = candidate.take().ok_or_else(|| {
                        RoutingError::Backend("converged without a candidate".to_string())
                    })?;
                    let mut solution = extract_solution(self.instance, &self.route_model, &values)?;
                    solution.algorithm = format!("branch-and-cut/{}", backend.name());
                    solution.computation_time = start.elapsed().as_secs_f64();
                    log::info!(
                        "Converged after {} round(s) and {} cut(s): distance {:.2}",
                        rounds,
                        self.cuts.len(),
                        solution.total_distance
                    );
                    return Ok(SolveOutcome::Solved(ExactResult {
                        solution,
                        optimal: true,
                        lower_bound: last
                            .as_ref()
                            .and_then(|o| o.bound.or(o.objective)),
                        rounds,
                        cuts_added: self.cuts.len(),
                        nodes_explored: last.as_ref().and_then(|o| o.nodes),
                    }));
                }

                SearchState::TimeLimitReached => {
                    let Some(values) = self.incumbent.take() else {
                        log::warn!("Time limit reached without a feasible solution");
                        return Ok(SolveOutcome::NoSolutionWithinLimit);
                    };
                    let mut solution = extract_solution(self.instance, &self.route_model, &values)?;
                    solution.algorithm = format!("branch-and-cut/{}", backend.name());
                    solution.computation_time = start.elapsed().as_secs_f64();
                    log::warn!(
                        "Time limit reached after {} round(s); returning best known ({:.2})",
                        rounds,
                        solution.total_distance
                    );
                    return Ok(SolveOutcome::Solved(ExactResult {
                        solution,
                        optimal: false,
                        lower_bound: last.as_ref().and_then(|o| o.bound),
                        rounds,
                        cuts_added: self.cuts.len(),
                        nodes_explored: last.as_ref().and_then(|o| o.nodes),
                    }));
                }

                SearchState::Infeasible => {
                    log::info!("Backend proved the instance infeasible");
                    return Ok(SolveOutcome::Infeasible);
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::MicrolpBackend;
    use crate::instance::{Location, TravelCost, TravelMatrix};
    use crate::model::RouteModelBuilder;

    fn uniform(n: usize) -> RoutingInstance {
        let locations = (0..n).map(|i| Location::new(format!("L{}", i))).collect();
        let travel = TravelMatrix::from_fn(n, |_, _| TravelCost::new(10.0, 10.0));
        RoutingInstance::new("uniform", locations, 0, travel)
    }

    /// Two tight clusters {0,1,2} and {3,4,5}, 100 apart: the relaxation loves two triangles
    fn two_clusters() -> RoutingInstance {
        let locations = (0..6).map(|i| Location::new(format!("C{}", i))).collect();
        let travel = TravelMatrix::from_fn(6, |i, j| {
            let d = if (i < 3) == (j < 3) { 1.0 } else { 100.0 };
            TravelCost::new(d, d)
        });
        RoutingInstance::new("clusters", locations, 0, travel)
    }

    /// Backend replaying scripted outcomes
    struct Scripted {
        outcomes: Vec<BackendOutcome>,
        native_lazy: bool,
        /// Whether each solve received a lazy hook
        hooks: Vec<bool>,
    }

    impl Scripted {
        fn new(outcomes: Vec<BackendOutcome>) -> Self {
            Scripted { outcomes, native_lazy: false, hooks: Vec::new() }
        }
    }

    impl MipBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn supports_lazy_constraints(&self) -> bool {
            self.native_lazy
        }

        fn solve(
            &mut self,
            _model: &MipModel,
            _limits: &SolveLimits,
            lazy: Option<&dyn LazyConstraints>,
        ) -> Result<BackendOutcome> {
            self.hooks.push(lazy.is_some());
            Ok(self.outcomes.remove(0))
        }
    }

    #[test]
    fn test_uniform_four_locations_cost_forty() {
        let inst = uniform(4);
        for strategy in [SubtourStrategy::BigM, SubtourStrategy::Lazy] {
            let rm = RouteModelBuilder::new(&inst).strategy(strategy).build_tsp().unwrap();
            let outcome = BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
                .run(&mut MicrolpBackend::new())
                .unwrap();
            let result = outcome.result().expect("solution expected");
            assert!(result.optimal);
            assert!((result.solution.total_distance - 40.0).abs() < 1e-6);
            assert_eq!(result.solution.routes.len(), 1);
            let route = &result.solution.routes[0];
            assert_eq!(route.stops.len(), 5);
            let mut visited: Vec<usize> = route.stops[..4].iter().map(|s| s.index).collect();
            visited.sort();
            assert_eq!(visited, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_lazy_cuts_reach_mtz_optimum() {
        let inst = two_clusters();
        let rm = RouteModelBuilder::new(&inst).strategy(SubtourStrategy::Lazy).build_tsp().unwrap();
        let lazy = BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
            .run(&mut MicrolpBackend::new())
            .unwrap();
        let rm = RouteModelBuilder::new(&inst).build_tsp().unwrap();
        let mtz = BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
            .run(&mut MicrolpBackend::new())
            .unwrap();

        let lazy = lazy.result().unwrap();
        let mtz = mtz.result().unwrap();
        assert!(lazy.cuts_added >= 1);
        assert_eq!(mtz.cuts_added, 0);
        // 4 inner legs of 1 and 2 crossings of 100
        assert!((lazy.solution.total_distance - 204.0).abs() < 1e-6);
        assert!((mtz.solution.total_distance - 204.0).abs() < 1e-6);
        assert_eq!(lazy.rounds, lazy.cuts_added + 1);
    }

    fn lazy_tsp(inst: &RoutingInstance) -> RouteModel {
        RouteModelBuilder::new(inst)
            .strategy(SubtourStrategy::Lazy)
            .build_tsp()
            .unwrap()
    }

    fn values_for(rm: &RouteModel, edges: &[(usize, usize)]) -> Vec<f64> {
        let mut values = vec![0.0; rm.model.num_variables()];
        for &(i, j) in edges {
            values[rm.edges.get(i, j, 0).unwrap().index()] = 1.0;
        }
        values
    }

    fn solved(values: Vec<f64>) -> BackendOutcome {
        BackendOutcome {
            status: BackendStatus::Optimal,
            values: Some(values),
            objective: Some(40.0),
            bound: None,
            nodes: None,
        }
    }

    fn order(result: &ExactResult) -> Vec<usize> {
        result.solution.routes[0].sequence()
    }

    #[test]
    fn test_time_limit_without_incumbent() {
        let inst = uniform(4);
        let rm = RouteModelBuilder::new(&inst).build_tsp().unwrap();
        let mut backend =
            Scripted::new(vec![BackendOutcome::without_solution(BackendStatus::TimeLimit)]);
        let outcome = BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
            .run(&mut backend)
            .unwrap();
        assert!(matches!(outcome, SolveOutcome::NoSolutionWithinLimit));
    }

    #[test]
    fn test_time_limit_falls_back_to_warm_start() {
        let inst = uniform(4);
        let mut rm = lazy_tsp(&inst);
        let warm = rm.apply_warm_start(&[0, 1, 2, 3]).unwrap();
        let mut backend =
            Scripted::new(vec![BackendOutcome::without_solution(BackendStatus::TimeLimit)]);
        let outcome = BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
            .with_incumbent(warm)
            .run(&mut backend)
            .unwrap();
        let result = outcome.result().expect("warm start should be returned");
        assert!(!result.optimal);
        assert!(!outcome.is_optimal());
        assert_eq!(order(result), vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_subtour_candidate_is_never_accepted() {
        // The scripted backend first returns two 2-cycles, then a Hamiltonian cycle
        let inst = uniform(4);
        let rm = lazy_tsp(&inst);
        let split = values_for(&rm, &[(0, 1), (1, 0), (2, 3), (3, 2)]);
        let tour = values_for(&rm, &[(0, 2), (2, 1), (1, 3), (3, 0)]);
        let mut backend = Scripted::new(vec![solved(split), solved(tour)]);

        let outcome = BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
            .run(&mut backend)
            .unwrap();
        let result = outcome.result().unwrap();
        assert_eq!(result.rounds, 2);
        assert_eq!(result.cuts_added, 1);
        assert_eq!(order(result), vec![0, 2, 1, 3, 0]);
    }

    #[test]
    fn test_repeated_subtour_is_an_error() {
        let inst = uniform(4);
        let rm = lazy_tsp(&inst);
        let split = values_for(&rm, &[(0, 1), (1, 0), (2, 3), (3, 2)]);
        let mut backend = Scripted::new(vec![solved(split.clone()), solved(split)]);
        let err = BranchAndCutDriver::new(&inst, rm, SolveLimits::default()).run(&mut backend);
        assert!(matches!(err, Err(RoutingError::DuplicateCut(_))));
    }

    #[test]
    fn test_lazy_hook_only_for_callback_backends() {
        let inst = uniform(4);
        for native_lazy in [false, true] {
            let rm = lazy_tsp(&inst);
            let tour = values_for(&rm, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
            let mut backend = Scripted::new(vec![solved(tour)]);
            backend.native_lazy = native_lazy;
            let outcome = BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
                .run(&mut backend)
                .unwrap();
            assert!(outcome.is_optimal());
            assert_eq!(backend.hooks, vec![native_lazy]);
        }

        // static models never hand out a hook
        let rm = RouteModelBuilder::new(&inst).build_tsp().unwrap();
        let tour = rm.tour_values(&[0, 1, 2, 3]).unwrap();
        let mut backend = Scripted::new(vec![solved(tour)]);
        backend.native_lazy = true;
        BranchAndCutDriver::new(&inst, rm, SolveLimits::default())
            .run(&mut backend)
            .unwrap();
        assert_eq!(backend.hooks, vec![false]);
    }
}
