//! Exact solvers module.
//!
//! The routing engine never solves LPs itself: a [`MipBackend`] registers the
//! variables and constraints of a [`MipModel`], runs its own branch-and-bound
//! and reports a terminal status. The [`driver`] orchestrates the backend and
//! the subtour oracle.

pub mod driver;
pub mod microlp;

#[cfg(feature = "gurobi")]
pub mod gurobi;

pub use driver::{BranchAndCutDriver, ExactResult, SearchState, SolveOutcome};
pub use microlp::MicrolpBackend;

#[cfg(feature = "gurobi")]
pub use gurobi::GurobiBackend;

use crate::config::SolverConfig;
use crate::error::Result;
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::instance::RoutingInstance;
use crate::model::{LinearConstraint, MipModel, ModelKind, RouteModelBuilder};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal status reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Optimal,
    TimeLimit,
    Infeasible,
    Unbounded,
}

/// Stopping controls forwarded to the backend
#[derive(Debug, Clone)]
pub struct SolveLimits {
    /// Wall-clock budget left for this solve
    pub time_limit: Duration,
    /// Relative MIP gap tolerance
    pub mip_gap: f64,
    /// Number of threads (0 = automatic)
    pub threads: i32,
    pub verbose: bool,
}

impl Default for SolveLimits {
    fn default() -> Self {
        SolveLimits {
            time_limit: Duration::from_secs(300),
            mip_gap: 1e-6,
            threads: 0,
            verbose: false,
        }
    }
}

/// What a backend returns after a solve
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    pub status: BackendStatus,
    /// Values of the best integral point, indexed like the model variables
    pub values: Option<Vec<f64>>,
    pub objective: Option<f64>,
    /// Best proven bound, if the backend reports one
    pub bound: Option<f64>,
    pub nodes: Option<u64>,
}

impl BackendOutcome {
    pub fn without_solution(status: BackendStatus) -> Self {
        BackendOutcome { status, values: None, objective: None, bound: None, nodes: None }
    }
}

/// Hook fired by backends on every new integral candidate.
///
/// Returning a constraint rejects the candidate; the constraint is added to the
/// live model before the search moves on.
pub trait LazyConstraints {
    fn separate(&self, values: &[f64]) -> Result<Option<LinearConstraint>>;
}

/// External MIP capability
pub trait MipBackend {
    fn name(&self) -> &str;

    /// Whether `solve` calls the lazy hook during its own search. Backends
    /// that do not are re-run by the driver after each injected cut.
    fn supports_lazy_constraints(&self) -> bool;

    fn solve(
        &mut self,
        model: &MipModel,
        limits: &SolveLimits,
        lazy: Option<&dyn LazyConstraints>,
    ) -> Result<BackendOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Pure-Rust branch-and-bound (good_lp + microlp)
    #[default]
    Microlp,
    /// Gurobi, with native lazy constraint callbacks
    Gurobi,
}

pub fn create_backend(kind: BackendKind) -> Result<Box<dyn MipBackend>> {
    match kind {
        BackendKind::Microlp => Ok(Box::new(MicrolpBackend::new())),
        #[cfg(feature = "gurobi")]
        BackendKind::Gurobi => Ok(Box::new(GurobiBackend::new())),
        #[cfg(not(feature = "gurobi"))]
        BackendKind::Gurobi => Err(crate::error::RoutingError::Config(
            "Gurobi feature not enabled in this build".to_string(),
        )),
    }
}

/// Build the model for an instance, seed it and run branch-and-cut.
///
/// Instances without vehicles are solved as a TSP; otherwise as a CVRPTW.
pub fn solve(instance: &RoutingInstance, config: &SolverConfig) -> Result<SolveOutcome> {
    let mut route_model = RouteModelBuilder::new(instance)
        .strategy(config.subtour)
        .weights(config.weights)
        .big_m(config.big_m)
        .build()?;
    log::info!(
        "Model {} built: {}",
        route_model.model.name,
        route_model.summary()
    );

    let mut incumbent = None;
    if config.warm_start && route_model.kind == ModelKind::Tsp {
        let heuristic = match config.warm_start_seed {
            Some(seed) => NearestNeighborHeuristic::randomized(seed),
            None => NearestNeighborHeuristic::new(),
        };
        let tour = heuristic.construct(instance)?;
        log::info!(
            "Warm start from {} tour of length {:.2}",
            heuristic.name(),
            instance.tour_length(&tour)?
        );
        incumbent = Some(route_model.apply_warm_start(&tour)?);
    }

    let mut backend = create_backend(config.backend)?;
    let mut driver = BranchAndCutDriver::new(instance, route_model, config.limits());
    if let Some(values) = incumbent {
        driver = driver.with_incumbent(values);
    }
    driver.run(backend.as_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoutingError;
    use crate::instance::{Location, Order, TravelCost, TravelMatrix, Vehicle};
    use crate::model::{ObjectiveWeights, SubtourStrategy};
    use std::time::Instant;

    fn uniform(n: usize) -> RoutingInstance {
        let locations = (0..n).map(|i| Location::new(format!("L{}", i))).collect();
        let travel = TravelMatrix::from_fn(n, |_, _| TravelCost::new(10.0, 10.0));
        RoutingInstance::new("uniform", locations, 0, travel)
    }

    /// Deterministic scatter of `n` points with Euclidean distances
    fn scattered(n: usize) -> RoutingInstance {
        let points: Vec<(f64, f64)> = (0..n)
            .map(|i| (((i * 37) % 101) as f64, ((i * 53 + 11) % 97) as f64))
            .collect();
        let distances: Vec<Vec<f64>> = points
            .iter()
            .map(|a| {
                points
                    .iter()
                    .map(|b| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt().round())
                    .collect()
            })
            .collect();
        let locations = (0..n).map(|i| Location::new(format!("P{}", i))).collect();
        RoutingInstance::new("scattered", locations, 0, TravelMatrix::from_distances(&distances))
    }

    #[test]
    fn test_solve_picks_tsp_without_fleet() {
        for strategy in [SubtourStrategy::BigM, SubtourStrategy::Lazy] {
            let config = SolverConfig { subtour: strategy, ..Default::default() };
            match solve(&uniform(4), &config).unwrap() {
                SolveOutcome::Solved(result) => {
                    assert!(result.optimal);
                    assert_eq!(result.solution.routes.len(), 1);
                    assert!((result.solution.total_distance - 40.0).abs() < 1e-6);
                }
                other => panic!("expected a solution, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_seeded_warm_start_reaches_same_optimum() {
        let config = SolverConfig { warm_start_seed: Some(42), ..Default::default() };
        let outcome = solve(&uniform(5), &config).unwrap();
        let result = outcome.result().expect("solution expected");
        assert!(result.optimal);
        assert!((result.solution.total_distance - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_time_limit_is_enforced_on_large_tsp() {
        let inst = scattered(45);
        let config = SolverConfig { time_limit: 0.05, ..Default::default() };
        let start = Instant::now();
        let outcome = solve(&inst, &config).unwrap();
        let elapsed = start.elapsed().as_secs_f64();

        assert!(elapsed < 1.0, "solve took {:.3}s with a 0.05s budget", elapsed);
        // the warm start tour is the fallback answer
        let result = outcome.result().expect("warm start expected");
        assert!(!result.optimal);
        assert_eq!(result.solution.routes.len(), 1);
        assert_eq!(result.solution.routes[0].stops.len(), 46);
        assert!(result.solution.check(&inst).every_location_once);
    }

    #[test]
    fn test_capacity_splits_demand_across_trucks() {
        let inst = uniform(4)
            .with_vehicles(vec![
                Vehicle::new("T1", 10.0),
                Vehicle::new("T2", 10.0),
                Vehicle::new("T3", 10.0),
            ])
            .with_orders(&[
                Order { destination: "L1".into(), weight: 6.0 },
                Order { destination: "L2".into(), weight: 6.0 },
                Order { destination: "L3".into(), weight: 3.0 },
            ])
            .unwrap();
        let config = SolverConfig {
            weights: ObjectiveWeights::distance_only(),
            ..Default::default()
        };
        let outcome = solve(&inst, &config).unwrap();
        let result = outcome.result().expect("solution expected");
        let solution = &result.solution;

        assert!(result.optimal);
        assert!(solution.check(&inst).is_feasible());
        // 15 units need two trucks; a third route would only add distance
        assert_eq!(solution.num_routes(), 2);
        for route in &solution.routes {
            let vehicle = inst.vehicles.iter().find(|v| v.id == route.vehicle).unwrap();
            assert!(route.load <= vehicle.capacity + 1e-6);
        }
        // one single-stop route (20) and one two-stop route (30)
        assert!((solution.total_distance - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_solve_reports_over_capacity_as_infeasible() {
        let inst = uniform(3)
            .with_vehicles(vec![Vehicle::new("T1", 10.0)])
            .with_orders(&[
                Order { destination: "L1".into(), weight: 8.0 },
                Order { destination: "L2".into(), weight: 7.0 },
            ])
            .unwrap();
        let outcome = solve(&inst, &SolverConfig::default()).unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible));
    }

    #[test]
    fn test_gurobi_backend_availability() {
        let backend = create_backend(BackendKind::Gurobi);
        if cfg!(feature = "gurobi") {
            assert!(backend.is_ok());
        } else {
            assert!(matches!(backend, Err(RoutingError::Config(_))));
        }
    }
}
