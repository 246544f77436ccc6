//! CVRPTW Solver Library
//!
//! Exact solver for the Traveling Salesman Problem (TSP) and the Capacitated
//! Vehicle Routing Problem with Time Windows (CVRPTW), built as a MIP model
//! handed to an external branch-and-bound backend.
//!
//! # Features
//!
//! - TSP model with MTZ ordering or lazy subtour-elimination cuts
//! - CVRPTW model with capacity, fleet usage and Big-M time propagation
//! - Branch-and-cut driver with a pluggable separation oracle
//! - Pure-Rust backend (good_lp + microlp) and an optional Gurobi backend
//! - Nearest-neighbor warm start and CSV ingestion
//!
//! # Example
//!
//! ```no_run
//! use cvrptw_solver::config::SolverConfig;
//! use cvrptw_solver::exact::{solve, SolveOutcome};
//! use cvrptw_solver::io::load_tsp;
//! use cvrptw_solver::model::SubtourStrategy;
//!
//! let instance = load_tsp("travel_matrix.csv", None).unwrap();
//! let config = SolverConfig { subtour: SubtourStrategy::Lazy, ..Default::default() };
//!
//! if let SolveOutcome::Solved(result) = solve(&instance, &config).unwrap() {
//!     println!("{}", result.solution);
//! }
//! ```

pub mod config;
pub mod error;
pub mod exact;
pub mod heuristics;
pub mod instance;
pub mod io;
pub mod model;
pub mod separation;
pub mod solution;

pub use config::SolverConfig;
pub use error::{Result, RoutingError};
pub use exact::{solve, SolveOutcome};
pub use instance::RoutingInstance;
pub use solution::RoutingSolution;
