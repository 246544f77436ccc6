//! Solver configuration.
//!
//! Every field has a default so a JSON file only needs the values it changes.
//! Command-line flags are applied on top of the loaded file.

use crate::error::{Result, RoutingError};
use crate::exact::{BackendKind, SolveLimits};
use crate::instance::ServiceTimes;
use crate::model::{ObjectiveWeights, SubtourStrategy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Time limit in seconds
    pub time_limit: f64,
    /// MIP gap tolerance
    pub mip_gap: f64,
    /// Number of threads (0 = automatic)
    pub threads: i32,
    /// Enable solver output
    pub verbose: bool,
    /// How subtours are eliminated in the TSP model
    pub subtour: SubtourStrategy,
    /// Override of the derived time-propagation Big-M
    pub big_m: Option<f64>,
    /// Service durations applied to instances loaded from CSV
    pub service: ServiceTimes,
    /// CVRPTW objective weights
    pub weights: ObjectiveWeights,
    /// Seed the TSP search with a nearest-neighbor tour
    pub warm_start: bool,
    /// Randomize the warm start tour with this seed (top-3 nearest choices)
    pub warm_start_seed: Option<u64>,
    pub backend: BackendKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: 300.0,
            mip_gap: 1e-6,
            threads: 0,
            verbose: false,
            subtour: SubtourStrategy::default(),
            big_m: None,
            service: ServiceTimes::default(),
            weights: ObjectiveWeights::default(),
            warm_start: true,
            warm_start_seed: None,
            backend: BackendKind::default(),
        }
    }
}

impl SolverConfig {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: SolverConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded solver configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.time_limit.is_finite() || self.time_limit <= 0.0 {
            return Err(RoutingError::Config(format!(
                "time limit must be positive, got {}",
                self.time_limit
            )));
        }
        if self.mip_gap < 0.0 {
            return Err(RoutingError::Config(format!(
                "MIP gap must be non-negative, got {}",
                self.mip_gap
            )));
        }
        if self.service.customer < 0.0 || self.service.depot < 0.0 {
            return Err(RoutingError::Config("service times must be non-negative".to_string()));
        }
        if matches!(self.big_m, Some(m) if !m.is_finite() || m <= 0.0) {
            return Err(RoutingError::Config(
                "big-M override must be a positive number".to_string(),
            ));
        }
        Ok(())
    }

    /// Stopping controls for the backend
    pub fn limits(&self) -> SolveLimits {
        SolveLimits {
            time_limit: Duration::from_secs_f64(self.time_limit.max(0.0)),
            mip_gap: self.mip_gap,
            threads: self.threads,
            verbose: self.verbose,
        }
    }
}
