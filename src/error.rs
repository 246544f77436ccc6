//! Error kinds reported by the routing engine.
//!
//! Solver outcomes such as infeasibility or an exhausted time limit are not
//! errors; they are reported through [`crate::exact::SolveOutcome`].

use std::fmt;

/// Errors raised while validating input, building models or extracting routes.
#[derive(Debug)]
pub enum RoutingError {
    /// Invalid instance or solver configuration, detected before model construction.
    Config(String),
    /// A required ordered pair is absent from the travel matrix.
    MissingTravelEntry { from: String, to: String },
    /// An order or matrix row references a location code that does not exist.
    UnknownLocation(String),
    /// The selected edges of a vehicle do not form a single closed walk through the depot.
    MalformedRoute { vehicle: String, reason: String },
    /// The oracle produced a cut that was already part of the model.
    DuplicateCut(Vec<usize>),
    /// Failure reported by the MIP backend.
    Backend(String),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoutingError>;

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::Config(msg) => write!(f, "configuration error: {}", msg),
            RoutingError::MissingTravelEntry { from, to } => {
                write!(f, "travel matrix has no entry for {} -> {}", from, to)
            }
            RoutingError::UnknownLocation(code) => write!(f, "unknown location code '{}'", code),
            RoutingError::MalformedRoute { vehicle, reason } => {
                write!(
                    f,
                    "route of vehicle {} is not a closed walk through the depot: {}",
                    vehicle, reason
                )
            }
            RoutingError::DuplicateCut(component) => {
                write!(f, "subtour cut over {:?} was already added", component)
            }
            RoutingError::Backend(msg) => write!(f, "solver backend error: {}", msg),
            RoutingError::Io(e) => write!(f, "I/O error: {}", e),
            RoutingError::Csv(e) => write!(f, "CSV error: {}", e),
            RoutingError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for RoutingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoutingError::Io(e) => Some(e),
            RoutingError::Csv(e) => Some(e),
            RoutingError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RoutingError {
    fn from(e: std::io::Error) -> Self {
        RoutingError::Io(e)
    }
}

impl From<csv::Error> for RoutingError {
    fn from(e: csv::Error) -> Self {
        RoutingError::Csv(e)
    }
}

impl From<serde_json::Error> for RoutingError {
    fn from(e: serde_json::Error) -> Self {
        RoutingError::Json(e)
    }
}
