//! Module for representing routing instances.
//!
//! An instance gathers the locations (one of them the depot), the fleet, the
//! per-location demand aggregated from orders and the travel matrix. The same
//! type serves plain TSP runs (the fleet is ignored) and CVRPTW runs.

use crate::error::{Result, RoutingError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Delivery window in minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        TimeWindow { start, end }
    }

    /// Check whether a time lies inside the window (with a small tolerance for solver noise)
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start - 1e-4 && time <= self.end + 1e-4
    }
}

/// A location to visit (or the depot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Unique, stable location code
    pub code: String,
    /// Loading/unloading window, CVRPTW only
    pub window: Option<TimeWindow>,
}

impl Location {
    pub fn new(code: impl Into<String>) -> Self {
        Location { code: code.into(), window: None }
    }

    pub fn with_window(code: impl Into<String>, start: f64, end: f64) -> Self {
        Location { code: code.into(), window: Some(TimeWindow::new(start, end)) }
    }
}

/// A truck of the fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    /// Maximum weight the truck can carry
    pub capacity: f64,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, capacity: f64) -> Self {
        Vehicle { id: id.into(), capacity }
    }
}

/// An order to deliver, keyed by destination location code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub destination: String,
    pub weight: f64,
}

/// Fixed time spent at a location, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceTimes {
    pub customer: f64,
    pub depot: f64,
}

impl Default for ServiceTimes {
    fn default() -> Self {
        ServiceTimes { customer: 20.0, depot: 60.0 }
    }
}

/// Travel distance and travel time of an ordered pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelCost {
    pub distance: f64,
    pub time: f64,
}

impl TravelCost {
    pub fn new(distance: f64, time: f64) -> Self {
        TravelCost { distance, time }
    }
}

/// Travel matrix keyed by ordered location pairs.
///
/// Absent pairs stay absent: lookups of a missing pair are reported as
/// [`RoutingError::MissingTravelEntry`] by [`RoutingInstance::travel`] instead
/// of being read as a zero-cost edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TravelMatrix {
    size: usize,
    entries: Vec<Option<TravelCost>>,
}

impl TravelMatrix {
    /// Create an empty matrix for `size` locations
    pub fn new(size: usize) -> Self {
        TravelMatrix { size, entries: vec![None; size * size] }
    }

    /// Fill every off-diagonal pair from a function
    pub fn from_fn<F>(size: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> TravelCost,
    {
        let mut matrix = Self::new(size);
        for i in 0..size {
            for j in 0..size {
                if i != j {
                    matrix.insert(i, j, f(i, j));
                }
            }
        }
        matrix
    }

    /// Build a matrix from a square distance table, using distance as travel time
    pub fn from_distances(distances: &[Vec<f64>]) -> Self {
        Self::from_fn(distances.len(), |i, j| TravelCost::new(distances[i][j], distances[i][j]))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn insert(&mut self, from: usize, to: usize, cost: TravelCost) {
        if from < self.size && to < self.size {
            self.entries[from * self.size + to] = Some(cost);
        }
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> Option<TravelCost> {
        if from >= self.size || to >= self.size {
            return None;
        }
        self.entries[from * self.size + to]
    }
}

/// A complete routing instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingInstance {
    pub name: String,
    pub locations: Vec<Location>,
    /// Index of the depot in `locations`
    pub depot: usize,
    pub vehicles: Vec<Vehicle>,
    /// Aggregated order weight per location
    pub demands: Vec<f64>,
    pub travel: TravelMatrix,
    pub service: ServiceTimes,
}

impl RoutingInstance {
    /// Create an instance without fleet nor demand (enough for a TSP run)
    pub fn new(
        name: impl Into<String>,
        locations: Vec<Location>,
        depot: usize,
        travel: TravelMatrix,
    ) -> Self {
        let n = locations.len();
        RoutingInstance {
            name: name.into(),
            locations,
            depot,
            vehicles: Vec::new(),
            demands: vec![0.0; n],
            travel,
            service: ServiceTimes::default(),
        }
    }

    pub fn with_vehicles(mut self, vehicles: Vec<Vehicle>) -> Self {
        self.vehicles = vehicles;
        self
    }

    pub fn with_service_times(mut self, service: ServiceTimes) -> Self {
        self.service = service;
        self
    }

    /// Aggregate orders into per-location demand.
    /// Orders for unknown locations are rejected.
    pub fn with_orders(mut self, orders: &[Order]) -> Result<Self> {
        let index = self.code_index();
        let mut demands = vec![0.0; self.locations.len()];
        for order in orders {
            let i = *index
                .get(order.destination.as_str())
                .ok_or_else(|| RoutingError::UnknownLocation(order.destination.clone()))?;
            demands[i] += order.weight;
        }
        self.demands = demands;
        Ok(self)
    }

    /// Map from location code to index
    pub fn code_index(&self) -> HashMap<&str, usize> {
        self.locations.iter().enumerate().map(|(i, l)| (l.code.as_str(), i)).collect()
    }

    /// Number of locations (including the depot)
    #[inline]
    pub fn dimension(&self) -> usize {
        self.locations.len()
    }

    pub fn num_customers(&self) -> usize {
        self.dimension().saturating_sub(1)
    }

    /// Indices of every location except the depot
    pub fn customers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.dimension()).filter(move |&i| i != self.depot)
    }

    #[inline]
    pub fn is_depot(&self, i: usize) -> bool {
        i == self.depot
    }

    /// Service duration spent at location `i` before leaving it
    #[inline]
    pub fn service_time(&self, i: usize) -> f64 {
        if self.is_depot(i) {
            self.service.depot
        } else {
            self.service.customer
        }
    }

    /// Travel cost of the ordered pair `(from, to)`
    pub fn travel(&self, from: usize, to: usize) -> Result<TravelCost> {
        self.travel.get(from, to).ok_or_else(|| RoutingError::MissingTravelEntry {
            from: self.code(from).to_string(),
            to: self.code(to).to_string(),
        })
    }

    pub fn code(&self, i: usize) -> &str {
        self.locations.get(i).map(|l| l.code.as_str()).unwrap_or("?")
    }

    pub fn total_demand(&self) -> f64 {
        self.demands.iter().sum()
    }

    pub fn total_capacity(&self) -> f64 {
        self.vehicles.iter().map(|v| v.capacity).sum()
    }

    /// Checks shared by every model kind: location set, depot, windows and matrix.
    pub fn validate(&self) -> Result<()> {
        let n = self.dimension();
        if n < 2 {
            return Err(RoutingError::Config(format!(
                "an instance needs at least 2 locations, got {}",
                n
            )));
        }
        if self.depot >= n {
            return Err(RoutingError::Config(format!(
                "depot index {} is out of range for {} locations",
                self.depot, n
            )));
        }
        if self.code_index().len() != n {
            return Err(RoutingError::Config("location codes must be unique".to_string()));
        }
        for loc in &self.locations {
            if let Some(w) = loc.window {
                if w.start > w.end {
                    return Err(RoutingError::Config(format!(
                        "time window of {} starts at {} after its end {}",
                        loc.code, w.start, w.end
                    )));
                }
                if w.start < 0.0 {
                    return Err(RoutingError::Config(format!(
                        "time window of {} starts before midnight",
                        loc.code
                    )));
                }
            }
        }
        if self.travel.size() != n {
            return Err(RoutingError::Config(format!(
                "travel matrix covers {} locations, instance has {}",
                self.travel.size(),
                n
            )));
        }
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let cost = self.travel(i, j)?;
                if cost.distance < 0.0 || cost.time < 0.0 {
                    return Err(RoutingError::Config(format!(
                        "negative travel cost for {} -> {}",
                        self.code(i),
                        self.code(j)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Additional checks for capacitated, time-windowed runs
    pub fn validate_fleet(&self) -> Result<()> {
        self.validate()?;
        if self.vehicles.is_empty() {
            return Err(RoutingError::Config("the vehicle set is empty".to_string()));
        }
        for v in &self.vehicles {
            if v.capacity <= 0.0 {
                return Err(RoutingError::Config(format!(
                    "vehicle {} has non-positive capacity {}",
                    v.id, v.capacity
                )));
            }
        }
        if self.demands.len() != self.dimension() {
            return Err(RoutingError::Config(
                "one demand entry per location is required".to_string(),
            ));
        }
        if self.demands.iter().any(|&d| d < 0.0) {
            return Err(RoutingError::Config("demands must be non-negative".to_string()));
        }
        if self.demands[self.depot] > 0.0 {
            return Err(RoutingError::Config(format!(
                "orders cannot be addressed to the depot {}",
                self.code(self.depot)
            )));
        }
        Ok(())
    }

    /// Upper bound on any arrival time of a schedule without needless waiting.
    ///
    /// When every location has a window this is the latest window end. Otherwise
    /// it is the latest window start plus the time needed to serve and leave
    /// every location once along the slowest arcs.
    pub fn horizon(&self) -> Result<f64> {
        let latest_end = self
            .locations
            .iter()
            .filter_map(|l| l.window.map(|w| w.end))
            .fold(0.0, f64::max);
        if self.locations.iter().all(|l| l.window.is_some()) {
            return Ok(latest_end);
        }

        let latest_start = self
            .locations
            .iter()
            .filter_map(|l| l.window.map(|w| w.start))
            .fold(0.0, f64::max);
        let mut span = 0.0;
        for i in 0..self.dimension() {
            let mut slowest: f64 = 0.0;
            for j in 0..self.dimension() {
                if i != j {
                    slowest = slowest.max(self.travel(i, j)?.time);
                }
            }
            span += self.service_time(i) + slowest;
        }
        Ok(latest_end.max(latest_start + span))
    }

    /// Longest travel time between two distinct locations
    pub fn max_travel_time(&self) -> Result<f64> {
        let mut max = 0.0f64;
        for i in 0..self.dimension() {
            for j in 0..self.dimension() {
                if i != j {
                    max = max.max(self.travel(i, j)?.time);
                }
            }
        }
        Ok(max)
    }

    /// Total distance of a closed tour (the return leg to the first location is implicit
    /// unless the tour already ends there)
    pub fn tour_length(&self, tour: &[usize]) -> Result<f64> {
        if tour.len() < 2 {
            return Ok(0.0);
        }
        let mut length = 0.0;
        for w in tour.windows(2) {
            length += self.travel(w[0], w[1])?.distance;
        }
        let (first, last) = (tour[0], tour[tour.len() - 1]);
        if first != last {
            length += self.travel(last, first)?.distance;
        }
        Ok(length)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> Result<InstanceStatistics> {
        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.dimension() {
            for j in 0..self.dimension() {
                if i != j {
                    distances.push(self.travel(i, j)?.distance);
                }
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        Ok(InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension(),
            depot: self.code(self.depot).to_string(),
            num_vehicles: self.vehicles.len(),
            num_windows: self.locations.iter().filter(|l| l.window.is_some()).count(),
            total_demand: self.total_demand(),
            total_capacity: self.total_capacity(),
            avg_distance,
            max_distance,
        })
    }
}

/// Statistics about a routing instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub depot: String,
    pub num_vehicles: usize,
    pub num_windows: usize,
    pub total_demand: f64,
    pub total_capacity: f64,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(
            f,
            "  Locations: {} (depot {} + {} customers)",
            self.dimension,
            self.depot,
            self.dimension.saturating_sub(1)
        )?;
        writeln!(f, "  Vehicles: {}", self.num_vehicles)?;
        writeln!(f, "  Time windows: {}", self.num_windows)?;
        writeln!(f, "  Total demand: {:.2}", self.total_demand)?;
        writeln!(f, "  Total capacity: {:.2}", self.total_capacity)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(n: usize, d: f64) -> RoutingInstance {
        let locations = (0..n).map(|i| Location::new(format!("L{}", i))).collect();
        let travel = TravelMatrix::from_fn(n, |_, _| TravelCost::new(d, d));
        RoutingInstance::new("uniform", locations, 0, travel)
    }

    #[test]
    fn test_single_location_rejected() {
        let inst = uniform(1, 10.0);
        assert!(matches!(inst.validate(), Err(RoutingError::Config(_))));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut inst = uniform(3, 10.0);
        inst.locations[1].window = Some(TimeWindow::new(600.0, 540.0));
        assert!(matches!(inst.validate(), Err(RoutingError::Config(_))));
    }

    #[test]
    fn test_missing_pair_is_reported() {
        let locations = vec![Location::new("A"), Location::new("B"), Location::new("C")];
        let mut travel = TravelMatrix::new(3);
        travel.insert(0, 1, TravelCost::new(1.0, 1.0));
        let inst = RoutingInstance::new("holes", locations, 0, travel);
        match inst.travel(1, 2) {
            Err(RoutingError::MissingTravelEntry { from, to }) => {
                assert_eq!(from, "B");
                assert_eq!(to, "C");
            }
            other => panic!("expected missing entry, got {:?}", other),
        }
        assert!(matches!(inst.validate(), Err(RoutingError::MissingTravelEntry { .. })));
    }

    #[test]
    fn test_fleet_validation() {
        let inst = uniform(3, 10.0);
        assert!(matches!(inst.validate_fleet(), Err(RoutingError::Config(_))));

        let inst = uniform(3, 10.0).with_vehicles(vec![Vehicle::new("T1", 0.0)]);
        assert!(matches!(inst.validate_fleet(), Err(RoutingError::Config(_))));

        let inst = uniform(3, 10.0).with_vehicles(vec![Vehicle::new("T1", 5.0)]);
        assert!(inst.validate_fleet().is_ok());
    }

    #[test]
    fn test_orders_aggregate_per_destination() {
        let orders = vec![
            Order { destination: "L1".into(), weight: 4.0 },
            Order { destination: "L1".into(), weight: 3.0 },
            Order { destination: "L2".into(), weight: 1.5 },
        ];
        let inst = uniform(3, 10.0).with_orders(&orders).unwrap();
        assert_eq!(inst.demands, vec![0.0, 7.0, 1.5]);
        assert!((inst.total_demand() - 8.5).abs() < 1e-9);

        let bad = vec![Order { destination: "nowhere".into(), weight: 1.0 }];
        assert!(matches!(
            uniform(3, 10.0).with_orders(&bad),
            Err(RoutingError::UnknownLocation(_))
        ));
    }

    #[test]
    fn test_horizon_with_full_windows() {
        let mut inst = uniform(3, 10.0);
        for (i, loc) in inst.locations.iter_mut().enumerate() {
            loc.window = Some(TimeWindow::new(0.0, 100.0 * (i + 1) as f64));
        }
        assert_eq!(inst.horizon().unwrap(), 300.0);
    }

    #[test]
    fn test_horizon_without_windows() {
        let inst = uniform(3, 10.0);
        // depot 60 + 2 customers * 20, plus 3 slowest legs of 10
        assert_eq!(inst.horizon().unwrap(), 130.0);
    }

    #[test]
    fn test_tour_length() {
        let inst = uniform(4, 10.0);
        assert_eq!(inst.tour_length(&[0, 1, 2, 3]).unwrap(), 40.0);
        assert_eq!(inst.tour_length(&[0, 1, 2, 3, 0]).unwrap(), 40.0);
    }
}
