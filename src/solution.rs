//! Solution representation and extraction.
//!
//! A [`RoutingSolution`] lists one ordered route per used vehicle (a single
//! route for a TSP). Routes are read back from the edge variables of a
//! terminal value vector by walking each vehicle's selected edges from the
//! depot.

use crate::error::{Result, RoutingError};
use crate::instance::RoutingInstance;
use crate::model::{ModelKind, RouteModel};
use serde::{Deserialize, Serialize};

/// A visit within a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Location code
    pub location: String,
    /// Location index in the instance
    pub index: usize,
    /// Arrival time in minutes
    pub arrival: f64,
}

/// Ordered visits of one vehicle, depot first and last
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub vehicle: String,
    pub stops: Vec<RouteStop>,
    /// Travel distance of the route
    pub distance: f64,
    /// Demand delivered along the route
    pub load: f64,
}

impl Route {
    /// Location indices in visiting order (depot at both ends)
    pub fn sequence(&self) -> Vec<usize> {
        self.stops.iter().map(|s| s.index).collect()
    }

    /// Visited customers, without the depot endpoints
    pub fn customers(&self) -> &[RouteStop] {
        if self.stops.len() < 2 {
            return &[];
        }
        &self.stops[1..self.stops.len() - 1]
    }
}

/// Represents a solution to a routing instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSolution {
    pub routes: Vec<Route>,
    /// Total travel distance over every route
    pub total_distance: f64,
    /// Value of the model objective (weighted for CVRPTW)
    pub objective: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

/// Result of checking a solution against its instance
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeasibilityReport {
    pub every_location_once: bool,
    pub capacity_respected: bool,
    pub windows_respected: bool,
    pub issues: Vec<String>,
}

impl FeasibilityReport {
    pub fn is_feasible(&self) -> bool {
        self.every_location_once && self.capacity_respected && self.windows_respected
    }
}

impl RoutingSolution {
    /// Number of routes (used vehicles)
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Check visits, loads and arrival times against the instance
    pub fn check(&self, instance: &RoutingInstance) -> FeasibilityReport {
        let mut issues = Vec::new();

        let mut visits = vec![0usize; instance.dimension()];
        for route in &self.routes {
            for stop in route.customers() {
                if stop.index < visits.len() {
                    visits[stop.index] += 1;
                }
            }
        }
        for i in instance.customers() {
            if visits[i] != 1 {
                issues.push(format!("location {} visited {} times", instance.code(i), visits[i]));
            }
        }
        let every_location_once = issues.is_empty();

        let mut capacity_respected = true;
        if !instance.vehicles.is_empty() {
            for route in &self.routes {
                let load: f64 = route.customers().iter().map(|s| instance.demands[s.index]).sum();
                match instance.vehicles.iter().find(|v| v.id == route.vehicle) {
                    Some(vehicle) if load > vehicle.capacity + 1e-6 => {
                        capacity_respected = false;
                        issues.push(format!(
                            "vehicle {} carries {:.2} over capacity {:.2}",
                            vehicle.id, load, vehicle.capacity
                        ));
                    }
                    Some(_) => {}
                    None => {
                        capacity_respected = false;
                        issues.push(format!("route assigned to unknown vehicle {}", route.vehicle));
                    }
                }
            }
        }

        let mut windows_respected = true;
        for route in &self.routes {
            for stop in &route.stops {
                if let Some(window) = instance.locations.get(stop.index).and_then(|l| l.window) {
                    if !window.contains(stop.arrival) {
                        windows_respected = false;
                        issues.push(format!(
                            "vehicle {} reaches {} at {:.1}, outside [{:.1}, {:.1}]",
                            route.vehicle, stop.location, stop.arrival, window.start, window.end
                        ));
                    }
                }
            }
        }

        FeasibilityReport { every_location_once, capacity_respected, windows_respected, issues }
    }
}

impl std::fmt::Display for RoutingSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Distance: {:.2}", self.total_distance)?;
        writeln!(f, "  Objective: {:.2}", self.objective)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        for route in &self.routes {
            let codes: Vec<&str> = route.stops.iter().map(|s| s.location.as_str()).collect();
            writeln!(
                f,
                "  {} (load {:.1}, {:.2}): {}",
                route.vehicle,
                route.load,
                route.distance,
                codes.join(" -> ")
            )?;
        }
        Ok(())
    }
}

fn malformed(vehicle: &str, reason: String) -> RoutingError {
    log::error!("Malformed route for {}: {}", vehicle, reason);
    RoutingError::MalformedRoute { vehicle: vehicle.to_string(), reason }
}

/// Walk the selected edges of one vehicle from the depot.
///
/// Returns `None` when the vehicle selects no edge at all.
fn walk(
    instance: &RoutingInstance,
    edges: &[(usize, usize)],
    vehicle: &str,
) -> Result<Option<Vec<usize>>> {
    if edges.is_empty() {
        return Ok(None);
    }
    let n = instance.dimension();
    let depot = instance.depot;

    let mut succ: Vec<Option<usize>> = vec![None; n];
    for &(i, j) in edges {
        if succ[i].replace(j).is_some() {
            return Err(malformed(
                vehicle,
                format!("location {} is left more than once", instance.code(i)),
            ));
        }
    }

    let mut sequence = vec![depot];
    let mut seen = vec![false; n];
    seen[depot] = true;
    let mut current = depot;
    loop {
        let next = succ[current]
            .ok_or_else(|| {
                malformed(vehicle, format!("walk stops at {}", instance.code(current)))
            })?;
        sequence.push(next);
        if next == depot {
            break;
        }
        if seen[next] {
            return Err(malformed(
                vehicle,
                format!("location {} is revisited", instance.code(next)),
            ));
        }
        seen[next] = true;
        current = next;
    }

    if sequence.len() - 1 != edges.len() {
        return Err(malformed(
            vehicle,
            format!(
                "{} selected edges are not on the depot walk",
                edges.len() + 1 - sequence.len()
            ),
        ));
    }
    Ok(Some(sequence))
}

/// Convert a terminal value vector into routes.
///
/// CVRPTW arrivals are the solved `t` values (the closing depot stop takes
/// the vehicle's return time); TSP arrivals accumulate travel time from the
/// depot.
pub fn extract_solution(
    instance: &RoutingInstance,
    route_model: &RouteModel,
    values: &[f64],
) -> Result<RoutingSolution> {
    let mut routes = Vec::new();

    for k in 0..route_model.num_vehicles() {
        let vehicle = match route_model.kind {
            ModelKind::Tsp => "tour".to_string(),
            ModelKind::Cvrptw => instance.vehicles[k].id.clone(),
        };
        let edges = route_model.edges.selected(values, k);
        let Some(sequence) = walk(instance, &edges, &vehicle)? else {
            if route_model.kind == ModelKind::Tsp {
                return Err(malformed(&vehicle, "no edge selected".to_string()));
            }
            continue;
        };

        let mut stops = Vec::with_capacity(sequence.len());
        let mut distance = 0.0;
        let mut clock = 0.0;
        for (pos, &i) in sequence.iter().enumerate() {
            if pos > 0 {
                let leg = instance.travel(sequence[pos - 1], i)?;
                distance += leg.distance;
                clock += leg.time;
            }
            let arrival = match route_model.kind {
                ModelKind::Tsp => clock,
                ModelKind::Cvrptw if pos + 1 == sequence.len() => {
                    values[route_model.returns[k].index()]
                }
                ModelKind::Cvrptw => values[route_model.arrival[k][i].index()],
            };
            stops.push(RouteStop { location: instance.code(i).to_string(), index: i, arrival });
        }
        let load = sequence.iter().map(|&i| instance.demands[i]).sum();

        routes.push(Route { vehicle, stops, distance, load });
    }

    let total_distance = routes.iter().map(|r| r.distance).sum();
    Ok(RoutingSolution {
        routes,
        total_distance,
        objective: route_model.model.objective_value(values),
        algorithm: String::new(),
        computation_time: 0.0,
    })
}
