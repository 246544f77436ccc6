//! Route model builder.
//!
//! This module implements the Mixed Integer Programming (MIP) formulations
//! of the TSP and of the CVRPTW.
//!
//! The TSP formulation uses:
//! - Binary variables x[i][j] for directed edges
//! - Continuous variables u[i] for MTZ subtour elimination (static strategy only)
//!
//! The CVRPTW formulation uses:
//! - Binary variables x[i][j][k] for directed edges driven by vehicle k
//! - Binary variables used[k] linking the fixed dispatch cost to vehicle k
//! - Continuous variables t[i][k] for arrival times, bounded by the windows
//! - Continuous variables return[k] for the time vehicle k is back at the depot

use super::{LinearConstraint, LinearExpr, MipModel, Sense, VarId};
use crate::error::{Result, RoutingError};
use crate::instance::RoutingInstance;
use crate::separation::Cut;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How subtours are kept out of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SubtourStrategy {
    /// Static elimination: MTZ ordering for the TSP, Big-M time propagation for the CVRPTW
    #[default]
    BigM,
    /// Subtour-elimination cuts separated on integral candidates (TSP only)
    Lazy,
}

/// Objective weighting policy for the CVRPTW.
///
/// Edge cost is `distance * (distance_factor - capacity_discount * capacity)`,
/// so larger trucks travel cheaper per km, and a used vehicle pays
/// `fixed_cost_per_capacity * capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub distance_factor: f64,
    pub capacity_discount: f64,
    pub fixed_cost_per_capacity: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights {
            distance_factor: 20000.0,
            capacity_discount: 0.001,
            fixed_cost_per_capacity: 2.0,
        }
    }
}

impl ObjectiveWeights {
    /// Plain travelled distance, no dispatch cost
    pub fn distance_only() -> Self {
        ObjectiveWeights {
            distance_factor: 1.0,
            capacity_discount: 0.0,
            fixed_cost_per_capacity: 0.0,
        }
    }

    fn edge_factor(&self, capacity: f64) -> f64 {
        self.distance_factor - self.capacity_discount * capacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Tsp,
    Cvrptw,
}

/// Dense lookup of edge variables by `(from, to, vehicle)`
#[derive(Debug, Clone)]
pub struct EdgeVars {
    locations: usize,
    vehicles: usize,
    vars: Vec<Option<VarId>>,
}

impl EdgeVars {
    fn new(locations: usize, vehicles: usize) -> Self {
        EdgeVars { locations, vehicles, vars: vec![None; locations * locations * vehicles] }
    }

    #[inline]
    fn slot(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.locations + i) * self.locations + j
    }

    fn set(&mut self, i: usize, j: usize, k: usize, var: VarId) {
        let slot = self.slot(i, j, k);
        self.vars[slot] = Some(var);
    }

    /// Edge variable of vehicle `k`; `None` for self-loops
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<VarId> {
        if i >= self.locations || j >= self.locations || k >= self.vehicles {
            return None;
        }
        self.vars[self.slot(i, j, k)]
    }

    /// All `(from, to, vehicle, var)` tuples
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize, VarId)> + '_ {
        let n = self.locations;
        self.vars.iter().enumerate().filter_map(move |(slot, v)| {
            v.map(|var| {
                let k = slot / (n * n);
                let i = (slot / n) % n;
                let j = slot % n;
                (i, j, k, var)
            })
        })
    }

    /// Edges of vehicle `k` selected (value > 0.5) in an assignment
    pub fn selected(&self, values: &[f64], k: usize) -> Vec<(usize, usize)> {
        self.iter()
            .filter(|&(_, _, kk, var)| kk == k && values[var.index()] > 0.5)
            .map(|(i, j, _, _)| (i, j))
            .collect()
    }

    pub fn num_locations(&self) -> usize {
        self.locations
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles
    }
}

/// A built model plus the handles needed to read its solutions
#[derive(Debug, Clone)]
pub struct RouteModel {
    pub kind: ModelKind,
    pub strategy: SubtourStrategy,
    pub model: MipModel,
    pub edges: EdgeVars,
    /// `arrival[k][i]`, empty for the TSP
    pub arrival: Vec<Vec<VarId>>,
    /// `returns[k]`, empty for the TSP
    pub returns: Vec<VarId>,
    /// `used[k]`, empty for the TSP
    pub used: Vec<VarId>,
    /// MTZ position of each location (static TSP only, `None` for the depot)
    pub order: Vec<Option<VarId>>,
    pub depot: usize,
    /// Big-M used by the time propagation constraints (CVRPTW only)
    pub big_m: Option<f64>,
}

impl RouteModel {
    pub fn num_locations(&self) -> usize {
        self.edges.num_locations()
    }

    pub fn num_vehicles(&self) -> usize {
        self.edges.num_vehicles()
    }

    /// Subtour-elimination inequality `sum x[i][j] <= |S| - 1` over ordered pairs of `S`
    pub fn cut_constraint(&self, cut: &Cut, index: usize) -> LinearConstraint {
        let mut expr = LinearExpr::new();
        for k in 0..self.num_vehicles() {
            for &i in cut.component() {
                for &j in cut.component() {
                    if let Some(var) = self.edges.get(i, j, k) {
                        expr.add(var, 1.0);
                    }
                }
            }
        }
        LinearConstraint::new(format!("subtour_{}", index), expr, Sense::LessEq, cut.rhs())
    }

    /// Full value vector describing a TSP tour (edges plus MTZ positions).
    /// The tour must start at the depot and visit every location once.
    pub fn tour_values(&self, tour: &[usize]) -> Result<Vec<f64>> {
        if self.kind != ModelKind::Tsp {
            return Err(RoutingError::Config(
                "tour values are only defined for single-tour models".to_string(),
            ));
        }
        let n = self.num_locations();
        let mut seen = vec![false; n];
        for &node in tour {
            if node >= n || seen[node] {
                return Err(RoutingError::Config(format!(
                    "warm start tour {:?} is not a permutation",
                    tour
                )));
            }
            seen[node] = true;
        }
        if tour.len() != n || tour.first() != Some(&self.depot) {
            return Err(RoutingError::Config(format!(
                "warm start tour must start at the depot and visit all {} locations",
                n
            )));
        }

        let mut values = vec![0.0; self.model.num_variables()];
        for (pos, &from) in tour.iter().enumerate() {
            let to = tour[(pos + 1) % n];
            if let Some(var) = self.edges.get(from, to, 0) {
                values[var.index()] = 1.0;
            }
            if let Some(Some(u)) = self.order.get(from) {
                values[u.index()] = pos as f64;
            }
        }
        Ok(values)
    }

    /// Record a tour as warm start on the model variables
    pub fn apply_warm_start(&mut self, tour: &[usize]) -> Result<Vec<f64>> {
        let values = self.tour_values(tour)?;
        for (idx, &value) in values.iter().enumerate() {
            self.model.set_start(VarId(idx), value);
        }
        Ok(values)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} variables ({} binary), {} constraints",
            self.model.num_variables(),
            self.model.num_binaries(),
            self.model.num_constraints()
        )
    }
}

/// Builds [`RouteModel`]s from a validated instance
pub struct RouteModelBuilder<'a> {
    instance: &'a RoutingInstance,
    strategy: SubtourStrategy,
    weights: ObjectiveWeights,
    big_m: Option<f64>,
}

impl<'a> RouteModelBuilder<'a> {
    pub fn new(instance: &'a RoutingInstance) -> Self {
        RouteModelBuilder {
            instance,
            strategy: SubtourStrategy::default(),
            weights: ObjectiveWeights::default(),
            big_m: None,
        }
    }

    pub fn strategy(mut self, strategy: SubtourStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Override the derived Big-M (must not be smaller than the derived value)
    pub fn big_m(mut self, big_m: Option<f64>) -> Self {
        self.big_m = big_m;
        self
    }

    /// Smallest valid Big-M for the time propagation constraints:
    /// any arrival time is at most the horizon, and a deactivated constraint
    /// must also absorb one service and one travel leg.
    pub fn derived_big_m(instance: &RoutingInstance) -> Result<f64> {
        let max_service = instance.service.customer.max(instance.service.depot);
        Ok(instance.horizon()? + max_service + instance.max_travel_time()?)
    }

    /// Single-tour model over every location
    pub fn build_tsp(&self) -> Result<RouteModel> {
        let inst = self.instance;
        inst.validate()?;
        let n = inst.dimension();

        let mut model = MipModel::new(format!("TSP_{}", inst.name));
        let mut edges = EdgeVars::new(n, 1);

        // x[i][j] = 1 if edge (i,j) is in the tour
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dist = inst.travel(i, j)?.distance;
                    let name = format!("x_{}_{}", inst.code(i), inst.code(j));
                    let var = model.add_binary(name, dist);
                    edges.set(i, j, 0, var);
                }
            }
        }

        // Degree constraints: every location left once and entered once
        for i in 0..n {
            let out: LinearExpr =
                (0..n).filter_map(|j| edges.get(i, j, 0)).map(|v| (v, 1.0)).collect();
            model.add_constraint(LinearConstraint::new(
                format!("out_{}", inst.code(i)),
                out,
                Sense::Equal,
                1.0,
            ));
            let inc: LinearExpr =
                (0..n).filter_map(|j| edges.get(j, i, 0)).map(|v| (v, 1.0)).collect();
            model.add_constraint(LinearConstraint::new(
                format!("in_{}", inst.code(i)),
                inc,
                Sense::Equal,
                1.0,
            ));
        }

        let mut order = vec![None; n];
        if self.strategy == SubtourStrategy::BigM {
            // u[i] = position in tour (MTZ subtour elimination)
            for i in inst.customers() {
                let name = format!("u_{}", inst.code(i));
                order[i] = Some(model.add_continuous(name, 1.0, Some((n - 1) as f64)));
            }
            let big = n as f64;
            for i in inst.customers() {
                for j in inst.customers() {
                    if i == j {
                        continue;
                    }
                    if let (Some(ui), Some(uj), Some(x)) =
                        (order[i], order[j], edges.get(i, j, 0))
                    {
                        // u[j] >= u[i] + 1 - n (1 - x[i][j])
                        let expr = LinearExpr::new().with(uj, 1.0).with(ui, -1.0).with(x, -big);
                        model.add_constraint(LinearConstraint::new(
                            format!("mtz_{}_{}", inst.code(i), inst.code(j)),
                            expr,
                            Sense::GreaterEq,
                            1.0 - big,
                        ));
                    }
                }
            }
        }

        let built = RouteModel {
            kind: ModelKind::Tsp,
            strategy: self.strategy,
            model,
            edges,
            arrival: Vec::new(),
            returns: Vec::new(),
            used: Vec::new(),
            order,
            depot: inst.depot,
            big_m: None,
        };
        log::debug!("Built TSP model ({:?}): {}", self.strategy, built.summary());
        Ok(built)
    }

    /// Time propagation only separates customer cycles when moving between two
    /// customers takes time: a zero lead lets `t` stay constant around a loop
    /// that never touches the depot.
    fn check_positive_leads(inst: &RoutingInstance) -> Result<()> {
        for i in inst.customers() {
            for j in inst.customers() {
                if i == j {
                    continue;
                }
                let lead = inst.service_time(i) + inst.travel(i, j)?.time;
                if lead <= 0.0 {
                    return Err(RoutingError::Config(format!(
                        "service plus travel time from {} to {} is {}; \
                         customer loops could bypass the depot",
                        inst.code(i),
                        inst.code(j),
                        lead
                    )));
                }
            }
        }
        Ok(())
    }

    /// Multi-vehicle model with capacities and time windows
    pub fn build_cvrptw(&self) -> Result<RouteModel> {
        let inst = self.instance;
        inst.validate_fleet()?;
        if self.strategy == SubtourStrategy::Lazy {
            return Err(RoutingError::Config(
                "lazy subtour separation applies to single-tour models; \
                 the CVRPTW eliminates subtours through time propagation"
                    .to_string(),
            ));
        }
        Self::check_positive_leads(inst)?;

        let n = inst.dimension();
        let m = inst.vehicles.len();
        let depot = inst.depot;

        let derived = Self::derived_big_m(inst)?;
        let big_m = match self.big_m {
            Some(value) if value < derived => {
                return Err(RoutingError::Config(format!(
                    "big-M {} is below the schedule bound {}; feasible routes would be cut off",
                    value, derived
                )));
            }
            Some(value) => value,
            None => derived,
        };

        let mut model = MipModel::new(format!("CVRPTW_{}", inst.name));
        let mut edges = EdgeVars::new(n, m);
        let mut arrival = Vec::with_capacity(m);
        let mut returns = Vec::with_capacity(m);
        let mut used = Vec::with_capacity(m);

        for (k, vehicle) in inst.vehicles.iter().enumerate() {
            let factor = self.weights.edge_factor(vehicle.capacity);
            if factor <= 0.0 {
                return Err(RoutingError::Config(format!(
                    "objective weights give vehicle {} a non-positive distance factor {}",
                    vehicle.id, factor
                )));
            }

            used.push(model.add_binary(
                format!("used_{}", vehicle.id),
                self.weights.fixed_cost_per_capacity * vehicle.capacity,
            ));

            for i in 0..n {
                for j in 0..n {
                    if i != j {
                        let dist = inst.travel(i, j)?.distance;
                        let var = model.add_binary(
                            format!("x_{}_{}_{}", inst.code(i), inst.code(j), vehicle.id),
                            dist * factor,
                        );
                        edges.set(i, j, k, var);
                    }
                }
            }

            let mut times = Vec::with_capacity(n);
            for (i, loc) in inst.locations.iter().enumerate() {
                let (lower, upper) = match loc.window {
                    Some(w) => (w.start, Some(w.end)),
                    None => (0.0, None),
                };
                let name = format!("t_{}_{}", inst.code(i), vehicle.id);
                times.push(model.add_continuous(name, lower, upper));
            }
            arrival.push(times);

            let (lower, upper) = match inst.locations[depot].window {
                Some(w) => (w.start, Some(w.end)),
                None => (0.0, None),
            };
            returns.push(model.add_continuous(format!("return_{}", vehicle.id), lower, upper));
        }

        // Flow balancing: every customer left once and entered once, over all vehicles
        for i in inst.customers() {
            let mut out = LinearExpr::new();
            let mut inc = LinearExpr::new();
            for k in 0..m {
                for j in 0..n {
                    if let Some(var) = edges.get(i, j, k) {
                        out.add(var, 1.0);
                    }
                    if let Some(var) = edges.get(j, i, k) {
                        inc.add(var, 1.0);
                    }
                }
            }
            model.add_constraint(LinearConstraint::new(
                format!("out_{}", inst.code(i)),
                out,
                Sense::Equal,
                1.0,
            ));
            model.add_constraint(LinearConstraint::new(
                format!("in_{}", inst.code(i)),
                inc,
                Sense::Equal,
                1.0,
            ));
        }

        for (k, vehicle) in inst.vehicles.iter().enumerate() {
            // A vehicle leaves every customer it enters
            for i in inst.customers() {
                let mut expr = LinearExpr::new();
                for j in 0..n {
                    if let Some(var) = edges.get(i, j, k) {
                        expr.add(var, 1.0);
                    }
                    if let Some(var) = edges.get(j, i, k) {
                        expr.add(var, -1.0);
                    }
                }
                model.add_constraint(LinearConstraint::new(
                    format!("continuity_{}_{}", inst.code(i), vehicle.id),
                    expr,
                    Sense::Equal,
                    0.0,
                ));
            }

            // A used vehicle leaves the depot once and comes back once
            let mut leave: LinearExpr = inst
                .customers()
                .filter_map(|j| edges.get(depot, j, k))
                .map(|v| (v, 1.0))
                .collect();
            leave.add(used[k], -1.0);
            model.add_constraint(LinearConstraint::new(
                format!("leave_depot_{}", vehicle.id),
                leave,
                Sense::Equal,
                0.0,
            ));
            let mut arrive: LinearExpr = inst
                .customers()
                .filter_map(|i| edges.get(i, depot, k))
                .map(|v| (v, 1.0))
                .collect();
            arrive.add(used[k], -1.0);
            model.add_constraint(LinearConstraint::new(
                format!("arrive_depot_{}", vehicle.id),
                arrive,
                Sense::Equal,
                0.0,
            ));

            // Demand carried out of visited customers fits the truck; an unused truck carries none
            let mut load = LinearExpr::new();
            for i in inst.customers() {
                let demand = inst.demands[i];
                if demand <= 0.0 {
                    continue;
                }
                for j in 0..n {
                    if let Some(var) = edges.get(i, j, k) {
                        load.add(var, demand);
                    }
                }
            }
            load.add(used[k], -vehicle.capacity);
            model.add_constraint(LinearConstraint::new(
                format!("demand_{}", vehicle.id),
                load,
                Sense::LessEq,
                0.0,
            ));

            // used[k] >= x[i][j][k]
            for i in 0..n {
                for j in 0..n {
                    if let Some(var) = edges.get(i, j, k) {
                        let expr = LinearExpr::new().with(used[k], 1.0).with(var, -1.0);
                        model.add_constraint(LinearConstraint::new(
                            format!("linking_{}_{}_{}", inst.code(i), inst.code(j), vehicle.id),
                            expr,
                            Sense::GreaterEq,
                            0.0,
                        ));
                    }
                }
            }

            // t[j] >= t[i] + service(i) + travel(i,j) - M (1 - x[i][j]).
            // Into the depot, return[k] plays t[j].
            for i in 0..n {
                for j in 0..n {
                    let Some(var) = edges.get(i, j, k) else { continue };
                    let lead = inst.service_time(i) + inst.travel(i, j)?.time;
                    let target = if j == depot { returns[k] } else { arrival[k][j] };
                    let expr = LinearExpr::new()
                        .with(target, 1.0)
                        .with(arrival[k][i], -1.0)
                        .with(var, -big_m);
                    model.add_constraint(LinearConstraint::new(
                        format!("service_time_{}_{}_{}", inst.code(i), inst.code(j), vehicle.id),
                        expr,
                        Sense::GreaterEq,
                        lead - big_m,
                    ));
                }
            }
        }

        let built = RouteModel {
            kind: ModelKind::Cvrptw,
            strategy: self.strategy,
            model,
            edges,
            arrival,
            returns,
            used,
            order: vec![None; n],
            depot,
            big_m: Some(big_m),
        };
        log::debug!("Built CVRPTW model (big-M {:.1}): {}", big_m, built.summary());
        Ok(built)
    }

    /// Build the model matching the fleet: a TSP when no vehicle is given, a CVRPTW otherwise
    pub fn build(&self) -> Result<RouteModel> {
        if self.instance.vehicles.is_empty() {
            self.build_tsp()
        } else {
            self.build_cvrptw()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Location, ServiceTimes, TravelCost, TravelMatrix, Vehicle};

    fn uniform(n: usize) -> RoutingInstance {
        let locations = (0..n).map(|i| Location::new(format!("L{}", i))).collect();
        let travel = TravelMatrix::from_fn(n, |_, _| TravelCost::new(10.0, 10.0));
        RoutingInstance::new("uniform", locations, 0, travel)
    }

    fn windowed(n: usize, vehicles: usize) -> RoutingInstance {
        let locations = (0..n)
            .map(|i| Location::with_window(format!("L{}", i), 0.0, 600.0))
            .collect();
        let travel = TravelMatrix::from_fn(n, |_, _| TravelCost::new(5.0, 7.0));
        RoutingInstance::new("windowed", locations, 0, travel)
            .with_vehicles((0..vehicles).map(|k| Vehicle::new(format!("T{}", k), 10.0)).collect())
    }

    #[test]
    fn test_tsp_has_no_self_loops() {
        let inst = uniform(5);
        let rm = RouteModelBuilder::new(&inst).strategy(SubtourStrategy::Lazy).build_tsp().unwrap();
        assert_eq!(rm.model.num_variables(), 20);
        for i in 0..5 {
            assert!(rm.edges.get(i, i, 0).is_none());
        }
        assert_eq!(rm.edges.iter().count(), 20);
        // degree constraints only
        assert_eq!(rm.model.num_constraints(), 10);
    }

    #[test]
    fn test_tsp_mtz_counts() {
        let inst = uniform(5);
        let rm = RouteModelBuilder::new(&inst).build_tsp().unwrap();
        // 20 edges + 4 positions
        assert_eq!(rm.model.num_variables(), 24);
        // 10 degree + 4*3 MTZ
        assert_eq!(rm.model.num_constraints(), 22);
    }

    #[test]
    fn test_building_twice_is_deterministic() {
        let inst = windowed(4, 2);
        let a = RouteModelBuilder::new(&inst).build_cvrptw().unwrap();
        let b = RouteModelBuilder::new(&inst).build_cvrptw().unwrap();
        assert_eq!(a.model.num_variables(), b.model.num_variables());
        assert_eq!(a.model.num_constraints(), b.model.num_constraints());
        let names_a: Vec<&str> = a.model.constraints.iter().map(|c| c.name.as_str()).collect();
        let names_b: Vec<&str> = b.model.constraints.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn test_cvrptw_counts() {
        let inst = windowed(4, 2);
        let rm = RouteModelBuilder::new(&inst).build_cvrptw().unwrap();
        // per vehicle: used + 12 edges + 4 arrivals + return
        assert_eq!(rm.model.num_variables(), 2 * 18);
        // 3 customers * 2 flow
        // + per vehicle (3 continuity + 2 depot + 1 demand + 12 linking + 12 time)
        assert_eq!(rm.model.num_constraints(), 6 + 2 * 30);
        assert_eq!(rm.big_m, Some(600.0 + 60.0 + 7.0));
    }

    #[test]
    fn test_cvrptw_rejects_lazy_strategy() {
        let inst = windowed(4, 1);
        let err = RouteModelBuilder::new(&inst).strategy(SubtourStrategy::Lazy).build_cvrptw();
        assert!(matches!(err, Err(RoutingError::Config(_))));
    }

    #[test]
    fn test_cvrptw_rejects_zero_time_customer_moves() {
        let locations = (0..4).map(|i| Location::new(format!("L{}", i))).collect();
        let travel = TravelMatrix::from_fn(4, |_, _| TravelCost::new(5.0, 0.0));
        let instant = ServiceTimes { customer: 0.0, depot: 60.0 };
        let inst = RoutingInstance::new("instant", locations, 0, travel)
            .with_vehicles(vec![Vehicle::new("T0", 10.0)])
            .with_service_times(instant);
        let err = RouteModelBuilder::new(&inst).build_cvrptw();
        assert!(matches!(
            err,
            Err(RoutingError::Config(ref msg)) if msg.contains("bypass the depot")
        ));

        // a positive service time restores propagation
        let inst = inst.with_service_times(ServiceTimes { customer: 1.0, depot: 60.0 });
        assert!(RouteModelBuilder::new(&inst).build_cvrptw().is_ok());
    }

    #[test]
    fn test_big_m_override_must_dominate_horizon() {
        let inst = windowed(4, 1);
        let err = RouteModelBuilder::new(&inst).big_m(Some(100.0)).build_cvrptw();
        assert!(matches!(err, Err(RoutingError::Config(_))));
        let rm = RouteModelBuilder::new(&inst).big_m(Some(1e5)).build_cvrptw().unwrap();
        assert_eq!(rm.big_m, Some(1e5));
    }

    #[test]
    fn test_cut_constraint_covers_both_directions() {
        let inst = uniform(5);
        let rm = RouteModelBuilder::new(&inst).strategy(SubtourStrategy::Lazy).build_tsp().unwrap();
        let cut = Cut::new(vec![3, 4]);
        let c = rm.cut_constraint(&cut, 0);
        assert_eq!(c.rhs, 1.0);
        assert_eq!(c.sense, Sense::LessEq);
        let vars: Vec<VarId> = c.expr.terms.iter().map(|&(v, _)| v).collect();
        assert_eq!(vars.len(), 2);
        assert!(vars.contains(&rm.edges.get(3, 4, 0).unwrap()));
        assert!(vars.contains(&rm.edges.get(4, 3, 0).unwrap()));
    }

    #[test]
    fn test_tour_values_satisfy_static_model() {
        let inst = uniform(5);
        let mut rm = RouteModelBuilder::new(&inst).build_tsp().unwrap();
        let values = rm.apply_warm_start(&[0, 2, 4, 1, 3]).unwrap();
        assert!(rm.model.first_violation(&values, 1e-6).is_none());
        assert_eq!(rm.model.objective_value(&values), 50.0);
        assert!(rm.tour_values(&[0, 1, 1, 2, 3]).is_err());
        assert!(rm.tour_values(&[1, 0, 2, 3, 4]).is_err());
    }
}
