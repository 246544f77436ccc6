//! Subtour separation for the lazy elimination strategy.
//!
//! An integral candidate of the degree-constrained TSP relaxation is a set of
//! disjoint cycles. The oracle splits it into those cycles and, when there is
//! more than one, returns the shortest as a subtour-elimination cut
//! `sum x[i][j] (i != j in S) <= |S| - 1`.

use crate::error::{Result, RoutingError};
use crate::model::EdgeVars;
use std::collections::HashSet;
use std::sync::Mutex;

/// Selected edges (value > 0.5) of an integral candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeAssignment {
    num_locations: usize,
    edges: Vec<(usize, usize)>,
}

impl EdgeAssignment {
    pub fn new(num_locations: usize, edges: Vec<(usize, usize)>) -> Self {
        EdgeAssignment { num_locations, edges }
    }

    /// Read the selected edges of vehicle `k` from a value vector
    pub fn from_values(vars: &EdgeVars, values: &[f64], k: usize) -> Self {
        EdgeAssignment::new(vars.num_locations(), vars.selected(values, k))
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    fn successors(&self) -> Vec<Vec<usize>> {
        let mut succ = vec![Vec::new(); self.num_locations];
        for &(i, j) in &self.edges {
            if i < self.num_locations && j < self.num_locations {
                succ[i].push(j);
            }
        }
        succ
    }
}

/// Subtour-elimination cut over a component `S`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    component: Vec<usize>,
}

impl Cut {
    pub fn new(component: Vec<usize>) -> Self {
        Cut { component }
    }

    /// Locations of the forbidden subtour, in visiting order
    pub fn component(&self) -> &[usize] {
        &self.component
    }

    pub fn len(&self) -> usize {
        self.component.len()
    }

    pub fn is_empty(&self) -> bool {
        self.component.is_empty()
    }

    /// Right-hand side `|S| - 1`
    pub fn rhs(&self) -> f64 {
        self.component.len().saturating_sub(1) as f64
    }

    /// Number of selected edges with both endpoints in `S`
    pub fn inner_edges(&self, candidate: &EdgeAssignment) -> usize {
        let members: HashSet<usize> = self.component.iter().copied().collect();
        candidate
            .edges()
            .iter()
            .filter(|(i, j)| i != j && members.contains(i) && members.contains(j))
            .count()
    }

    pub fn is_violated_by(&self, candidate: &EdgeAssignment) -> bool {
        self.inner_edges(candidate) as f64 > self.rhs()
    }

    fn key(&self) -> Vec<usize> {
        let mut key = self.component.clone();
        key.sort_unstable();
        key
    }
}

/// Callback invoked on every integral candidate found by the search
pub trait SeparationOracle {
    /// Return a violated cut, or `None` when the candidate is acceptable
    fn on_integral_candidate(&self, candidate: &EdgeAssignment) -> Option<Cut>;
}

/// Shortest-subtour separation
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtourOracle;

impl SubtourOracle {
    pub fn new() -> Self {
        SubtourOracle
    }

    /// Partition the locations into the cycles traced by the selected out-edges.
    /// Every location ends up in exactly one component.
    pub fn components(candidate: &EdgeAssignment) -> Vec<Vec<usize>> {
        let n = candidate.num_locations();
        let succ = candidate.successors();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut cycle = Vec::new();
            let mut current = Some(start);
            while let Some(node) = current {
                visited[node] = true;
                cycle.push(node);
                current = succ[node].iter().copied().find(|&j| !visited[j]);
            }
            components.push(cycle);
        }
        components
    }

    /// Shortest component (first found among equals); all locations when the
    /// candidate is a single cycle
    pub fn shortest_subtour(candidate: &EdgeAssignment) -> Vec<usize> {
        let mut best: Vec<usize> = (0..candidate.num_locations()).collect();
        for cycle in Self::components(candidate) {
            if cycle.len() < best.len() {
                best = cycle;
            }
        }
        best
    }
}

impl SeparationOracle for SubtourOracle {
    fn on_integral_candidate(&self, candidate: &EdgeAssignment) -> Option<Cut> {
        let tour = Self::shortest_subtour(candidate);
        if tour.len() < candidate.num_locations() {
            Some(Cut::new(tour))
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
struct CutStoreInner {
    cuts: Vec<Cut>,
    keys: HashSet<Vec<usize>>,
}

/// Cuts added during a run. Grows monotonically; cuts are never removed.
#[derive(Debug, Default)]
pub struct CutStore {
    inner: Mutex<CutStoreInner>,
}

impl CutStore {
    pub fn new() -> Self {
        CutStore::default()
    }

    /// Decompose a candidate and record the resulting cut, as one critical section.
    ///
    /// Returns the cut and its index in the store, or `None` when the candidate
    /// has no subtour. A cut that is already stored means the backend returned
    /// a candidate violating a previously added constraint.
    pub fn separate<O>(
        &self,
        oracle: &O,
        candidate: &EdgeAssignment,
    ) -> Result<Option<(usize, Cut)>>
    where
        O: SeparationOracle + ?Sized,
    {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| RoutingError::Backend("cut store lock poisoned".to_string()))?;
        let Some(cut) = oracle.on_integral_candidate(candidate) else {
            return Ok(None);
        };
        if !inner.keys.insert(cut.key()) {
            return Err(RoutingError::DuplicateCut(cut.component().to_vec()));
        }
        let index = inner.cuts.len();
        inner.cuts.push(cut.clone());
        log::debug!("Subtour cut #{} over {:?}", index, cut.component());
        Ok(Some((index, cut)))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.cuts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the stored cuts, in insertion order
    pub fn snapshot(&self) -> Vec<Cut> {
        self.inner.lock().map(|inner| inner.cuts.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A: usize = 0;
    const B: usize = 1;
    const C: usize = 2;
    const D: usize = 3;
    const E: usize = 4;

    fn cycle_edges(cycle: &[usize]) -> Vec<(usize, usize)> {
        (0..cycle.len()).map(|p| (cycle[p], cycle[(p + 1) % cycle.len()])).collect()
    }

    #[test]
    fn test_two_components_yield_smaller_cut() {
        let mut edges = cycle_edges(&[A, B, C]);
        edges.extend(cycle_edges(&[D, E]));
        let candidate = EdgeAssignment::new(5, edges);

        let components = SubtourOracle::components(&candidate);
        assert_eq!(components.len(), 2);

        let cut = SubtourOracle.on_integral_candidate(&candidate).expect("violation expected");
        let mut members = cut.component().to_vec();
        members.sort();
        assert_eq!(members, vec![D, E]);
        assert_eq!(cut.rhs(), 1.0);
        // D->E and E->D together exceed the bound
        assert!(cut.is_violated_by(&candidate));
        assert!(!cut.is_violated_by(&EdgeAssignment::new(5, vec![(D, E)])));
        assert!(!cut.is_violated_by(&EdgeAssignment::new(5, vec![(E, D)])));
    }

    #[test]
    fn test_hamiltonian_cycle_has_no_violation() {
        let candidate = EdgeAssignment::new(5, cycle_edges(&[A, C, E, B, D]));
        assert_eq!(SubtourOracle::components(&candidate).len(), 1);
        assert!(SubtourOracle.on_integral_candidate(&candidate).is_none());
    }

    #[test]
    fn test_cut_store_records_each_cut_once() {
        let store = CutStore::new();
        let mut edges = cycle_edges(&[A, B, C]);
        edges.extend(cycle_edges(&[D, E]));
        let candidate = EdgeAssignment::new(5, edges);

        let (index, _) = store.separate(&SubtourOracle, &candidate).unwrap().unwrap();
        assert_eq!(index, 0);
        assert_eq!(store.len(), 1);

        assert!(matches!(
            store.separate(&SubtourOracle, &candidate),
            Err(RoutingError::DuplicateCut(_))
        ));
        assert_eq!(store.len(), 1);

        let tour = EdgeAssignment::new(5, cycle_edges(&[A, B, C, D, E]));
        assert!(store.separate(&SubtourOracle, &tour).unwrap().is_none());
        assert_eq!(store.snapshot().len(), 1);
    }

    fn split_into_cycles(order: &[usize], splits: &[bool]) -> Vec<Vec<usize>> {
        let mut cycles = Vec::new();
        let mut current = Vec::new();
        for (pos, &node) in order.iter().enumerate() {
            current.push(node);
            let remaining = order.len() - pos - 1;
            if splits[pos] && current.len() >= 2 && remaining >= 2 {
                cycles.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            cycles.push(current);
        }
        cycles
    }

    proptest! {
        #[test]
        fn prop_components_match_generated_cycles(
            (order, splits) in (2usize..12).prop_flat_map(|n| (
                Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
                proptest::collection::vec(any::<bool>(), n),
            ))
        ) {
            let n = order.len();
            let cycles = split_into_cycles(&order, &splits);
            let edges: Vec<(usize, usize)> = cycles.iter().flat_map(|c| cycle_edges(c)).collect();
            let candidate = EdgeAssignment::new(n, edges);

            let mut found: Vec<Vec<usize>> = SubtourOracle::components(&candidate)
                .into_iter()
                .map(|mut c| { c.sort(); c })
                .collect();
            found.sort();
            let mut expected: Vec<Vec<usize>> = cycles
                .iter()
                .cloned()
                .map(|mut c| { c.sort(); c })
                .collect();
            expected.sort();
            prop_assert_eq!(found, expected);

            let shortest = cycles.iter().map(|c| c.len()).min().unwrap_or(n);
            match SubtourOracle.on_integral_candidate(&candidate) {
                Some(cut) => {
                    prop_assert!(cycles.len() > 1);
                    prop_assert_eq!(cut.len(), shortest);
                    prop_assert!(cut.is_violated_by(&candidate));
                }
                None => prop_assert_eq!(cycles.len(), 1),
            }
        }
    }
}
