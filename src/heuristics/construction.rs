use crate::error::{Result, RoutingError};
use crate::instance::RoutingInstance;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Builds a single tour over every location, used to warm-start the exact search
pub trait ConstructionHeuristic {
    /// Visiting order starting at the depot; the closing leg back to the depot is implicit
    fn construct(&self, instance: &RoutingInstance) -> Result<Vec<usize>>;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the closest unvisited location.
/// The randomized variant picks among the three closest.
pub struct NearestNeighborHeuristic {
    pub randomized: bool,
    pub seed: u64,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic {
            randomized: false,
            seed: 42,
        }
    }

    pub fn randomized(seed: u64) -> Self {
        NearestNeighborHeuristic {
            randomized: true,
            seed,
        }
    }

    fn find_nearest(
        &self,
        instance: &RoutingInstance,
        current: usize,
        visited: &[bool],
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<usize>> {
        let mut candidates = Vec::new();
        for n in (0..instance.dimension()).filter(|&n| !visited[n]) {
            candidates.push((n, instance.travel(current, n)?.distance));
        }

        if candidates.is_empty() {
            return Ok(None);
        }

        candidates.sort_by_key(|&(_, d)| OrderedFloat(d));

        if self.randomized && candidates.len() > 1 {
            let top_k = candidates.len().min(3);
            let idx = rng.gen_range(0..top_k);
            Ok(Some(candidates[idx].0))
        } else {
            Ok(Some(candidates[0].0))
        }
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, instance: &RoutingInstance) -> Result<Vec<usize>> {
        let n = instance.dimension();
        if instance.depot >= n {
            return Err(RoutingError::Config(format!(
                "depot index {} out of range",
                instance.depot
            )));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut tour = vec![instance.depot];
        let mut visited = vec![false; n];
        visited[instance.depot] = true;
        let mut current = instance.depot;

        while let Some(next) = self.find_nearest(instance, current, &visited, &mut rng)? {
            tour.push(next);
            visited[next] = true;
            current = next;
        }

        log::debug!("{} built tour {:?}", self.name(), tour);
        Ok(tour)
    }

    fn name(&self) -> &str {
        if self.randomized {
            "NearestNeighbor-Randomized"
        } else {
            "NearestNeighbor"
        }
    }
}
