//! Pure-Rust backend built on `good_lp` with the `microlp` solver.
//!
//! microlp runs its own branch-and-bound but offers no callback hook and no
//! time limit. Lazy constraints are separated by the driver between complete
//! solves, and each solve runs on a worker thread that is abandoned once the
//! time budget of the round is spent.

use super::{BackendOutcome, BackendStatus, LazyConstraints, MipBackend, SolveLimits};
use crate::error::{Result, RoutingError};
use crate::model::{LinearConstraint, MipModel, Sense, VarKind};
use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

#[derive(Debug, Default)]
pub struct MicrolpBackend;

impl MicrolpBackend {
    pub fn new() -> Self {
        MicrolpBackend
    }
}

fn linear(terms: impl Iterator<Item = (Variable, f64)>) -> Expression {
    terms.map(|(var, coef)| var * coef).sum()
}

fn translate(c: &LinearConstraint, handles: &[Variable]) -> Constraint {
    let terms = |sign: f64| {
        c.expr
            .terms
            .iter()
            .map(move |&(v, k)| (handles[v.index()], sign * k))
    };
    match c.sense {
        Sense::LessEq => constraint::leq(linear(terms(1.0)), c.rhs),
        // a >= b is written -a <= -b
        Sense::GreaterEq => constraint::leq(linear(terms(-1.0)), -c.rhs),
        Sense::Equal => constraint::eq(linear(terms(1.0)), c.rhs),
    }
}

/// Translate and solve a model to completion
fn solve_model(model: &MipModel) -> Result<BackendOutcome> {
    let mut vars = ProblemVariables::new();
    let mut handles = Vec::with_capacity(model.num_variables());
    for def in &model.variables {
        let mut definition = variable().name(def.name.clone());
        definition = match def.kind {
            VarKind::Binary => definition.binary(),
            VarKind::Continuous => {
                let bounded = definition.min(def.lower);
                match def.upper {
                    Some(upper) => bounded.max(upper),
                    None => bounded,
                }
            }
        };
        handles.push(vars.add(definition));
    }

    let objective = linear(
        model
            .variables
            .iter()
            .zip(&handles)
            .map(|(def, &var)| (var, def.objective)),
    );
    let mut problem = vars.minimise(objective).using(microlp);
    for c in &model.constraints {
        problem.add_constraint(translate(c, &handles));
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = handles.iter().map(|&var| solution.value(var)).collect();
            let objective = model.objective_value(&values);
            Ok(BackendOutcome {
                status: BackendStatus::Optimal,
                values: Some(values),
                objective: Some(objective),
                bound: Some(objective),
                nodes: None,
            })
        }
        Err(ResolutionError::Infeasible) => {
            Ok(BackendOutcome::without_solution(BackendStatus::Infeasible))
        }
        Err(ResolutionError::Unbounded) => {
            Ok(BackendOutcome::without_solution(BackendStatus::Unbounded))
        }
        Err(e) => Err(RoutingError::Backend(format!("microlp failed: {}", e))),
    }
}

impl MipBackend for MicrolpBackend {
    fn name(&self) -> &str {
        "microlp"
    }

    fn supports_lazy_constraints(&self) -> bool {
        false
    }

    fn solve(
        &mut self,
        model: &MipModel,
        limits: &SolveLimits,
        lazy: Option<&dyn LazyConstraints>,
    ) -> Result<BackendOutcome> {
        if lazy.is_some() {
            log::trace!("microlp has no callback hook; candidates are separated by the driver");
        }
        log::trace!("microlp ignores the {} gap of this round", limits.mip_gap);

        let (sender, receiver) = mpsc::channel();
        let owned = model.clone();
        thread::Builder::new()
            .name("microlp".to_string())
            .spawn(move || {
                // the receiver is gone when the round timed out
                let _ = sender.send(solve_model(&owned));
            })
            .map_err(RoutingError::Io)?;

        match receiver.recv_timeout(limits.time_limit) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "microlp did not finish within {:.3}s; abandoning the solve",
                    limits.time_limit.as_secs_f64()
                );
                Ok(BackendOutcome::without_solution(BackendStatus::TimeLimit))
            }
            Err(RecvTimeoutError::Disconnected) => Err(RoutingError::Backend(
                "microlp worker stopped without a result".to_string(),
            )),
        }
    }
}
