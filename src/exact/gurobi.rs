//! Gurobi backend (requires the `gurobi` feature and a licensed installation).
//!
//! Unlike microlp, Gurobi calls back on every new integral solution, so the
//! lazy hook is wired into a `MIPSol` callback and cuts are added while the
//! branch-and-bound tree is alive.

use super::{BackendOutcome, BackendStatus, LazyConstraints, MipBackend, SolveLimits};
use crate::error::{Result, RoutingError};
use crate::model::{LinearConstraint, MipModel, Sense, VarKind};
use grb::constr::IneqExpr;
use grb::prelude::*;

#[derive(Debug, Default)]
pub struct GurobiBackend;

impl GurobiBackend {
    pub fn new() -> Self {
        GurobiBackend
    }
}

fn grb_err(context: &str) -> impl Fn(grb::Error) -> RoutingError + '_ {
    move |e| RoutingError::Backend(format!("{}: {}", context, e))
}

fn inequality(c: &LinearConstraint, vars: &[Var]) -> IneqExpr {
    let lhs: Expr = c.expr.terms.iter().map(|&(v, coef)| coef * vars[v.index()]).grb_sum();
    let rhs = c.rhs;
    match c.sense {
        Sense::LessEq => c!(lhs <= rhs),
        Sense::GreaterEq => c!(lhs >= rhs),
        Sense::Equal => c!(lhs == rhs),
    }
}

/// Forwards integral solutions to the lazy hook
struct LazyCallback<'a> {
    lazy: &'a dyn LazyConstraints,
    vars: &'a [Var],
    cuts: usize,
    error: Option<RoutingError>,
}

impl<'a> grb::callback::Callback for LazyCallback<'a> {
    fn callback(&mut self, w: grb::callback::Where) -> grb::callback::CbResult {
        if let grb::callback::Where::MIPSol(ctx) = w {
            let values = ctx.get_solution(self.vars)?;
            match self.lazy.separate(&values) {
                Ok(Some(cut)) => {
                    log::debug!("Gurobi callback: adding lazy constraint {}", cut.name);
                    ctx.add_lazy(inequality(&cut, self.vars))?;
                    self.cuts += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    self.error = Some(e);
                    ctx.terminate();
                }
            }
        }
        Ok(())
    }
}

impl MipBackend for GurobiBackend {
    fn name(&self) -> &str {
        "gurobi"
    }

    fn supports_lazy_constraints(&self) -> bool {
        true
    }

    fn solve(
        &mut self,
        model: &MipModel,
        limits: &SolveLimits,
        lazy: Option<&dyn LazyConstraints>,
    ) -> Result<BackendOutcome> {
        let env = Env::new("").map_err(grb_err("Failed to create Gurobi environment"))?;
        let mut lp = Model::with_env(&model.name, env).map_err(grb_err("Failed to create model"))?;

        lp.set_param(param::TimeLimit, limits.time_limit.as_secs_f64())
            .map_err(grb_err("Failed to set time limit"))?;
        lp.set_param(param::MIPGap, limits.mip_gap)
            .map_err(grb_err("Failed to set MIP gap"))?;
        lp.set_param(param::Threads, limits.threads)
            .map_err(grb_err("Failed to set threads"))?;
        if lazy.is_some() {
            lp.set_param(param::LazyConstraints, 1)
                .map_err(grb_err("Failed to enable lazy constraints"))?;
        }
        if !limits.verbose {
            lp.set_param(param::OutputFlag, 0)
                .map_err(grb_err("Failed to set output flag"))?;
        }

        let mut vars = Vec::with_capacity(model.num_variables());
        for def in &model.variables {
            let (vtype, lower, upper) = match def.kind {
                VarKind::Binary => (VarType::Binary, 0.0, 1.0),
                VarKind::Continuous => {
                    (VarType::Continuous, def.lower, def.upper.unwrap_or(grb::INFINITY))
                }
            };
            let var = lp
                .add_var(&def.name, vtype, def.objective, lower, upper, std::iter::empty())
                .map_err(grb_err("Failed to add variable"))?;
            vars.push(var);
        }
        lp.update().map_err(grb_err("Failed to update model"))?;

        for c in &model.constraints {
            lp.add_constr(&c.name, inequality(c, &vars))
                .map_err(grb_err("Failed to add constraint"))?;
        }
        for (def, var) in model.variables.iter().zip(&vars) {
            if let Some(start) = def.start {
                lp.set_obj_attr(attr::Start, var, start)
                    .map_err(grb_err("Failed to set warm start"))?;
            }
        }
        lp.update().map_err(grb_err("Failed to update model before optimization"))?;

        match lazy {
            Some(lazy) => {
                let mut callback = LazyCallback { lazy, vars: &vars, cuts: 0, error: None };
                lp.optimize_with_callback(&mut callback)
                    .map_err(grb_err("Optimization failed"))?;
                if let Some(e) = callback.error {
                    return Err(e);
                }
                log::info!("Gurobi added {} lazy constraints", callback.cuts);
            }
            None => lp.optimize().map_err(grb_err("Optimization failed"))?,
        }

        let status = lp.status().map_err(grb_err("Failed to get status"))?;
        let status = match status {
            Status::Optimal => BackendStatus::Optimal,
            Status::Infeasible | Status::InfOrUnbd => BackendStatus::Infeasible,
            Status::Unbounded => BackendStatus::Unbounded,
            Status::TimeLimit
            | Status::NodeLimit
            | Status::SolutionLimit
            | Status::Interrupted => BackendStatus::TimeLimit,
            other => {
                return Err(RoutingError::Backend(format!(
                    "Unexpected Gurobi status {:?}",
                    other
                )))
            }
        };

        let solutions = lp
            .get_attr(attr::SolCount)
            .map_err(grb_err("Failed to read solution count"))?;
        if solutions == 0 {
            return Ok(BackendOutcome::without_solution(status));
        }

        let values = lp.get_obj_attr_batch(attr::X, vars.clone())
            .map_err(grb_err("Failed to read solution"))?;
        let objective = lp.get_attr(attr::ObjVal).ok();
        let bound = lp.get_attr(attr::ObjBound).ok();
        let nodes = lp.get_attr(attr::NodeCount).ok().map(|n| n as u64);

        Ok(BackendOutcome {
            status,
            values: Some(values),
            objective,
            bound,
            nodes,
        })
    }
}
