//! Solver-independent MIP model.
//!
//! Models are registered here and translated by each backend in
//! [`crate::exact`]. Variables are addressed by dense [`VarId`]s so that
//! solution values can be carried around as plain `Vec<f64>`.

pub mod builder;

pub use builder::*;

use std::fmt;

/// Index of a variable inside a [`MipModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Continuous,
}

#[derive(Debug, Clone)]
pub struct VariableDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    /// `None` means unbounded above
    pub upper: Option<f64>,
    /// Objective coefficient
    pub objective: f64,
    /// Warm start value, if any
    pub start: Option<f64>,
}

/// Linear combination of variables (no constant term: constants live on the right-hand side)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        LinearExpr { terms: Vec::new() }
    }

    pub fn add(&mut self, var: VarId, coef: f64) -> &mut Self {
        self.terms.push((var, coef));
        self
    }

    pub fn with(mut self, var: VarId, coef: f64) -> Self {
        self.terms.push((var, coef));
        self
    }

    /// Evaluate against a full value vector
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.index()]).sum()
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        LinearExpr { terms: iter.into_iter().collect() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEq,
    GreaterEq,
    Equal,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::LessEq => "<=",
            Sense::GreaterEq => ">=",
            Sense::Equal => "==",
        })
    }
}

/// `expr (sense) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(name: impl Into<String>, expr: LinearExpr, sense: Sense, rhs: f64) -> Self {
        LinearConstraint { name: name.into(), expr, sense, rhs }
    }

    /// Check the constraint against a value vector
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        let lhs = self.expr.eval(values);
        match self.sense {
            Sense::LessEq => lhs <= self.rhs + tol,
            Sense::GreaterEq => lhs >= self.rhs - tol,
            Sense::Equal => (lhs - self.rhs).abs() <= tol,
        }
    }
}

/// A minimisation MIP: variables with objective coefficients plus linear constraints
#[derive(Debug, Clone, Default)]
pub struct MipModel {
    pub name: String,
    pub variables: Vec<VariableDef>,
    pub constraints: Vec<LinearConstraint>,
}

impl MipModel {
    pub fn new(name: impl Into<String>) -> Self {
        MipModel { name: name.into(), variables: Vec::new(), constraints: Vec::new() }
    }

    pub fn add_binary(&mut self, name: impl Into<String>, objective: f64) -> VarId {
        self.push_var(VariableDef {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: Some(1.0),
            objective,
            start: None,
        })
    }

    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: Option<f64>,
    ) -> VarId {
        self.push_var(VariableDef {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
            objective: 0.0,
            start: None,
        })
    }

    fn push_var(&mut self, def: VariableDef) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(def);
        id
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    pub fn set_start(&mut self, var: VarId, value: f64) {
        self.variables[var.index()].start = Some(value);
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables.iter().filter(|v| v.kind == VarKind::Binary).count()
    }

    /// Objective value of an assignment
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.variables.iter().zip(values).map(|(v, x)| v.objective * x).sum()
    }

    /// First constraint violated by an assignment, if any
    pub fn first_violation(&self, values: &[f64], tol: f64) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| !c.is_satisfied(values, tol))
    }
}
