//! Mixed-integer linear model IR and the pluggable solver seam.
//!
//! The optimizer assembles a `MilpModel` (variables with bounds, linear
//! constraints, a linear objective) and hands it to a `MilpSolver`. The
//! core never implements branch-and-bound itself; any engine that honors
//! the trait contract is substitutable. The bundled `GoodLpSolver` runs
//! the pure-Rust microlp backend through `good_lp`.

use std::time::{Duration, Instant};

use good_lp::{
    Expression, ResolutionError, Solution, SolverModel, Variable, default_solver, variable,
    variables,
};

/// Handle to a variable inside one `MilpModel`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarId(pub usize);

/// Domain and bounds of a decision variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VarDomain {
    Binary,
    Integer { min: f64, max: f64 },
    Continuous { min: f64, max: f64 },
}

/// A linear expression `Σ coeff·var + constant`.
#[derive(Clone, Debug, Default)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `coeff·var` to the expression.
    pub fn add_term(&mut self, var: VarId, coeff: f64) -> &mut Self {
        self.terms.push((var, coeff));
        self
    }

    /// Sum of the given variables with coefficient 1.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        let mut expr = Self::new();
        for var in vars {
            expr.add_term(var, 1.0);
        }
        expr
    }
}

/// Relation between a linear expression and its right-hand side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    LessOrEqual,
    GreaterOrEqual,
    Equal,
}

/// One linear constraint `expr cmp rhs`.
#[derive(Clone, Debug)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub cmp: Comparison,
    pub rhs: f64,
}

/// Direction of the objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// An assembled mixed-integer program.
#[derive(Clone, Debug)]
pub struct MilpModel {
    vars: Vec<VarDomain>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: LinearExpr,
    pub sense: Sense,
}

impl MilpModel {
    pub fn new(sense: Sense) -> Self {
        Self {
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
            sense,
        }
    }

    pub fn add_var(&mut self, domain: VarDomain) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(domain);
        id
    }

    pub fn add_constraint(&mut self, expr: LinearExpr, cmp: Comparison, rhs: f64) {
        self.constraints.push(LinearConstraint { expr, cmp, rhs });
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn domains(&self) -> &[VarDomain] {
        &self.vars
    }
}

/// Terminal state a solver run can end in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    Optimal,
    /// A feasible assignment was found but optimality was not proven.
    FeasibleSuboptimal,
    Infeasible,
    Unbounded,
    /// The wall-clock budget expired before any assignment was found.
    TimedOut,
    Unknown,
}

impl SolverStatus {
    pub fn code(&self) -> &'static str {
        match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::FeasibleSuboptimal => "feasible_suboptimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
            SolverStatus::TimedOut => "not_solved",
            SolverStatus::Unknown => "unknown",
        }
    }

    /// Whether the solver produced a variable assignment worth reading.
    pub fn has_assignment(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::FeasibleSuboptimal)
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::Optimal => write!(f, "Optimal solution found"),
            SolverStatus::FeasibleSuboptimal => {
                write!(f, "Feasible solution found, optimality not proven")
            }
            SolverStatus::Infeasible => write!(f, "Solver reported the model infeasible"),
            SolverStatus::Unbounded => write!(f, "Solver reported the model unbounded"),
            SolverStatus::TimedOut => {
                write!(f, "Time limit exceeded before a solution was found")
            }
            SolverStatus::Unknown => write!(f, "Solver returned an unknown status"),
        }
    }
}

/// Result of one solver invocation.
///
/// `values` is indexed by `VarId` and only meaningful when
/// `status.has_assignment()` holds.
#[derive(Clone, Debug)]
pub struct MilpOutcome {
    pub status: SolverStatus,
    pub values: Vec<f64>,
    pub elapsed: Duration,
}

impl MilpOutcome {
    /// Value of the variable, or 0.0 when the backend returned a shorter
    /// assignment vector than the model has variables.
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }
}

/// Solver collaborator: model in, status plus assignment out.
///
/// `time_limit` is a wall-clock budget; engines that support deadlines
/// report `TimedOut` on expiry, others treat it as advisory.
///
/// When the returned status satisfies `has_assignment()`, `values` must
/// hold one entry per model variable, indexed by `VarId`; missing entries
/// are read as 0.0.
pub trait MilpSolver {
    fn solve(&self, model: &MilpModel, time_limit: Duration) -> MilpOutcome;
}

/// Bundled backend running `good_lp` with the microlp engine.
///
/// microlp solves to proven optimality and has no deadline support, so a
/// successful run always reports `Optimal`; the budget is advisory here.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoodLpSolver;

impl MilpSolver for GoodLpSolver {
    fn solve(&self, model: &MilpModel, _time_limit: Duration) -> MilpOutcome {
        let started = Instant::now();

        let mut vars = variables!();
        let handles: Vec<Variable> = model
            .domains()
            .iter()
            .map(|domain| match domain {
                VarDomain::Binary => vars.add(variable().binary()),
                VarDomain::Integer { min, max } => {
                    vars.add(variable().integer().min(*min).max(*max))
                }
                VarDomain::Continuous { min, max } => vars.add(variable().min(*min).max(*max)),
            })
            .collect();

        let mut objective = Expression::with_capacity(model.objective.terms.len());
        for &(var, coeff) in &model.objective.terms {
            objective.add_mul(coeff, handles[var.0]);
        }
        let objective = objective + model.objective.constant;

        let mut problem = match model.sense {
            Sense::Minimize => vars.minimise(objective).using(default_solver),
            Sense::Maximize => vars.maximise(objective).using(default_solver),
        };

        for constraint in &model.constraints {
            let mut expr = Expression::with_capacity(constraint.expr.terms.len());
            for &(var, coeff) in &constraint.expr.terms {
                expr.add_mul(coeff, handles[var.0]);
            }
            let expr = expr + constraint.expr.constant;
            problem = problem.with(match constraint.cmp {
                Comparison::LessOrEqual => expr.leq(constraint.rhs),
                Comparison::GreaterOrEqual => expr.geq(constraint.rhs),
                Comparison::Equal => expr.eq(constraint.rhs),
            });
        }

        match problem.solve() {
            Ok(solution) => MilpOutcome {
                status: SolverStatus::Optimal,
                values: handles.iter().map(|&v| solution.value(v)).collect(),
                elapsed: started.elapsed(),
            },
            Err(err) => {
                let status = match err {
                    ResolutionError::Infeasible => SolverStatus::Infeasible,
                    ResolutionError::Unbounded => SolverStatus::Unbounded,
                    _ => SolverStatus::Unknown,
                };
                MilpOutcome {
                    status,
                    values: Vec::new(),
                    elapsed: started.elapsed(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: Duration = Duration::from_secs(10);

    #[test]
    fn var_ids_are_dense() {
        let mut model = MilpModel::new(Sense::Minimize);
        let a = model.add_var(VarDomain::Binary);
        let b = model.add_var(VarDomain::Continuous { min: 0.0, max: 5.0 });
        assert_eq!(a, VarId(0));
        assert_eq!(b, VarId(1));
        assert_eq!(model.var_count(), 2);
    }

    #[test]
    fn solves_a_tiny_knapsack() {
        // Pick binaries to maximize 3a + 2b + 2c with a + b + c <= 2.
        let mut model = MilpModel::new(Sense::Maximize);
        let a = model.add_var(VarDomain::Binary);
        let b = model.add_var(VarDomain::Binary);
        let c = model.add_var(VarDomain::Binary);
        model.objective.add_term(a, 3.0);
        model.objective.add_term(b, 2.0);
        model.objective.add_term(c, 2.0);
        model.add_constraint(LinearExpr::sum([a, b, c]), Comparison::LessOrEqual, 2.0);

        let outcome = GoodLpSolver.solve(&model, BUDGET);
        assert_eq!(outcome.status, SolverStatus::Optimal);
        assert!(outcome.value(a) > 0.5);
        let chosen = [a, b, c]
            .iter()
            .filter(|&&v| outcome.value(v) > 0.5)
            .count();
        assert_eq!(chosen, 2);
    }

    #[test]
    fn respects_equality_and_continuous_bounds() {
        // Minimize x subject to x = 4.5 within [0, 10].
        let mut model = MilpModel::new(Sense::Minimize);
        let x = model.add_var(VarDomain::Continuous { min: 0.0, max: 10.0 });
        model.objective.add_term(x, 1.0);
        model.add_constraint(LinearExpr::sum([x]), Comparison::Equal, 4.5);

        let outcome = GoodLpSolver.solve(&model, BUDGET);
        assert_eq!(outcome.status, SolverStatus::Optimal);
        assert!((outcome.value(x) - 4.5).abs() < 1e-6);
    }

    #[test]
    fn reports_infeasible_without_assignment() {
        // x >= 2 and x <= 1 cannot both hold.
        let mut model = MilpModel::new(Sense::Minimize);
        let x = model.add_var(VarDomain::Continuous { min: 0.0, max: 10.0 });
        model.objective.add_term(x, 1.0);
        model.add_constraint(LinearExpr::sum([x]), Comparison::GreaterOrEqual, 2.0);
        model.add_constraint(LinearExpr::sum([x]), Comparison::LessOrEqual, 1.0);

        let outcome = GoodLpSolver.solve(&model, BUDGET);
        assert_eq!(outcome.status, SolverStatus::Infeasible);
        assert!(outcome.values.is_empty());
        assert!(!outcome.status.has_assignment());
    }

    #[test]
    fn short_assignment_vectors_read_as_zero() {
        let outcome = MilpOutcome {
            status: SolverStatus::Optimal,
            values: vec![1.0],
            elapsed: Duration::ZERO,
        };
        assert!((outcome.value(VarId(0)) - 1.0).abs() < 1e-12);
        assert_eq!(outcome.value(VarId(5)), 0.0);
    }

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(SolverStatus::Optimal.code(), "optimal");
        assert_eq!(SolverStatus::TimedOut.code(), "not_solved");
        assert_eq!(SolverStatus::Infeasible.code(), "infeasible");
        assert!(SolverStatus::FeasibleSuboptimal.has_assignment());
        assert!(!SolverStatus::Unbounded.has_assignment());
    }
}
