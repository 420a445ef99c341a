//! Core packing pipeline: model compilation, solving and projection.
//!
//! This module turns a `PackingRequest` into a mixed-integer program, one
//! encoding per objective:
//! - `min_bins`: minimize the number of used slots
//! - `max_weight`: maximize packed weight with a sequential-fill bias
//! - `max_items`: big-M relaxed fill bias with a scalarized count tie-break
//! - `balance_bins`: linearized absolute deviation from the average fill
//!
//! A raw solver assignment is projected back through the preprocessor's
//! permutation into a validated `PackingResult` with statistics and
//! warnings. The comparison orchestrator runs the pipeline once per
//! objective over a single shared permutation.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::feasibility::{FeasibilityError, screen};
use crate::milp::{
    Comparison, LinearExpr, MilpModel, MilpOutcome, MilpSolver, Sense, SolverStatus, VarDomain,
    VarId,
};
use crate::model::{BinReport, Item, Objective, PackingRequest, PackingResult};
use crate::preprocess::{IndexShuffler, Permutation, reorder};

/// Solver values above this count as a set binary (floating-point slack).
const ASSIGNMENT_TOLERANCE: f64 = 0.5;

/// Before slot j opens under max_weight, slot j-1 must be this full.
const SEQUENTIAL_FILL_RATIO: f64 = 0.8;

/// Relaxed fill bias for max_items, made vacuous for unused slots via big-M.
const RELAXED_FILL_RATIO: f64 = 0.7;

/// Big-M as a multiple of the bin capacity.
const BIG_M_CAPACITY_FACTOR: f64 = 2.0;

/// Scalarization weight of the bin count in the max_items objective.
const BIN_USE_WEIGHT: f64 = 1000.0;

/// Tolerance when checking a reported bin against its capacity.
const CAPACITY_EPSILON: f64 = 1e-6;

/// Tunable parameters of the solve pipeline.
#[derive(Copy, Clone, Debug)]
pub struct SolveOptions {
    /// Wall-clock budget handed to the solver, in milliseconds.
    pub time_limit_ms: u64,
    /// balance_bins warning threshold: maximum tolerated deviation of a bin
    /// from the empirical average, as a ratio.
    pub imbalance_warning_ratio: f64,
}

impl SolveOptions {
    pub const DEFAULT_TIME_LIMIT_MS: u64 = 10_000;
    pub const DEFAULT_IMBALANCE_WARNING_RATIO: f64 = 0.15;

    pub fn builder() -> SolveOptionsBuilder {
        SolveOptionsBuilder::default()
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit_ms: Self::DEFAULT_TIME_LIMIT_MS,
            imbalance_warning_ratio: Self::DEFAULT_IMBALANCE_WARNING_RATIO,
        }
    }
}

/// Builder for `SolveOptions`.
#[derive(Clone, Debug, Default)]
pub struct SolveOptionsBuilder {
    options: SolveOptions,
}

impl SolveOptionsBuilder {
    pub fn time_limit_ms(mut self, value: u64) -> Self {
        self.options.time_limit_ms = value;
        self
    }

    pub fn imbalance_warning_ratio(mut self, value: f64) -> Self {
        self.options.imbalance_warning_ratio = value;
        self
    }

    pub fn build(self) -> SolveOptions {
        self.options
    }
}

/// Terminal failure of one solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// Rejected analytically before any solver call.
    Rejected(FeasibilityError),
    /// The solver finished without a usable assignment.
    Solver(SolverStatus),
    /// The solver reported success, but tolerance filtering left no bins.
    EmptyAfterFiltering,
}

impl SolveError {
    pub fn code(&self) -> &'static str {
        match self {
            SolveError::Rejected(err) => err.code(),
            SolveError::Solver(status) => status.code(),
            SolveError::EmptyAfterFiltering => "result_empty_after_filtering",
        }
    }
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::Rejected(err) => err.fmt(f),
            SolveError::Solver(status) => status.fmt(f),
            SolveError::EmptyAfterFiltering => {
                write!(
                    f,
                    "Solver reported success but no usable assignment survived filtering"
                )
            }
        }
    }
}

impl std::error::Error for SolveError {}

impl From<FeasibilityError> for SolveError {
    fn from(err: FeasibilityError) -> Self {
        SolveError::Rejected(err)
    }
}

/// A compiled program plus the variable handles the projector reads back.
pub struct CompiledModel {
    pub model: MilpModel,
    /// `x[i][j]`: item at solve position i assigned to slot j.
    pub x: Vec<Vec<VarId>>,
    /// `y[j]`: slot j is used.
    pub y: Vec<VarId>,
}

/// Adds the contiguous-prefix symmetry breaking `y[j-1] >= y[j]`.
fn add_prefix_symmetry(model: &mut MilpModel, y: &[VarId]) {
    for j in 1..y.len() {
        let mut expr = LinearExpr::new();
        expr.add_term(y[j - 1], 1.0);
        expr.add_term(y[j], -1.0);
        model.add_constraint(expr, Comparison::GreaterOrEqual, 0.0);
    }
}

/// Adds per-slot item-count variables linked via `count[j] = Σ_i x[i][j]`.
fn add_count_vars(model: &mut MilpModel, x: &[Vec<VarId>]) -> Vec<VarId> {
    let n = x.len();
    (0..n)
        .map(|j| {
            let count = model.add_var(VarDomain::Integer {
                min: 0.0,
                max: n as f64,
            });
            let mut link = LinearExpr::new();
            link.add_term(count, 1.0);
            for row in x {
                link.add_term(row[j], -1.0);
            }
            model.add_constraint(link, Comparison::Equal, 0.0);
            count
        })
        .collect()
}

/// Compiles the mixed-integer program for one objective.
///
/// `items` are the preprocessor's reordered items; n slots are offered,
/// which is always enough bins. Must only be called for a request that
/// passed `screen`.
pub fn compile_model(
    items: &[Item],
    capacity: f64,
    min_items_per_bin: usize,
    objective: Objective,
    bin_count: Option<usize>,
) -> CompiledModel {
    let n = items.len();
    let weights: Vec<f64> = items.iter().map(|item| item.weight).collect();

    let sense = match objective {
        Objective::MaxWeight => Sense::Maximize,
        _ => Sense::Minimize,
    };
    let mut model = MilpModel::new(sense);

    let x: Vec<Vec<VarId>> = (0..n)
        .map(|_| (0..n).map(|_| model.add_var(VarDomain::Binary)).collect())
        .collect();
    let y: Vec<VarId> = (0..n).map(|_| model.add_var(VarDomain::Binary)).collect();
    let fill: Vec<VarId> = (0..n)
        .map(|_| {
            model.add_var(VarDomain::Continuous {
                min: 0.0,
                max: capacity,
            })
        })
        .collect();

    // Each item is assigned to exactly one slot.
    for row in &x {
        model.add_constraint(
            LinearExpr::sum(row.iter().copied()),
            Comparison::Equal,
            1.0,
        );
    }

    for j in 0..n {
        // Weight in a slot never exceeds capacity, and an unused slot is empty.
        let mut cap_expr = LinearExpr::new();
        for i in 0..n {
            cap_expr.add_term(x[i][j], weights[i]);
        }
        cap_expr.add_term(y[j], -capacity);
        model.add_constraint(cap_expr, Comparison::LessOrEqual, 0.0);

        // A used slot holds at least min_items_per_bin items.
        let mut min_expr = LinearExpr::new();
        for i in 0..n {
            min_expr.add_term(x[i][j], 1.0);
        }
        min_expr.add_term(y[j], -(min_items_per_bin as f64));
        model.add_constraint(min_expr, Comparison::GreaterOrEqual, 0.0);

        // fill[j] tracks the assigned weight of slot j.
        let mut fill_expr = LinearExpr::new();
        fill_expr.add_term(fill[j], 1.0);
        for i in 0..n {
            fill_expr.add_term(x[i][j], -weights[i]);
        }
        model.add_constraint(fill_expr, Comparison::Equal, 0.0);
    }

    match objective {
        Objective::MinBins => {
            model.objective = LinearExpr::sum(y.iter().copied());
            add_prefix_symmetry(&mut model, &y);
        }
        Objective::MaxWeight => {
            for i in 0..n {
                for j in 0..n {
                    model.objective.add_term(x[i][j], weights[i]);
                }
            }
            add_prefix_symmetry(&mut model, &y);
            // Sequential-fill bias: slot j only opens once slot j-1 is at
            // least 80% full. A search hint, not a physical requirement; it
            // can exclude some optimal solutions.
            for j in 1..n {
                let mut expr = LinearExpr::new();
                expr.add_term(fill[j - 1], 1.0);
                expr.add_term(y[j], -SEQUENTIAL_FILL_RATIO * capacity);
                model.add_constraint(expr, Comparison::GreaterOrEqual, 0.0);
            }
        }
        Objective::MaxItems => {
            let count = add_count_vars(&mut model, &x);
            add_prefix_symmetry(&mut model, &y);
            // Relaxed fill bias, vacuous when y[j] = 0:
            // fill[j-1] >= 0.7*capacity*y[j] - M*(1 - y[j]).
            let big_m = BIG_M_CAPACITY_FACTOR * capacity;
            for j in 1..n {
                let mut expr = LinearExpr::new();
                expr.add_term(fill[j - 1], 1.0);
                expr.add_term(y[j], -(RELAXED_FILL_RATIO * capacity + big_m));
                model.add_constraint(expr, Comparison::GreaterOrEqual, -big_m);
            }
            // Scalarization: bin-count minimization dominates a
            // position-weighted item-count tie-break that favors packing
            // more items into lower-indexed slots.
            for j in 0..n {
                model.objective.add_term(y[j], BIN_USE_WEIGHT);
                model.objective.add_term(count[j], -((n - j) as f64));
            }
        }
        Objective::BalanceBins => {
            let _count = add_count_vars(&mut model, &x);
            let bin_count = bin_count.expect("balance_bins requires a screened bin count");

            // Exactly the first bin_count slots are used.
            model.add_constraint(
                LinearExpr::sum(y.iter().take(bin_count).copied()),
                Comparison::Equal,
                bin_count as f64,
            );
            for &slot in y.iter().skip(bin_count) {
                model.add_constraint(LinearExpr::sum([slot]), Comparison::Equal, 0.0);
            }

            // dev[j] >= |fill[j] - average|, linearized; the average is a
            // fixed constant computed from the request.
            let total: f64 = weights.iter().sum();
            let average = total / bin_count as f64;
            for j in 0..bin_count {
                let dev = model.add_var(VarDomain::Continuous {
                    min: 0.0,
                    max: capacity,
                });
                let mut above = LinearExpr::new();
                above.add_term(dev, 1.0);
                above.add_term(fill[j], -1.0);
                model.add_constraint(above, Comparison::GreaterOrEqual, -average);

                let mut below = LinearExpr::new();
                below.add_term(dev, 1.0);
                below.add_term(fill[j], 1.0);
                model.add_constraint(below, Comparison::GreaterOrEqual, average);

                model.objective.add_term(dev, 1.0);
            }
        }
    }

    CompiledModel { model, x, y }
}

/// Filters and validates a raw solver assignment into a `PackingResult`.
///
/// Slot usage and assignments are read with a 0.5 tolerance; "used" slots
/// whose item list is empty after filtering are dropped and do not count.
/// Solve-time positions are mapped back to original indices through the
/// permutation.
pub fn project_result(
    original_items: &[Item],
    capacity: f64,
    objective: Objective,
    compiled: &CompiledModel,
    outcome: &MilpOutcome,
    permutation: &Permutation,
    options: &SolveOptions,
) -> Result<PackingResult, SolveError> {
    let n = original_items.len();
    let has_labels = original_items.iter().all(|item| item.label.is_some());

    let mut bins: Vec<BinReport> = Vec::new();
    for (j, &slot) in compiled.y.iter().enumerate() {
        if outcome.value(slot) <= ASSIGNMENT_TOLERANCE {
            continue;
        }

        let mut item_indices: Vec<usize> = Vec::new();
        for position in 0..n {
            if outcome.value(compiled.x[position][j]) > ASSIGNMENT_TOLERANCE {
                item_indices.push(permutation.original_index(position));
            }
        }
        if item_indices.is_empty() {
            // Floating slack artifact: y[j] rounded up with nothing inside.
            continue;
        }

        let item_weights: Vec<f64> = item_indices
            .iter()
            .map(|&index| original_items[index].weight)
            .collect();
        let item_labels = has_labels.then(|| {
            item_indices
                .iter()
                .map(|&index| original_items[index].label.clone().unwrap_or_default())
                .collect()
        });
        let total_weight: f64 = item_weights.iter().sum();

        bins.push(BinReport {
            bin_id: j,
            items: item_indices,
            item_weights,
            item_labels,
            total_weight,
            capacity,
            fill_ratio: total_weight / capacity,
        });
    }

    if bins.is_empty() {
        return Err(SolveError::EmptyAfterFiltering);
    }

    let warning = build_warning(&bins, capacity, objective, outcome.status, options);
    let bin_count = bins.len();

    Ok(PackingResult {
        bins,
        bin_count,
        objective,
        warning,
    })
}

/// Collects the non-fatal warnings for a projected result.
fn build_warning(
    bins: &[BinReport],
    capacity: f64,
    objective: Objective,
    status: SolverStatus,
    options: &SolveOptions,
) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if status == SolverStatus::FeasibleSuboptimal {
        parts.push(status.to_string());
    }

    for bin in bins {
        if bin.total_weight > capacity + CAPACITY_EPSILON {
            parts.push(format!(
                "Bin {} exceeds capacity: {} > {}",
                bin.bin_id, bin.total_weight, capacity
            ));
        }
    }

    if objective == Objective::BalanceBins && !bins.is_empty() {
        // Empirical average of the realized bins, not the planning average.
        let total: f64 = bins.iter().map(|b| b.total_weight).sum();
        let average = total / bins.len() as f64;
        if average > 0.0 {
            let max_deviation = bins
                .iter()
                .map(|b| (b.total_weight - average).abs() / average)
                .fold(0.0, f64::max);
            if max_deviation > options.imbalance_warning_ratio {
                parts.push(format!(
                    "Bin weights deviate up to {:.1}% from the average {:.2} (threshold {:.0}%)",
                    max_deviation * 100.0,
                    average,
                    options.imbalance_warning_ratio * 100.0
                ));
            }
        }
    }

    if parts.is_empty() { None } else { Some(parts.join("; ")) }
}

/// Compiles, solves and projects one already-screened, already-reordered
/// request for one objective.
fn solve_prepared(
    original_items: &[Item],
    working_items: &[Item],
    permutation: &Permutation,
    capacity: f64,
    min_items_per_bin: usize,
    objective: Objective,
    bin_count: Option<usize>,
    solver: &dyn MilpSolver,
    options: &SolveOptions,
) -> Result<(PackingResult, Duration), SolveError> {
    let compiled = compile_model(working_items, capacity, min_items_per_bin, objective, bin_count);
    let outcome = solver.solve(&compiled.model, Duration::from_millis(options.time_limit_ms));
    if !outcome.status.has_assignment() {
        return Err(SolveError::Solver(outcome.status));
    }
    let result = project_result(
        original_items,
        capacity,
        objective,
        &compiled,
        &outcome,
        permutation,
        options,
    )?;
    Ok((result, outcome.elapsed))
}

/// Runs the full pipeline for a single objective:
/// screen → reorder → compile → solve → project.
pub fn solve_request(
    request: &PackingRequest,
    solver: &dyn MilpSolver,
    shuffler: &mut dyn IndexShuffler,
    options: &SolveOptions,
) -> Result<PackingResult, SolveError> {
    screen(
        &request.items,
        request.bin_capacity,
        request.min_items_per_bin,
        request.objective,
        request.bin_count,
    )?;

    let (working_items, permutation) = reorder(&request.items, request.sort_method, shuffler);
    solve_prepared(
        &request.items,
        &working_items,
        &permutation,
        request.bin_capacity,
        request.min_items_per_bin,
        request.objective,
        request.bin_count,
        solver,
        options,
    )
    .map(|(result, _)| result)
}

/// Progress events emitted while comparing objectives, suitable for SSE.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type")]
pub enum CompareEvent {
    StrategyStarted {
        objective: Objective,
    },
    StrategySolved {
        objective: Objective,
        bin_count: usize,
        avg_fill_ratio: f64,
        elapsed_ms: u64,
        warning: Option<String>,
    },
    StrategyFailed {
        objective: Objective,
        error_code: String,
        error: String,
    },
    Finished {
        solved: usize,
        failed: usize,
    },
}

/// Runs every objective over one shared preprocessor output.
///
/// The `objective` and `bin_count` of `base` select nothing here: each
/// strategy is screened and solved independently, and a failing objective
/// never aborts the others. Results are keyed by objective, so completion
/// order is irrelevant.
pub fn compare_all(
    base: &PackingRequest,
    solver: &dyn MilpSolver,
    shuffler: &mut dyn IndexShuffler,
    options: &SolveOptions,
) -> BTreeMap<Objective, Result<PackingResult, SolveError>> {
    compare_all_with_progress(base, solver, shuffler, options, |_| {})
}

/// Like `compare_all`, with a callback per strategy step.
pub fn compare_all_with_progress(
    base: &PackingRequest,
    solver: &dyn MilpSolver,
    shuffler: &mut dyn IndexShuffler,
    options: &SolveOptions,
    mut on_event: impl FnMut(&CompareEvent),
) -> BTreeMap<Objective, Result<PackingResult, SolveError>> {
    // One shared permutation keeps the per-objective results comparable.
    let (working_items, permutation) = reorder(&base.items, base.sort_method, shuffler);

    let mut results = BTreeMap::new();
    let mut solved = 0usize;
    let mut failed = 0usize;

    for objective in Objective::ALL {
        on_event(&CompareEvent::StrategyStarted { objective });

        let outcome = screen(
            &base.items,
            base.bin_capacity,
            base.min_items_per_bin,
            objective,
            base.bin_count,
        )
        .map_err(SolveError::from)
        .and_then(|_| {
            solve_prepared(
                &base.items,
                &working_items,
                &permutation,
                base.bin_capacity,
                base.min_items_per_bin,
                objective,
                base.bin_count,
                solver,
                options,
            )
        });

        match &outcome {
            Ok((result, elapsed)) => {
                solved += 1;
                on_event(&CompareEvent::StrategySolved {
                    objective,
                    bin_count: result.bin_count,
                    avg_fill_ratio: result.average_fill_ratio(),
                    elapsed_ms: elapsed.as_millis() as u64,
                    warning: result.warning.clone(),
                });
            }
            Err(err) => {
                failed += 1;
                on_event(&CompareEvent::StrategyFailed {
                    objective,
                    error_code: err.code().to_string(),
                    error: err.to_string(),
                });
            }
        }
        results.insert(objective, outcome.map(|(result, _)| result));
    }

    on_event(&CompareEvent::Finished { solved, failed });
    results
}
