//! Analytic pre-solve feasibility screening.
//!
//! The checks here are ordered and fail fast: the first violated condition
//! wins and produces a deterministic message, and the solver is never
//! invoked for a request that fails screening. All conditions are
//! *necessary*, not sufficient — a request that passes can still come back
//! INFEASIBLE from the solver.

use crate::model::{Item, Objective};

/// Why a request was rejected before any model work.
#[derive(Debug, Clone, PartialEq)]
pub enum FeasibilityError {
    EmptyInput,
    NonPositiveCapacity(f64),
    NonPositiveMinItems(usize),
    /// Items whose weight alone exceeds the bin capacity, as (index, weight).
    OverweightItems(Vec<(usize, f64)>),
    MinItemsInfeasibleByWeight {
        min_items: usize,
        max_weight: f64,
        capacity: f64,
    },
    MinItemsInfeasibleByCount {
        item_count: usize,
        min_items: usize,
    },
    BalanceBinCountTooSmall(usize),
    BalanceAverageExceedsCapacity {
        average: f64,
        capacity: f64,
    },
    BalanceNotEnoughItems {
        item_count: usize,
        bin_count: usize,
    },
}

impl FeasibilityError {
    pub fn code(&self) -> &'static str {
        match self {
            FeasibilityError::EmptyInput => "empty_input",
            FeasibilityError::NonPositiveCapacity(_) => "non_positive_capacity",
            FeasibilityError::NonPositiveMinItems(_) => "non_positive_min_items",
            FeasibilityError::OverweightItems(_) => "overweight_items",
            FeasibilityError::MinItemsInfeasibleByWeight { .. } => "min_items_infeasible_by_weight",
            FeasibilityError::MinItemsInfeasibleByCount { .. } => "min_items_infeasible_by_count",
            FeasibilityError::BalanceBinCountTooSmall(_) => "balance_bin_count_too_small",
            FeasibilityError::BalanceAverageExceedsCapacity { .. } => {
                "balance_average_exceeds_capacity"
            }
            FeasibilityError::BalanceNotEnoughItems { .. } => "balance_not_enough_items",
        }
    }

    /// Whether this is a malformed-input rejection rather than an analytic
    /// infeasibility of well-formed data.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            FeasibilityError::EmptyInput
                | FeasibilityError::NonPositiveCapacity(_)
                | FeasibilityError::NonPositiveMinItems(_)
                | FeasibilityError::BalanceBinCountTooSmall(_)
        )
    }
}

impl std::fmt::Display for FeasibilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeasibilityError::EmptyInput => {
                write!(f, "Please enter at least one weight")
            }
            FeasibilityError::NonPositiveCapacity(capacity) => {
                write!(f, "Bin capacity must be positive, got: {}", capacity)
            }
            FeasibilityError::NonPositiveMinItems(min_items) => {
                write!(f, "Minimum items per bin must be positive, got: {}", min_items)
            }
            FeasibilityError::OverweightItems(items) => {
                let listing = items
                    .iter()
                    .map(|(index, weight)| format!("item {} ({})", index, weight))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Items exceed the bin capacity on their own: {}", listing)
            }
            FeasibilityError::MinItemsInfeasibleByWeight {
                min_items,
                max_weight,
                capacity,
            } => write!(
                f,
                "{} items of up to weight {} cannot share a bin of capacity {}",
                min_items, max_weight, capacity
            ),
            FeasibilityError::MinItemsInfeasibleByCount {
                item_count,
                min_items,
            } => write!(
                f,
                "{} items cannot fill even one bin with at least {} items",
                item_count, min_items
            ),
            FeasibilityError::BalanceBinCountTooSmall(bin_count) => {
                write!(
                    f,
                    "For balanced bins, you must specify at least 2 bins, got: {}",
                    bin_count
                )
            }
            FeasibilityError::BalanceAverageExceedsCapacity { average, capacity } => {
                write!(
                    f,
                    "Average bin weight {} exceeds the bin capacity {}",
                    average, capacity
                )
            }
            FeasibilityError::BalanceNotEnoughItems {
                item_count,
                bin_count,
            } => write!(
                f,
                "{} items cannot occupy {} bins with at least one item each",
                item_count, bin_count
            ),
        }
    }
}

impl std::error::Error for FeasibilityError {}

/// Screens a request analytically, without any solver call.
///
/// `bin_count` is only consulted when `objective` is `balance_bins`.
pub fn screen(
    items: &[Item],
    capacity: f64,
    min_items_per_bin: usize,
    objective: Objective,
    bin_count: Option<usize>,
) -> Result<(), FeasibilityError> {
    if items.is_empty() {
        return Err(FeasibilityError::EmptyInput);
    }
    if capacity <= 0.0 {
        return Err(FeasibilityError::NonPositiveCapacity(capacity));
    }
    if min_items_per_bin == 0 {
        return Err(FeasibilityError::NonPositiveMinItems(min_items_per_bin));
    }

    let overweight: Vec<(usize, f64)> = items
        .iter()
        .filter(|item| item.weight > capacity)
        .map(|item| (item.index, item.weight))
        .collect();
    if !overweight.is_empty() {
        return Err(FeasibilityError::OverweightItems(overweight));
    }

    let max_weight = items.iter().map(|item| item.weight).fold(0.0, f64::max);
    if min_items_per_bin as f64 * max_weight > capacity {
        return Err(FeasibilityError::MinItemsInfeasibleByWeight {
            min_items: min_items_per_bin,
            max_weight,
            capacity,
        });
    }

    if items.len() / min_items_per_bin < 1 {
        return Err(FeasibilityError::MinItemsInfeasibleByCount {
            item_count: items.len(),
            min_items: min_items_per_bin,
        });
    }

    if objective == Objective::BalanceBins {
        let bin_count = bin_count.unwrap_or(0);
        if bin_count < 2 {
            return Err(FeasibilityError::BalanceBinCountTooSmall(bin_count));
        }

        let total: f64 = items.iter().map(|item| item.weight).sum();
        let average = total / bin_count as f64;
        if average > capacity {
            return Err(FeasibilityError::BalanceAverageExceedsCapacity { average, capacity });
        }

        if items.len() < bin_count {
            return Err(FeasibilityError::BalanceNotEnoughItems {
                item_count: items.len(),
                bin_count,
            });
        }
    }

    Ok(())
}
