//! Data model for the weight-based bin packing service.
//!
//! This module defines the structures a packing request is made of and the
//! labeled result the solver pipeline produces:
//! - `Item`: a weighted unit to assign, with an optional label
//! - `PackingRequest`: the full problem description for one solve
//! - `BinReport` / `PackingResult`: the validated, projected outcome
//!
//! Everything here is transient per request; nothing persists beyond one
//! screen → preprocess → compile → solve → project cycle.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Validation error for request data.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidWeight { index: usize, value: f64 },
    InvalidBinCount(usize),
    MissingBinCount,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidWeight { index, value } => {
                write!(f, "Weight at index {} must be positive, got: {}", index, value)
            }
            ValidationError::InvalidBinCount(count) => {
                write!(f, "Bin count must be positive, got: {}", count)
            }
            ValidationError::MissingBinCount => {
                write!(f, "Objective balance_bins requires a bin count")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Helper to validate a single weight value.
fn validate_weight_value(index: usize, value: f64) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight { index, value });
    }
    Ok(())
}

/// A weighted unit to assign to a bin.
///
/// # Fields
/// * `index` - Position of the item in the original request order
/// * `weight` - Positive weight of the item
/// * `label` - Optional human-readable label that travels with the item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub index: usize,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Item {
    /// Creates a new item; the weight must be positive and finite.
    pub fn new(index: usize, weight: f64, label: Option<String>) -> Result<Self, ValidationError> {
        validate_weight_value(index, weight)?;
        Ok(Self { index, weight, label })
    }
}

/// Selects which constraints and objective the model compiler assembles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MinBins,
    MaxWeight,
    MaxItems,
    BalanceBins,
}

impl Objective {
    /// All objectives, in the order the comparison endpoint reports them.
    pub const ALL: [Objective; 4] = [
        Objective::MinBins,
        Objective::MaxWeight,
        Objective::MaxItems,
        Objective::BalanceBins,
    ];

    /// Whether this objective needs a fixed bin count.
    pub fn requires_bin_count(&self) -> bool {
        matches!(self, Objective::BalanceBins)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::MinBins => "min_bins",
            Objective::MaxWeight => "max_weight",
            Objective::MaxItems => "max_items",
            Objective::BalanceBins => "balance_bins",
        }
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How item order is permuted before the model is compiled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortMethod {
    #[default]
    None,
    Asc,
    Desc,
    Random,
}

/// A complete packing problem for one solve.
///
/// Original request order is the reporting order: whatever permutation the
/// preprocessor applies, the result always refers to these item indices.
#[derive(Clone, Debug)]
pub struct PackingRequest {
    pub items: Vec<Item>,
    pub bin_capacity: f64,
    pub objective: Objective,
    pub min_items_per_bin: usize,
    pub bin_count: Option<usize>,
    pub sort_method: SortMethod,
}

impl PackingRequest {
    /// Builds a request from raw weights and optional labels.
    ///
    /// Labels are attached only when their count matches the weight count;
    /// a mismatched label list is ignored, matching the original service.
    pub fn new(
        weights: &[f64],
        labels: Option<&[String]>,
        bin_capacity: f64,
        objective: Objective,
        min_items_per_bin: usize,
        bin_count: Option<usize>,
        sort_method: SortMethod,
    ) -> Result<Self, ValidationError> {
        let labels = labels.filter(|l| l.len() == weights.len());
        let items = weights
            .iter()
            .enumerate()
            .map(|(index, &weight)| Item::new(index, weight, labels.map(|l| l[index].clone())))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        if objective.requires_bin_count() {
            match bin_count {
                None => return Err(ValidationError::MissingBinCount),
                Some(0) => return Err(ValidationError::InvalidBinCount(0)),
                Some(_) => {}
            }
        }

        Ok(Self {
            items,
            bin_capacity,
            objective,
            min_items_per_bin,
            bin_count,
            sort_method,
        })
    }

    /// Total weight over all items.
    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(|item| item.weight).sum()
    }

    /// Number of items, which is also the slot count of the compiled model.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// One reported bin with its assigned items.
///
/// # Fields
/// * `bin_id` - Slot index of the bin in the solved model
/// * `items` - Original item indices assigned to this bin
/// * `item_weights` - Weights in the same order as `items`
/// * `item_labels` - Labels in the same order, when the request carried labels
/// * `fill_ratio` - `total_weight / capacity`
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct BinReport {
    pub bin_id: usize,
    pub items: Vec<usize>,
    pub item_weights: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_labels: Option<Vec<String>>,
    pub total_weight: f64,
    pub capacity: f64,
    pub fill_ratio: f64,
}

impl BinReport {
    /// Number of items in this bin.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// The validated outcome of one solve.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackingResult {
    pub bins: Vec<BinReport>,
    pub bin_count: usize,
    pub objective: Objective,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl PackingResult {
    /// Average fill ratio over all reported bins.
    pub fn average_fill_ratio(&self) -> f64 {
        if self.bins.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.bins.iter().map(|b| b.fill_ratio).sum();
        sum / self.bins.len() as f64
    }

    /// Total weight over all reported bins.
    pub fn total_packed_weight(&self) -> f64 {
        self.bins.iter().map(|b| b.total_weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_rejects_non_positive_weights() {
        assert!(Item::new(0, 10.0, None).is_ok());
        assert!(matches!(
            Item::new(3, 0.0, None),
            Err(ValidationError::InvalidWeight { index: 3, .. })
        ));
        assert!(Item::new(0, -5.0, None).is_err());
        assert!(Item::new(0, f64::NAN, None).is_err());
        assert!(Item::new(0, f64::INFINITY, None).is_err());
    }

    #[test]
    fn request_attaches_labels_only_on_matching_length() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let request = PackingRequest::new(
            &[1.0, 2.0],
            Some(&labels),
            10.0,
            Objective::MinBins,
            1,
            None,
            SortMethod::None,
        )
        .unwrap();
        assert_eq!(request.items[1].label.as_deref(), Some("b"));
        assert!((request.total_weight() - 3.0).abs() < 1e-9);
        assert_eq!(request.item_count(), 2);

        let short = vec!["only".to_string()];
        let request = PackingRequest::new(
            &[1.0, 2.0],
            Some(&short),
            10.0,
            Objective::MinBins,
            1,
            None,
            SortMethod::None,
        )
        .unwrap();
        assert!(request.items.iter().all(|i| i.label.is_none()));
    }

    #[test]
    fn balance_objective_requires_bin_count() {
        let err = PackingRequest::new(
            &[1.0, 2.0],
            None,
            10.0,
            Objective::BalanceBins,
            1,
            None,
            SortMethod::None,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingBinCount);

        let err = PackingRequest::new(
            &[1.0, 2.0],
            None,
            10.0,
            Objective::BalanceBins,
            1,
            Some(0),
            SortMethod::None,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidBinCount(0));
    }

    #[test]
    fn objective_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&Objective::BalanceBins).unwrap(),
            "\"balance_bins\""
        );
        let parsed: Objective = serde_json::from_str("\"max_items\"").unwrap();
        assert_eq!(parsed, Objective::MaxItems);
        assert_eq!(Objective::MinBins.to_string(), "min_bins");
    }

    #[test]
    fn result_statistics() {
        let result = PackingResult {
            bins: vec![
                BinReport {
                    bin_id: 0,
                    items: vec![0],
                    item_weights: vec![30.0],
                    item_labels: None,
                    total_weight: 30.0,
                    capacity: 60.0,
                    fill_ratio: 0.5,
                },
                BinReport {
                    bin_id: 1,
                    items: vec![1],
                    item_weights: vec![60.0],
                    item_labels: None,
                    total_weight: 60.0,
                    capacity: 60.0,
                    fill_ratio: 1.0,
                },
            ],
            bin_count: 2,
            objective: Objective::MinBins,
            warning: None,
        };
        assert!((result.average_fill_ratio() - 0.75).abs() < 1e-9);
        assert!((result.total_packed_weight() - 90.0).abs() < 1e-9);
    }
}
