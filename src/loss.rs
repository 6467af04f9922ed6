//! Loss
//!
//! Cost of predicting one category when another is the truth.
use crate::category::{index_of, Category, FIRST_CATEGORY};
use crate::distribution::CategoryDist;
use crate::errors::TreeError;
use crate::utils::approx_eq;
use serde::{Deserialize, Serialize};

/// Square loss matrix over the known labels, stored row-major with the actual
/// label as row and the predicted label as column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossMatrix {
    num_labels: usize,
    values: Vec<f64>,
}

impl LossMatrix {
    /// Loss matrix from its rows, every row holds the losses for one actual label.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, TreeError> {
        let num_labels = rows.len();
        let mut values = Vec::with_capacity(num_labels * num_labels);
        for row in rows {
            if row.len() != num_labels {
                return Err(TreeError::InvalidData(format!(
                    "loss matrix must be square, found a row of length {} for {} labels",
                    row.len(),
                    num_labels
                )));
            }
            if row.iter().any(|v| v.is_nan() || *v < 0.0) {
                return Err(TreeError::InvalidData(
                    "loss matrix entries must be non-negative numbers".to_string(),
                ));
            }
            values.extend(row);
        }
        Ok(LossMatrix { num_labels, values })
    }

    /// The 0/1 loss.
    pub fn zero_one(num_labels: usize) -> Self {
        let values = (0..num_labels)
            .flat_map(|a| (0..num_labels).map(move |p| if a == p { 0.0 } else { 1.0 }))
            .collect();
        LossMatrix { num_labels, values }
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Loss of predicting `predicted` when `actual` is the truth. Unknown
    /// actual categories cost nothing, an unknown prediction is always wrong.
    pub fn loss(&self, actual: Category, predicted: Category) -> f64 {
        match (index_of(actual), index_of(predicted)) {
            (Some(a), Some(p)) if a < self.num_labels && p < self.num_labels => self.values[a * self.num_labels + p],
            (None, _) => 0.0,
            _ => self.max_loss(),
        }
    }

    fn max_loss(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Total loss of predicting `predicted` for every unit of weight in `dist`.
    pub fn expected_loss(&self, dist: &CategoryDist, predicted: Category) -> f64 {
        dist.known().map(|(actual, w)| w * self.loss(actual, predicted)).sum()
    }

    /// Prediction with the smallest total loss over `dist`, lower category first
    /// on ties. Returns the prediction and its loss.
    pub fn best_prediction(&self, dist: &CategoryDist) -> (Category, f64) {
        let mut best = (FIRST_CATEGORY, f64::INFINITY);
        for predicted in FIRST_CATEGORY..FIRST_CATEGORY + self.num_labels {
            let loss = self.expected_loss(dist, predicted);
            if loss < best.1 && !approx_eq(loss, best.1) {
                best = (predicted, loss);
            }
        }
        best
    }
}
