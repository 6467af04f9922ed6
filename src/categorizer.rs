//! Categorizer
//!
//! The logic held by every node of a decision tree. Split categorizers route
//! an instance to one of their outgoing edges, leaves hold the prediction.
use crate::category::{category_of, AugCategory, Category, FIRST_CATEGORY, UNKNOWN_CATEGORY};
use crate::data::{Dataset, Schema};
use crate::distribution::{leaf_distribution, merge_tie_break, CategoryDist, LeafDistType};
use crate::errors::TreeError;
use crate::utils::{approx_zero, is_missing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Branches on the value of a nominal attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCategorizer {
    pub attribute: usize,
    pub name: String,
    pub values: Vec<String>,
}

/// Branches a numeric attribute into `<= threshold` and `> threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCategorizer {
    pub attribute: usize,
    pub name: String,
    pub threshold: f64,
}

/// Terminal predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafCategorizer {
    pub prediction: AugCategory,
    pub distribution: CategoryDist,
}

impl LeafCategorizer {
    /// Normalised prediction distribution indexed by category. A leaf that saw
    /// no training weight is certain of its prediction.
    pub fn score(&self) -> Vec<f64> {
        if self.distribution.is_empty() {
            let mut p = vec![0.0; self.distribution.weights.len().max(self.prediction.category + 1)];
            p[self.prediction.category] = 1.0;
            p
        } else {
            self.distribution.probabilities()
        }
    }
}

/// How leaves are built from the instances that reach them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeafPolicy {
    pub dist_type: LeafDistType,
    pub factor: f64,
    /// Children prefer the majority of their parent when breaking ties.
    pub parent_tie_breaking: bool,
}

impl Default for LeafPolicy {
    fn default() -> Self {
        LeafPolicy {
            dist_type: LeafDistType::FrequencyCounts,
            factor: 1.0,
            parent_tie_breaking: true,
        }
    }
}

impl LeafPolicy {
    /// Leaf for the label `counts`. A leaf without weight predicts `fallback`.
    pub fn make_leaf(
        &self,
        counts: &CategoryDist,
        tie_break: &[Category],
        fallback: Category,
        schema: &Schema,
    ) -> LeafCategorizer {
        let prediction = if counts.is_empty() {
            fallback
        } else {
            counts.best_category(tie_break)
        };
        LeafCategorizer {
            prediction: AugCategory::new(prediction, schema.label_name(prediction)),
            distribution: leaf_distribution(counts, prediction, self.dist_type, self.factor),
        }
    }

    /// Tie break order handed to the children of a node with `counts`.
    pub fn child_tie_break(&self, tie_break: &[Category], counts: &CategoryDist) -> Vec<Category> {
        if self.parent_tie_breaking && !counts.is_empty() {
            merge_tie_break(counts.best_category(tie_break), tie_break)
        } else {
            tie_break.to_vec()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Categorizer {
    Attribute(AttributeCategorizer),
    Threshold(ThresholdCategorizer),
    Leaf(LeafCategorizer),
}

impl Categorizer {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Categorizer::Leaf(_))
    }

    /// Attribute tested by a split categorizer.
    pub fn attribute(&self) -> Option<usize> {
        match self {
            Categorizer::Attribute(c) => Some(c.attribute),
            Categorizer::Threshold(c) => Some(c.attribute),
            Categorizer::Leaf(_) => None,
        }
    }

    /// Number of known branches, the unknown branch is not counted.
    pub fn num_branches(&self) -> usize {
        match self {
            Categorizer::Attribute(c) => c.values.len(),
            Categorizer::Threshold(_) => 2,
            Categorizer::Leaf(_) => 0,
        }
    }

    /// Category of the edge an instance takes.
    pub fn branch(&self, row: &[f64]) -> Result<Category, TreeError> {
        let attribute = self.split_attribute()?;
        let v = *row
            .get(attribute)
            .ok_or(TreeError::AttributeOutOfRange(attribute, row.len()))?;
        self.branch_value(v)
    }

    /// Category of the edge taken by row `row` of a data set.
    pub fn branch_instance(&self, dataset: &Dataset, row: usize) -> Result<Category, TreeError> {
        let attribute = self.split_attribute()?;
        if attribute >= dataset.num_attributes() {
            return Err(TreeError::AttributeOutOfRange(attribute, dataset.num_attributes()));
        }
        self.branch_value(dataset.value(row, attribute))
    }

    fn split_attribute(&self) -> Result<usize, TreeError> {
        self.attribute().ok_or(TreeError::BranchOnLeaf)
    }

    fn branch_value(&self, v: f64) -> Result<Category, TreeError> {
        if is_missing(v) {
            return Ok(UNKNOWN_CATEGORY);
        }
        match self {
            Categorizer::Attribute(c) => {
                if v < 0.0 || v.fract() != 0.0 || v as usize >= c.values.len() {
                    Ok(UNKNOWN_CATEGORY)
                } else {
                    Ok(category_of(v as usize))
                }
            }
            Categorizer::Threshold(c) => {
                if v <= c.threshold {
                    Ok(FIRST_CATEGORY)
                } else {
                    Ok(FIRST_CATEGORY + 1)
                }
            }
            Categorizer::Leaf(_) => Err(TreeError::BranchOnLeaf),
        }
    }

    /// Label of the edge for `category`.
    pub fn edge_label(&self, category: Category) -> AugCategory {
        let description = match self {
            Categorizer::Attribute(c) => match category.checked_sub(FIRST_CATEGORY).and_then(|i| c.values.get(i)) {
                Some(value) => format!("{} = {}", c.name, value),
                None => format!("{} = ?", c.name),
            },
            Categorizer::Threshold(c) => match category {
                FIRST_CATEGORY => format!("{} <= {}", c.name, c.threshold),
                UNKNOWN_CATEGORY => format!("{} = ?", c.name),
                _ => format!("{} > {}", c.name, c.threshold),
            },
            Categorizer::Leaf(_) => "?".to_string(),
        };
        AugCategory::new(category, description)
    }

    /// The leaf payload of a leaf categorizer.
    pub fn leaf(&self) -> Result<&LeafCategorizer, TreeError> {
        match self {
            Categorizer::Leaf(l) => Ok(l),
            Categorizer::Attribute(c) => Err(TreeError::NotALeaf(c.attribute)),
            Categorizer::Threshold(c) => Err(TreeError::NotALeaf(c.attribute)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Categorizer::Attribute(c) => c.name.clone(),
            Categorizer::Threshold(c) => format!("{} <= {}", c.name, c.threshold),
            Categorizer::Leaf(l) => format!("{} {}", l.prediction, l.distribution),
        }
    }
}

impl fmt::Display for Categorizer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Running loss tally of the instances scored through a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeLoss {
    pub weight: f64,
    pub loss: f64,
    pub loss_squared: f64,
}

impl NodeLoss {
    pub fn add(&mut self, weight: f64, loss: f64) {
        self.weight += weight;
        self.loss += weight * loss;
        self.loss_squared += weight * loss * loss;
    }

    pub fn mean(&self) -> f64 {
        if approx_zero(self.weight) {
            0.0
        } else {
            self.loss / self.weight
        }
    }

    pub fn variance(&self) -> f64 {
        if approx_zero(self.weight) {
            return 0.0;
        }
        let mean = self.mean();
        (self.loss_squared / self.weight - mean * mean).max(0.0)
    }

    /// Mean loss moved up by `z` standard errors.
    pub fn pessimistic_mean(&self, z: f64) -> f64 {
        if approx_zero(self.weight) {
            return 0.0;
        }
        self.mean() + z * (self.variance() / self.weight).sqrt()
    }
}

/// Statistics a node accumulates from the instances routed through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeStats {
    /// Weighted label counts of the training instances that reached the node.
    pub distribution: CategoryDist,
    pub loss: NodeLoss,
}
