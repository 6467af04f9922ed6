use crate::category::{category_of, index_of, Category, UNKNOWN_CATEGORY};
use crate::distribution::CategoryDist;
use crate::errors::TreeError;
use crate::loss::LossMatrix;
use crate::utils::is_missing;
use serde::{Deserialize, Serialize};

/// Column major view over the attribute values of a data set, used for batch
/// prediction. Missing values are NaN.
pub struct Matrix<'a, T> {
    pub data: &'a [T],
    /// Rows to visit, in order.
    pub index: Vec<usize>,
    pub rows: usize,
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            index: (0..rows).collect(),
            rows,
            cols,
        }
    }

    /// Values of one row, one per column.
    pub fn get_row_iter(&self, row: usize) -> std::iter::StepBy<std::iter::Skip<std::slice::Iter<'a, T>>> {
        self.data.iter().skip(row).step_by(self.rows)
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    pub fn get_row(&self, row: usize) -> Vec<T> {
        self.get_row_iter(row).copied().collect()
    }
}

/// Type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Finite set of named values, stored as the value index.
    Nominal(Vec<String>),
    /// Real valued.
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn nominal(name: &str, values: &[&str]) -> Self {
        Attribute {
            name: name.to_string(),
            kind: AttributeKind::Nominal(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    pub fn numeric(name: &str) -> Self {
        Attribute {
            name: name.to_string(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }

    /// Number of values of a nominal attribute, zero for numeric ones.
    pub fn num_values(&self) -> usize {
        match &self.kind {
            AttributeKind::Nominal(v) => v.len(),
            AttributeKind::Numeric => 0,
        }
    }

    /// Name of the value of a nominal attribute.
    pub fn value_name(&self, value: usize) -> Option<&str> {
        match &self.kind {
            AttributeKind::Nominal(v) => v.get(value).map(|s| s.as_str()),
            AttributeKind::Numeric => None,
        }
    }
}

/// Attributes, the label and an optional loss matrix of a data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
    pub label: Attribute,
    pub loss_matrix: Option<LossMatrix>,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>, label: Attribute) -> Self {
        Schema {
            attributes,
            label,
            loss_matrix: None,
        }
    }

    pub fn with_loss_matrix(mut self, loss_matrix: LossMatrix) -> Self {
        self.loss_matrix = Some(loss_matrix);
        self
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn num_labels(&self) -> usize {
        self.label.num_values()
    }

    pub fn attribute(&self, attribute: usize) -> Result<&Attribute, TreeError> {
        self.attributes
            .get(attribute)
            .ok_or(TreeError::AttributeOutOfRange(attribute, self.attributes.len()))
    }

    /// Name of a label category, `?` for the unknown category.
    pub fn label_name(&self, category: Category) -> String {
        index_of(category)
            .and_then(|i| self.label.value_name(i))
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    /// The loss matrix of the schema, or the 0/1 loss when there is none.
    pub fn loss_matrix(&self) -> LossMatrix {
        self.loss_matrix
            .clone()
            .unwrap_or_else(|| LossMatrix::zero_one(self.num_labels()))
    }
}

/// Labeled and weighted instances stored column major.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    values: Vec<f64>,
    rows: usize,
    labels: Vec<usize>,
    weights: Vec<f64>,
}

impl Dataset {
    /// Create a new data set.
    ///
    /// * `values` - Column major attribute values, `rows * schema.num_attributes()` long.
    /// * `labels` - 0-based label value of every row.
    /// * `weights` - Instance weights, every instance weighs one when `None`.
    pub fn new(
        schema: Schema,
        values: Vec<f64>,
        rows: usize,
        labels: Vec<usize>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, TreeError> {
        let cols = schema.num_attributes();
        if values.len() != rows * cols {
            return Err(TreeError::InvalidData(format!(
                "expected {} values for {} rows and {} attributes, found {}",
                rows * cols,
                rows,
                cols,
                values.len()
            )));
        }
        if schema.num_labels() == 0 {
            return Err(TreeError::InvalidData("the label must be nominal with at least one value".to_string()));
        }
        if labels.len() != rows {
            return Err(TreeError::InvalidData(format!(
                "expected {} labels, found {}",
                rows,
                labels.len()
            )));
        }
        if let Some(l) = labels.iter().find(|l| **l >= schema.num_labels()) {
            return Err(TreeError::InvalidData(format!("label value {} out of range", l)));
        }
        let weights = weights.unwrap_or_else(|| vec![1.0; rows]);
        if weights.len() != rows || weights.iter().any(|w| w.is_nan() || *w < 0.0) {
            return Err(TreeError::InvalidData(
                "weights must be non-negative with one weight per row".to_string(),
            ));
        }
        for (j, attribute) in schema.attributes.iter().enumerate() {
            if let AttributeKind::Nominal(names) = &attribute.kind {
                let column = &values[j * rows..(j + 1) * rows];
                let invalid = column
                    .iter()
                    .any(|v| !is_missing(*v) && (v.fract() != 0.0 || *v < 0.0 || *v >= names.len() as f64));
                if invalid {
                    return Err(TreeError::InvalidData(format!(
                        "attribute {} holds a value outside of its {} nominal values",
                        attribute.name,
                        names.len()
                    )));
                }
            }
        }
        if let Some(m) = &schema.loss_matrix {
            if m.num_labels() != schema.num_labels() {
                return Err(TreeError::InvalidData(format!(
                    "loss matrix covers {} labels but the label has {} values",
                    m.num_labels(),
                    schema.num_labels()
                )));
            }
        }
        Ok(Dataset {
            schema,
            values,
            rows,
            labels,
            weights,
        })
    }

    /// Create a data set from row major records.
    pub fn from_rows(
        schema: Schema,
        records: &[Vec<f64>],
        labels: Vec<usize>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, TreeError> {
        let cols = schema.num_attributes();
        if let Some(r) = records.iter().find(|r| r.len() != cols) {
            return Err(TreeError::InvalidData(format!(
                "expected {} values per record, found {}",
                cols,
                r.len()
            )));
        }
        let values = (0..cols)
            .flat_map(|j| records.iter().map(move |r| r[j]))
            .collect();
        Dataset::new(schema, values, records.len(), labels, weights)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn num_attributes(&self) -> usize {
        self.schema.num_attributes()
    }

    pub fn num_labels(&self) -> usize {
        self.schema.num_labels()
    }

    /// All the instances of the data set.
    pub fn instances(&self) -> Vec<usize> {
        (0..self.rows).collect()
    }

    /// Attribute values as a column major matrix.
    pub fn matrix(&self) -> Matrix<'_, f64> {
        Matrix::new(&self.values, self.rows, self.num_attributes())
    }

    #[inline]
    pub fn value(&self, row: usize, attribute: usize) -> f64 {
        self.values[attribute * self.rows + row]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.num_attributes()).map(|j| self.value(row, j)).collect()
    }

    #[inline]
    pub fn label(&self, row: usize) -> usize {
        self.labels[row]
    }

    #[inline]
    pub fn label_category(&self, row: usize) -> Category {
        category_of(self.labels[row])
    }

    #[inline]
    pub fn weight(&self, row: usize) -> f64 {
        self.weights[row]
    }

    pub fn total_weight(&self, instances: &[usize]) -> f64 {
        instances.iter().map(|i| self.weights[*i]).sum()
    }

    /// Weighted label counts of the instances, indexed by category.
    pub fn label_counts(&self, instances: &[usize]) -> CategoryDist {
        let mut counts = CategoryDist::new(self.num_labels());
        for i in instances {
            counts.add(self.label_category(*i), self.weights[*i]);
        }
        counts
    }

    /// Weight of every value of a nominal attribute, indexed by category with
    /// missing values under the unknown category.
    pub fn attribute_value_counts(&self, attribute: usize, instances: &[usize]) -> Result<Vec<f64>, TreeError> {
        let num_values = self.schema.attribute(attribute)?.num_values();
        let mut counts = vec![0.0; num_values + 1];
        for i in instances {
            let v = self.value(*i, attribute);
            let c = if is_missing(v) {
                UNKNOWN_CATEGORY
            } else {
                category_of(v as usize)
            };
            counts[c] += self.weights[*i];
        }
        Ok(counts)
    }

    /// The loss matrix of the schema, or the 0/1 loss.
    pub fn loss_matrix(&self) -> LossMatrix {
        self.schema.loss_matrix()
    }
}
