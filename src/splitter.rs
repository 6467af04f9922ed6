//! Splitter
//!
//! Evaluates how well each attribute separates the labels of a node and
//! picks the split the inducer branches on.
use crate::categorizer::{AttributeCategorizer, Categorizer, ThresholdCategorizer};
use crate::category::{category_of, Category, FIRST_CATEGORY, UNKNOWN_CATEGORY};
use crate::constants::{EPSILON, MANY_VALUED_RATIO};
use crate::data::{AttributeKind, Dataset, Schema};
use crate::errors::TreeError;
use crate::utils::{
    approx_eq, approx_zero, definitely_greater, entropy, is_missing, items_to_strings, shorten_threshold,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Score used to rank candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    MutualInfo,
    /// Mutual information divided by `log2` of the number of branches.
    NormalizedMutualInfo,
    /// Mutual information divided by the entropy of the split itself.
    GainRatio,
}

impl FromStr for SplitCriterion {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MutualInfo" => Ok(SplitCriterion::MutualInfo),
            "NormalizedMutualInfo" => Ok(SplitCriterion::NormalizedMutualInfo),
            "GainRatio" => Ok(SplitCriterion::GainRatio),
            _ => Err(TreeError::ParseString(
                s.to_string(),
                "SplitCriterion".to_string(),
                items_to_strings(vec!["MutualInfo", "NormalizedMutualInfo", "GainRatio"]),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitKind {
    Nominal,
    Threshold(f64),
}

/// A usable split of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCandidate {
    pub attribute: usize,
    pub kind: SplitKind,
    /// Mutual information in bits, scaled by the known fraction of the weight.
    pub mutual_info: f64,
    /// Entropy of the partition, the unknown part counted as its own branch.
    pub split_entropy: f64,
    /// Known branches carrying weight.
    pub num_branches: usize,
    pub many_valued: bool,
    pub score: f64,
}

impl SplitCandidate {
    /// The split categorizer this candidate stands for.
    pub fn categorizer(&self, schema: &Schema) -> Result<Categorizer, TreeError> {
        let attribute = schema.attribute(self.attribute)?;
        match (&self.kind, &attribute.kind) {
            (SplitKind::Nominal, AttributeKind::Nominal(values)) => Ok(Categorizer::Attribute(AttributeCategorizer {
                attribute: self.attribute,
                name: attribute.name.clone(),
                values: values.clone(),
            })),
            (SplitKind::Threshold(threshold), AttributeKind::Numeric) => {
                Ok(Categorizer::Threshold(ThresholdCategorizer {
                    attribute: self.attribute,
                    name: attribute.name.clone(),
                    threshold: *threshold,
                }))
            }
            _ => Err(TreeError::InvalidData(format!(
                "split kind {:?} does not match attribute {}",
                self.kind, attribute.name
            ))),
        }
    }
}

/// Bounds on the weight a branch needs before a split counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinSplitWeight {
    pub lower: f64,
    pub upper: f64,
    pub percent: f64,
    /// Nominal attributes only use the lower bound.
    pub nominal_lbound_only: bool,
}

impl MinSplitWeight {
    /// `clamp(percent * total_weight / num_labels, lower, upper)`.
    pub fn threshold(&self, nominal: bool, total_weight: f64, num_labels: usize) -> f64 {
        if nominal && self.nominal_lbound_only {
            return self.lower;
        }
        let labels = num_labels.max(1) as f64;
        (self.percent * total_weight / labels).max(self.lower).min(self.upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitEvaluator {
    pub min_split: MinSplitWeight,
    pub criterion: SplitCriterion,
    /// Penalise numeric splits by `log2(#cut points) / weight`.
    pub cont_mdl_adjust: bool,
}

impl SplitEvaluator {
    /// Best split over all attributes, `None` when no split is reasonable.
    pub fn best_split(&self, dataset: &Dataset, instances: &[usize]) -> Result<Option<SplitCandidate>, TreeError> {
        let mut candidates = Vec::new();
        for attribute in 0..dataset.num_attributes() {
            if let Some(c) = self.evaluate(dataset, attribute, instances)? {
                candidates.push(c);
            }
        }
        Ok(pick_best_split(&candidates, self.criterion).map(|i| candidates.swap_remove(i)))
    }

    /// Candidate split of one attribute, `None` when the attribute cannot
    /// separate the instances.
    pub fn evaluate(
        &self,
        dataset: &Dataset,
        attribute: usize,
        instances: &[usize],
    ) -> Result<Option<SplitCandidate>, TreeError> {
        let total_weight = dataset.total_weight(instances);
        if approx_zero(total_weight) {
            return Ok(None);
        }
        let candidate = match &dataset.schema().attribute(attribute)?.kind {
            AttributeKind::Nominal(values) => {
                self.nominal_split(dataset, attribute, values.len(), instances, total_weight)
            }
            AttributeKind::Numeric => self.threshold_split(dataset, attribute, instances, total_weight),
        };
        Ok(candidate.map(|mut c| {
            c.score = self.score(&c);
            c
        }))
    }

    fn score(&self, candidate: &SplitCandidate) -> f64 {
        match self.criterion {
            SplitCriterion::MutualInfo => candidate.mutual_info,
            SplitCriterion::NormalizedMutualInfo => {
                let bits = (candidate.num_branches.max(2) as f64).log2();
                candidate.mutual_info / bits
            }
            SplitCriterion::GainRatio => {
                if candidate.split_entropy > EPSILON {
                    candidate.mutual_info / candidate.split_entropy
                } else {
                    0.0
                }
            }
        }
    }

    fn nominal_split(
        &self,
        dataset: &Dataset,
        attribute: usize,
        num_values: usize,
        instances: &[usize],
        total_weight: f64,
    ) -> Option<SplitCandidate> {
        let num_labels = dataset.num_labels();
        // joint[value category][label category]
        let mut joint = vec![vec![0.0; num_labels + FIRST_CATEGORY]; num_values + FIRST_CATEGORY];
        for i in instances {
            let v = dataset.value(*i, attribute);
            let value: Category = if is_missing(v) {
                UNKNOWN_CATEGORY
            } else {
                category_of(v as usize)
            };
            joint[value][dataset.label_category(*i)] += dataset.weight(*i);
        }
        let value_weights: Vec<f64> = joint.iter().map(|row| row.iter().sum()).collect();
        let min_split = self.min_split.threshold(true, total_weight, num_labels);
        let big_enough = value_weights[FIRST_CATEGORY..]
            .iter()
            .filter(|w| **w > 0.0 && (**w >= min_split || approx_eq(**w, min_split)))
            .count();
        if big_enough < 2 {
            return None;
        }
        let known_weight = total_weight - value_weights[UNKNOWN_CATEGORY];
        if approx_zero(known_weight) {
            return None;
        }
        let mut known_labels = vec![0.0; num_labels + FIRST_CATEGORY];
        for row in &joint[FIRST_CATEGORY..] {
            for (label, w) in row.iter().enumerate() {
                known_labels[label] += w;
            }
        }
        let conditional: f64 = joint[FIRST_CATEGORY..]
            .iter()
            .zip(&value_weights[FIRST_CATEGORY..])
            .filter(|(_, w)| **w > 0.0)
            .map(|(row, w)| w / known_weight * entropy(row))
            .sum();
        let mutual_info = (entropy(&known_labels) - conditional).max(0.0) * known_weight / total_weight;
        Some(SplitCandidate {
            attribute,
            kind: SplitKind::Nominal,
            mutual_info,
            split_entropy: entropy(&value_weights),
            num_branches: value_weights[FIRST_CATEGORY..].iter().filter(|w| **w > 0.0).count(),
            many_valued: num_values as f64 >= MANY_VALUED_RATIO * total_weight,
            score: 0.0,
        })
    }

    fn threshold_split(
        &self,
        dataset: &Dataset,
        attribute: usize,
        instances: &[usize],
        total_weight: f64,
    ) -> Option<SplitCandidate> {
        let num_labels = dataset.num_labels();
        let mut known: Vec<(f64, Category, f64)> = instances
            .iter()
            .map(|i| (dataset.value(*i, attribute), dataset.label_category(*i), dataset.weight(*i)))
            .filter(|(v, _, _)| !is_missing(*v))
            .collect();
        if known.len() < 2 {
            return None;
        }
        known.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut right = vec![0.0; num_labels + FIRST_CATEGORY];
        for (_, label, w) in &known {
            right[*label] += w;
        }
        let known_weight: f64 = right.iter().sum();
        let unknown_weight = (total_weight - known_weight).max(0.0);
        let prior = entropy(&right);
        let min_split = self.min_split.threshold(false, total_weight, num_labels);
        let meets_min = |w: f64| w > 0.0 && (w >= min_split || approx_eq(w, min_split));

        let mut left = vec![0.0; num_labels + FIRST_CATEGORY];
        let mut left_weight = 0.0;
        let mut cut_points = 0usize;
        // (mutual information over the known part, left weight, low, high)
        let mut best: Option<(f64, f64, f64, f64)> = None;
        for k in 0..known.len() - 1 {
            let (value, label, w) = known[k];
            left[label] += w;
            right[label] -= w;
            left_weight += w;
            let next = known[k + 1].0;
            if value >= next {
                continue;
            }
            cut_points += 1;
            let right_weight = known_weight - left_weight;
            if !meets_min(left_weight) || !meets_min(right_weight) {
                continue;
            }
            let conditional = (left_weight * entropy(&left) + right_weight * entropy(&right)) / known_weight;
            let gain = (prior - conditional).max(0.0);
            match best {
                Some((g, ..)) if !definitely_greater(gain, g) => (),
                _ => best = Some((gain, left_weight, value, next)),
            }
        }
        let (gain, left_weight, low, high) = best?;
        let mut mutual_info = gain * known_weight / total_weight;
        if self.cont_mdl_adjust && cut_points > 1 {
            mutual_info -= (cut_points as f64).log2() / total_weight;
        }
        Some(SplitCandidate {
            attribute,
            kind: SplitKind::Threshold(shorten_threshold(low, high)),
            mutual_info,
            split_entropy: entropy(&[unknown_weight, left_weight, known_weight - left_weight]),
            num_branches: 2,
            many_valued: false,
            score: 0.0,
        })
    }
}

/// First candidate with the highest score, later candidates must beat it by
/// more than the tolerance.
fn max_score(candidates: &[SplitCandidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, c) in candidates.iter().enumerate() {
        match best {
            Some(b) if !definitely_greater(c.score, candidates[b].score) => (),
            _ => best = Some(i),
        }
    }
    best
}

/// Index of the winning candidate, `None` when the winner carries no
/// mutual information.
///
/// Under gain ratio only candidates whose mutual information reaches the mean
/// compete. The mean leaves out many valued attributes unless every
/// candidate is many valued.
pub fn pick_best_split(candidates: &[SplitCandidate], criterion: SplitCriterion) -> Option<usize> {
    let best = match criterion {
        SplitCriterion::GainRatio => {
            let mut pool: Vec<f64> = candidates
                .iter()
                .filter(|c| !c.many_valued)
                .map(|c| c.mutual_info)
                .collect();
            if pool.is_empty() {
                pool = candidates.iter().map(|c| c.mutual_info).collect();
            }
            let mean = pool.iter().sum::<f64>() / pool.len().max(1) as f64;
            let mut best: Option<usize> = None;
            for (i, c) in candidates.iter().enumerate() {
                if c.mutual_info < mean && !approx_eq(c.mutual_info, mean) {
                    continue;
                }
                match best {
                    Some(b) if !definitely_greater(c.score, candidates[b].score) => (),
                    _ => best = Some(i),
                }
            }
            best.or_else(|| max_score(candidates))
        }
        SplitCriterion::MutualInfo | SplitCriterion::NormalizedMutualInfo => max_score(candidates),
    };
    best.filter(|i| candidates[*i].mutual_info > EPSILON)
}
