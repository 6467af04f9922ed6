//! Distribution
//!
//! Weighted label distributions, majority selection with tie breaking and
//! the policies used to turn the label counts of a leaf into its prediction
//! distribution.
use crate::category::{Category, FIRST_CATEGORY, UNKNOWN_CATEGORY};
use crate::constants::TIE_BREAK_DIGITS;
use crate::errors::TreeError;
use crate::utils::{approx_eq, approx_zero, fmt_vec_output, items_to_strings, round_significant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the distribution stored in a leaf is derived from its label counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafDistType {
    /// All of the weight on the predicted category.
    AllOrNothing,
    /// The raw weighted label counts.
    FrequencyCounts,
    /// Counts smoothed with the Laplace correction, `(n_i + f) / (n + k * f)`.
    Laplace,
    /// Evidence of the categories is projected below `ln(1 + n * f)`, the
    /// mass taken away is spread evenly over all categories.
    EvidenceProjection,
}

impl FromStr for LeafDistType {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AllOrNothing" => Ok(LeafDistType::AllOrNothing),
            "FrequencyCounts" => Ok(LeafDistType::FrequencyCounts),
            "Laplace" => Ok(LeafDistType::Laplace),
            "EvidenceProjection" => Ok(LeafDistType::EvidenceProjection),
            _ => Err(TreeError::ParseString(
                s.to_string(),
                "LeafDistType".to_string(),
                items_to_strings(vec!["AllOrNothing", "FrequencyCounts", "Laplace", "EvidenceProjection"]),
            )),
        }
    }
}

/// Weights indexed by category, slot `0` holds the unknown category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryDist {
    pub weights: Vec<f64>,
}

impl CategoryDist {
    /// Empty distribution over `num_labels` known categories.
    pub fn new(num_labels: usize) -> Self {
        CategoryDist {
            weights: vec![0.0; num_labels + FIRST_CATEGORY],
        }
    }

    pub fn from_weights(weights: Vec<f64>) -> Self {
        CategoryDist { weights }
    }

    pub fn num_labels(&self) -> usize {
        self.weights.len().saturating_sub(FIRST_CATEGORY)
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn weight(&self, category: Category) -> f64 {
        self.weights.get(category).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, category: Category, weight: f64) {
        if category >= self.weights.len() {
            self.weights.resize(category + 1, 0.0);
        }
        self.weights[category] += weight;
    }

    pub fn is_empty(&self) -> bool {
        approx_zero(self.total())
    }

    /// Number of known categories carrying weight.
    pub fn num_nonzero(&self) -> usize {
        self.known().filter(|(_, w)| !approx_zero(*w)).count()
    }

    /// Iterate over `(category, weight)` of the known categories.
    pub fn known(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.weights.iter().copied().enumerate().skip(FIRST_CATEGORY)
    }

    /// The category with the largest weight. Categories within tolerance of the
    /// maximum are resolved by their position in `tie_break`, categories missing
    /// from `tie_break` come last in category order.
    pub fn best_category(&self, tie_break: &[Category]) -> Category {
        let max = self.known().map(|(_, w)| w).fold(f64::NEG_INFINITY, f64::max);
        let is_best = |c: Category| c != UNKNOWN_CATEGORY && approx_eq(self.weight(c), max.max(0.0));
        tie_break
            .iter()
            .copied()
            .filter(|c| *c < self.weights.len())
            .chain(FIRST_CATEGORY..self.weights.len())
            .find(|c| is_best(*c))
            .unwrap_or(FIRST_CATEGORY)
    }

    /// Weights normalised to sum to one. An empty distribution yields zeros.
    pub fn probabilities(&self) -> Vec<f64> {
        let total = self.total();
        if approx_zero(total) {
            return vec![0.0; self.weights.len()];
        }
        self.weights.iter().map(|w| w / total).collect()
    }
}

impl fmt::Display for CategoryDist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", fmt_vec_output(&self.weights[FIRST_CATEGORY.min(self.weights.len())..]))
    }
}

/// Categories ordered by decreasing weight, lower category first on ties.
/// Weights are compared at `TIE_BREAK_DIGITS` significant digits.
pub fn tie_break_order(counts: &CategoryDist) -> Vec<Category> {
    let mut order: Vec<(Category, f64)> = counts
        .known()
        .map(|(c, w)| (c, round_significant(w, TIE_BREAK_DIGITS)))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    order.into_iter().map(|(c, _)| c).collect()
}

/// Put `first` at the front of `order`, keeping the relative order of the rest.
pub fn merge_tie_break(first: Category, order: &[Category]) -> Vec<Category> {
    let mut merged = Vec::with_capacity(order.len() + 1);
    merged.push(first);
    merged.extend(order.iter().copied().filter(|c| *c != first));
    merged
}

/// Build the distribution stored in a leaf from its label counts. For every
/// policy the result sums to the weight of the counts.
pub fn leaf_distribution(
    counts: &CategoryDist,
    prediction: Category,
    dist_type: LeafDistType,
    factor: f64,
) -> CategoryDist {
    let total = counts.total();
    let mut dist = CategoryDist::new(counts.num_labels());
    if approx_zero(total) {
        return dist;
    }
    let k = counts.num_labels() as f64;
    match dist_type {
        LeafDistType::AllOrNothing => dist.add(prediction, total),
        LeafDistType::FrequencyCounts => dist.weights.copy_from_slice(&counts.weights),
        LeafDistType::Laplace => {
            let denominator = total + k * factor;
            for (c, w) in counts.known() {
                dist.weights[c] = total * (w + factor) / denominator;
            }
        }
        LeafDistType::EvidenceProjection => {
            // Evidence is scaled down uniformly so that the strongest category
            // stays below `ln(1 + n * f)`, which keeps the order of the categories.
            let max_evidence = (1.0 + total * factor).ln();
            let shrink = total / (total + 1.0);
            let evidence: Vec<(Category, f64)> = counts
                .known()
                .map(|(c, w)| (c, -(1.0 - shrink * w / total).ln()))
                .collect();
            let strongest = evidence.iter().map(|(_, e)| *e).fold(0.0, f64::max);
            let scale = if strongest > max_evidence { max_evidence / strongest } else { 1.0 };
            let mut projected = 0.0;
            for (c, e) in evidence {
                let q = 1.0 - (-scale * e).exp();
                dist.weights[c] = q;
                projected += q;
            }
            let spread = (1.0 - projected).max(0.0) / k;
            for c in FIRST_CATEGORY..dist.weights.len() {
                dist.weights[c] += spread;
            }
            let norm = total / dist.total();
            dist.weights.iter_mut().for_each(|w| *w *= norm);
        }
    }
    dist
}

/// Kullback-Leibler divergence `KL(p || q)` in bits. Both inputs are expected
/// to be normalised. Infinite when `p` has mass where `q` has none.
pub fn kullback_leibler_distance(p: &[f64], q: &[f64]) -> f64 {
    let mut kl = 0.0;
    for (i, pi) in p.iter().enumerate() {
        if *pi <= 0.0 {
            continue;
        }
        let qi = q.get(i).copied().unwrap_or(0.0);
        if qi <= 0.0 {
            return f64::INFINITY;
        }
        kl += pi * (pi / qi).log2();
    }
    kl.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(w: &[f64]) -> CategoryDist {
        let mut weights = vec![0.0];
        weights.extend_from_slice(w);
        CategoryDist::from_weights(weights)
    }

    #[test]
    fn test_best_category_tie_break() {
        let d = counts(&[3.0, 3.0, 1.0]);
        assert_eq!(1, d.best_category(&[]));
        assert_eq!(2, d.best_category(&[2, 1, 3]));
        assert_eq!(1, d.best_category(&[3, 1, 2]));
        let empty = counts(&[0.0, 0.0]);
        assert_eq!(2, empty.best_category(&[2, 1]));
    }

    #[test]
    fn test_tie_break_order() {
        let d = counts(&[1.0, 5.0, 5.0]);
        assert_eq!(vec![2, 3, 1], tie_break_order(&d));
        assert_eq!(vec![1, 2, 3], merge_tie_break(1, &[2, 3, 1]));
        // Weights within rounding of each other tie and keep category order.
        let close = counts(&[5.0, 5.0 + 1e-12, 5.0 - 1e-12, 2.0]);
        assert_eq!(vec![1, 2, 3, 4], tie_break_order(&close));
        let many: Vec<f64> = (0..64).map(|i| 1.0 + (i % 3) as f64 * 4e-10).collect();
        let order = tie_break_order(&counts(&many));
        assert_eq!((1..=64).collect::<Vec<_>>(), order);
    }

    #[test]
    fn test_leaf_distribution_conserves_weight() {
        let d = counts(&[6.0, 2.0, 0.0]);
        for dist_type in [
            LeafDistType::AllOrNothing,
            LeafDistType::FrequencyCounts,
            LeafDistType::Laplace,
            LeafDistType::EvidenceProjection,
        ] {
            let leaf = leaf_distribution(&d, 1, dist_type, 1.0);
            assert!(approx_eq(8.0, leaf.total()), "{:?}", dist_type);
            assert_eq!(1, leaf.best_category(&[1, 2, 3]), "{:?}", dist_type);
        }
        let all = leaf_distribution(&d, 1, LeafDistType::AllOrNothing, 1.0);
        assert_eq!(vec![0.0, 8.0, 0.0, 0.0], all.weights);
        let laplace = leaf_distribution(&d, 1, LeafDistType::Laplace, 1.0);
        assert!(laplace.weight(3) > 0.0);
    }

    #[test]
    fn test_evidence_projection_shrinks_small_leaves() {
        let small = leaf_distribution(&counts(&[1.0, 0.0]), 1, LeafDistType::EvidenceProjection, 1.0);
        let large = leaf_distribution(&counts(&[100.0, 0.0]), 1, LeafDistType::EvidenceProjection, 1.0);
        let p_small = small.probabilities()[1];
        let p_large = large.probabilities()[1];
        assert!(p_small < p_large);
        assert!(p_large < 1.0);
        assert!(small.weight(2) > 0.0);
    }

    #[test]
    fn test_empty_leaf_distribution() {
        let leaf = leaf_distribution(&counts(&[0.0, 0.0]), 2, LeafDistType::Laplace, 1.0);
        assert!(leaf.is_empty());
        assert_eq!(vec![0.0, 0.0, 0.0], leaf.probabilities());
    }

    #[test]
    fn test_kullback_leibler_distance() {
        let p = [0.0, 0.5, 0.5];
        let q = [0.0, 0.9, 0.1];
        assert_eq!(0.0, kullback_leibler_distance(&p, &p));
        assert!(kullback_leibler_distance(&p, &q) > 0.0);
        assert!(kullback_leibler_distance(&q, &p) > 0.0);
        assert_eq!(f64::INFINITY, kullback_leibler_distance(&p, &[0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_parse_leaf_dist_type() {
        assert_eq!(LeafDistType::Laplace, "Laplace".parse().unwrap());
        assert!("Nope".parse::<LeafDistType>().is_err());
    }
}
