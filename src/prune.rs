//! Pruning
//!
//! Bottom-up simplification of a grown tree. Every split node is compared,
//! after its children were resolved, with the leaf it would become and
//! optionally with its largest child grafted in its place.
use crate::categorizer::{Categorizer, LeafPolicy};
use crate::category::Category;
use crate::constants::EPSILON;
use crate::data::Dataset;
use crate::distribution::{kullback_leibler_distance, leaf_distribution, CategoryDist, LeafDistType};
use crate::errors::TreeError;
use crate::graph::NodeId;
use crate::loss::LossMatrix;
use crate::tree::DecisionTree;
use crate::utils::{items_to_strings, pessimistic_errors};
use hashbrown::HashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruningMethod {
    None,
    /// Pessimistic errors of the leaf against those of the subtree, the
    /// factor is the `z` of the Wilson upper bound.
    Confidence,
    /// Errors plus `factor * sqrt(leaves * weight)`.
    Penalty,
    /// Error reduction per extra leaf must exceed the factor.
    Linear,
    /// Weighted KL divergence of the children from the node must reach the factor.
    KLDistance,
    /// Expected loss with the minority weight inflated to its pessimistic value.
    LossConfidence,
    /// Expected loss of the Laplace corrected distribution.
    LossLaplace,
}

impl FromStr for PruningMethod {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(PruningMethod::None),
            "Confidence" => Ok(PruningMethod::Confidence),
            "Penalty" => Ok(PruningMethod::Penalty),
            "Linear" => Ok(PruningMethod::Linear),
            "KLDistance" => Ok(PruningMethod::KLDistance),
            "LossConfidence" => Ok(PruningMethod::LossConfidence),
            "LossLaplace" => Ok(PruningMethod::LossLaplace),
            _ => Err(TreeError::ParseString(
                s.to_string(),
                "PruningMethod".to_string(),
                items_to_strings(vec![
                    "None",
                    "Confidence",
                    "Penalty",
                    "Linear",
                    "KLDistance",
                    "LossConfidence",
                    "LossLaplace",
                ]),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneOptions {
    pub method: PruningMethod,
    pub factor: f64,
    /// Also consider replacing a node with its largest child.
    pub branch_replacement: bool,
    pub policy: LeafPolicy,
}

/// What a pruning pass did to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PruneReport {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub leaves_before: usize,
    pub leaves_after: usize,
    pub pruned_to_leaf: usize,
    pub replaced_by_child: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PruneAction {
    Keep,
    ToLeaf,
    ToChild(NodeId),
}

/// Prune `tree` in place with the training instances of `dataset`.
pub fn prune_tree(
    tree: &mut DecisionTree,
    dataset: &Dataset,
    options: &PruneOptions,
    tie_break: &[Category],
) -> Result<PruneReport, TreeError> {
    let mut report = PruneReport {
        nodes_before: tree.num_nodes(),
        leaves_before: tree.num_leaves(),
        ..Default::default()
    };
    if options.method != PruningMethod::None {
        let root = tree.root().ok_or(TreeError::NoRoot)?;
        let pruner = Pruner {
            options,
            dataset,
            loss_matrix: dataset.loss_matrix(),
        };
        pruner.prune_node(tree, root, &dataset.instances(), tie_break, &mut report)?;
    }
    report.nodes_after = tree.num_nodes();
    report.leaves_after = tree.num_leaves();
    info!(
        "Pruning with {:?}: nodes {} -> {}, leaves {} -> {}.",
        options.method, report.nodes_before, report.nodes_after, report.leaves_before, report.leaves_after
    );
    Ok(report)
}

struct Pruner<'a> {
    options: &'a PruneOptions,
    dataset: &'a Dataset,
    loss_matrix: LossMatrix,
}

impl<'a> Pruner<'a> {
    fn prune_node(
        &self,
        tree: &mut DecisionTree,
        node: NodeId,
        instances: &[usize],
        tie_break: &[Category],
        report: &mut PruneReport,
    ) -> Result<(), TreeError> {
        if tree.categorizer(node)?.is_leaf() {
            return Ok(());
        }
        let counts = self.dataset.label_counts(instances);
        let child_tie_break = self.options.policy.child_tie_break(tie_break, &counts);
        let parts = tree.route_instances(node, self.dataset, instances)?;
        for (child, part) in &parts {
            self.prune_node(tree, *child, part, &child_tie_break, report)?;
        }

        match self.evaluate(tree, node, instances, &counts, &parts, tie_break)? {
            PruneAction::Keep => (),
            PruneAction::ToLeaf => {
                debug!("Pruning node {} at level {} to a leaf.", node, tree.node(node)?.level);
                tree.delete_subtree(node, Some(node))?;
                let fallback = counts.best_category(tie_break);
                let leaf = self
                    .options
                    .policy
                    .make_leaf(&counts, tie_break, fallback, self.dataset.schema());
                let info = tree.node_mut(node)?;
                info.categorizer = Categorizer::Leaf(leaf);
                info.stats.distribution = counts;
                report.pruned_to_leaf += 1;
            }
            PruneAction::ToChild(child) => {
                debug!("Replacing node {} with its child {}.", node, child);
                tree.delete_subtree(node, Some(child))?;
                tree.distribute_instances(node, self.dataset, instances, &self.options.policy, tie_break)?;
                report.replaced_by_child += 1;
            }
        }
        Ok(())
    }

    fn evaluate(
        &self,
        tree: &DecisionTree,
        node: NodeId,
        instances: &[usize],
        counts: &CategoryDist,
        parts: &[(NodeId, Vec<usize>)],
        tie_break: &[Category],
    ) -> Result<PruneAction, TreeError> {
        let f = self.options.factor;
        let weight = counts.total();
        let leaves = tree.leaves_under(node)?;
        let subtree_errors = leaves
            .iter()
            .map(|l| tree.leaf_errors(*l))
            .sum::<Result<f64, TreeError>>()?;
        let leaf_dists = leaves
            .iter()
            .map(|l| tree.node(*l).map(|n| &n.stats.distribution))
            .collect::<Result<Vec<_>, TreeError>>()?;
        let leaf_predictions = leaves
            .iter()
            .map(|l| tree.categorizer(*l)?.leaf().map(|leaf| leaf.prediction.category))
            .collect::<Result<Vec<_>, TreeError>>()?;
        let prediction = counts.best_category(tie_break);
        let leaf_errors = weight - counts.weight(prediction);

        let prune = match self.options.method {
            PruningMethod::None => false,
            PruningMethod::Confidence => {
                let leaf_pess = pessimistic_errors(leaf_errors, weight, f);
                let mut subtree_pess = 0.0;
                for (l, dist) in leaves.iter().zip(&leaf_dists) {
                    subtree_pess += pessimistic_errors(tree.leaf_errors(*l)?, dist.total(), f);
                }
                let graft = if self.options.branch_replacement {
                    self.graft_errors(tree, parts, instances, f)
                } else {
                    None
                };
                if leaf_pess <= subtree_pess + EPSILON && graft.map_or(true, |(_, g)| leaf_pess <= g + EPSILON) {
                    true
                } else if let Some((child, _)) = graft.filter(|(_, g)| *g < subtree_pess - EPSILON) {
                    return Ok(PruneAction::ToChild(child));
                } else {
                    false
                }
            }
            PruningMethod::Penalty => {
                let leaf_cost = leaf_errors + f * weight.sqrt();
                let subtree_cost = subtree_errors + f * (leaves.len() as f64 * weight).sqrt();
                leaf_cost <= subtree_cost + EPSILON
            }
            PruningMethod::Linear => {
                let extra_leaves = leaves.len().saturating_sub(1).max(1) as f64;
                (leaf_errors - subtree_errors) / extra_leaves <= f + EPSILON
            }
            PruningMethod::KLDistance => {
                if weight <= EPSILON {
                    true
                } else {
                    let parent = counts.probabilities();
                    let mut distance = 0.0;
                    for (_, part) in parts {
                        let child = self.dataset.label_counts(part);
                        let child_weight = child.total();
                        if child_weight > EPSILON {
                            distance += child_weight / weight
                                * kullback_leibler_distance(&child.probabilities(), &parent);
                        }
                    }
                    distance < f
                }
            }
            PruningMethod::LossConfidence => {
                let leaf_loss = self.pessimistic_loss(counts, prediction, f);
                let subtree_loss: f64 = leaf_dists
                    .iter()
                    .zip(&leaf_predictions)
                    .map(|(d, p)| self.pessimistic_loss(d, *p, f))
                    .sum();
                leaf_loss <= subtree_loss + EPSILON
            }
            PruningMethod::LossLaplace => {
                let leaf_loss = self.laplace_loss(counts, prediction);
                let subtree_loss: f64 = leaf_dists
                    .iter()
                    .zip(&leaf_predictions)
                    .map(|(d, p)| self.laplace_loss(d, *p))
                    .sum();
                leaf_loss <= subtree_loss + EPSILON
            }
        };
        Ok(if prune { PruneAction::ToLeaf } else { PruneAction::Keep })
    }

    /// Pessimistic errors of grafting the heaviest child in place of the node,
    /// with every leaf of the graft refit to the instances it would receive.
    /// `None` when some instance cannot be routed through the graft.
    fn graft_errors(
        &self,
        tree: &DecisionTree,
        parts: &[(NodeId, Vec<usize>)],
        instances: &[usize],
        z: f64,
    ) -> Option<(NodeId, f64)> {
        let mut child: Option<(NodeId, f64)> = None;
        for (c, part) in parts {
            let w = self.dataset.total_weight(part);
            match child {
                Some((_, best)) if w <= best => (),
                _ => child = Some((*c, w)),
            }
        }
        let (child, _) = child?;
        let mut leaf_counts: HashMap<NodeId, CategoryDist> = HashMap::new();
        for i in instances {
            let row = self.dataset.row(*i);
            let leaf = self.leaf_from(tree, child, &row).ok()?;
            leaf_counts
                .entry(leaf)
                .or_insert_with(|| CategoryDist::new(self.dataset.num_labels()))
                .add(self.dataset.label_category(*i), self.dataset.weight(*i));
        }
        let errors = leaf_counts
            .values()
            .map(|d| {
                let best = d.known().map(|(_, w)| w).fold(0.0, f64::max);
                pessimistic_errors(d.total() - best, d.total(), z)
            })
            .sum();
        Some((child, errors))
    }

    fn leaf_from(&self, tree: &DecisionTree, start: NodeId, row: &[f64]) -> Result<NodeId, TreeError> {
        let mut node = start;
        loop {
            let categorizer = tree.categorizer(node)?;
            if categorizer.is_leaf() {
                return Ok(node);
            }
            node = tree.graph().get_child(node, categorizer.branch(row)?)?;
        }
    }

    /// Expected loss of predicting `predicted` once the weight of every other
    /// category is raised to its pessimistic estimate.
    fn pessimistic_loss(&self, dist: &CategoryDist, predicted: Category, z: f64) -> f64 {
        let total = dist.total();
        if total <= EPSILON {
            return 0.0;
        }
        dist.known()
            .filter(|(actual, _)| *actual != predicted)
            .map(|(actual, w)| pessimistic_errors(w, total, z) * self.loss_matrix.loss(actual, predicted))
            .sum()
    }

    /// Expected loss of predicting `predicted` under the Laplace corrected distribution.
    fn laplace_loss(&self, dist: &CategoryDist, predicted: Category) -> f64 {
        if dist.total() <= EPSILON {
            return 0.0;
        }
        let smoothed = leaf_distribution(dist, predicted, LeafDistType::Laplace, self.options.factor);
        self.loss_matrix.expected_loss(&smoothed, predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::AttributeCategorizer;
    use crate::category::FIRST_CATEGORY;
    use crate::data::{Attribute, Schema};
    use crate::distribution::tie_break_order;
    use crate::utils::approx_eq;
    use crate::inducer::TreeInducer;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn options(method: PruningMethod, factor: f64) -> PruneOptions {
        PruneOptions {
            method,
            factor,
            branch_replacement: false,
            policy: LeafPolicy::default(),
        }
    }

    fn grow(dataset: &Dataset) -> (DecisionTree, Vec<Category>) {
        let inducer = TreeInducer::default().set_pruning_method(PruningMethod::None);
        let (tree, _) = inducer.train(dataset).unwrap();
        let tie_break = tie_break_order(&dataset.label_counts(&dataset.instances()));
        (tree, tie_break)
    }

    // Label follows `a` with 20% noise, `b` and `x` are noise.
    fn noisy(seed: u64, rows: usize) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let schema = Schema::new(
            vec![
                Attribute::nominal("a", &["a0", "a1", "a2"]),
                Attribute::nominal("b", &["b0", "b1", "b2", "b3"]),
                Attribute::numeric("x"),
            ],
            Attribute::nominal("label", &["n", "y"]),
        );
        let mut records = Vec::with_capacity(rows);
        let mut labels = Vec::with_capacity(rows);
        for _ in 0..rows {
            let a = rng.gen_range(0..3);
            let b = rng.gen_range(0..4);
            let x: f64 = rng.gen_range(0.0..100.0);
            let mut label = usize::from(a == 1);
            if rng.gen_bool(0.2) {
                label = 1 - label;
            }
            let a = if rng.gen_bool(0.05) { f64::NAN } else { a as f64 };
            records.push(vec![a, b as f64, x.round()]);
            labels.push(label);
        }
        Dataset::from_rows(schema, &records, labels, None).unwrap()
    }

    // A split that carries information but does not change the majority.
    fn uninformative() -> Dataset {
        let schema = Schema::new(
            vec![Attribute::nominal("A", &["a0", "a1"])],
            Attribute::nominal("label", &["n", "y"]),
        );
        let records: Vec<Vec<f64>> = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0].iter().map(|v| vec![*v]).collect();
        Dataset::from_rows(schema, &records, vec![0, 0, 0, 0, 1, 0, 0, 1], None).unwrap()
    }

    fn separable() -> Dataset {
        let schema = Schema::new(
            vec![Attribute::nominal("A", &["a0", "a1"])],
            Attribute::nominal("label", &["n", "y"]),
        );
        let records: Vec<Vec<f64>> = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0].iter().map(|v| vec![*v]).collect();
        Dataset::from_rows(schema, &records, vec![0, 0, 0, 1, 1, 1], None).unwrap()
    }

    // Label counts `(n, y)` for each value of the single attribute `A`.
    fn value_counts(a0: (usize, usize), a1: (usize, usize), loss_matrix: Option<LossMatrix>) -> Dataset {
        let mut schema = Schema::new(
            vec![Attribute::nominal("A", &["a0", "a1"])],
            Attribute::nominal("label", &["n", "y"]),
        );
        if let Some(m) = loss_matrix {
            schema = schema.with_loss_matrix(m);
        }
        let mut records = Vec::new();
        let mut labels = Vec::new();
        for (value, (n, y)) in [a0, a1].into_iter().enumerate() {
            for label in std::iter::repeat(0).take(n).chain(std::iter::repeat(1).take(y)) {
                records.push(vec![value as f64]);
                labels.push(label);
            }
        }
        Dataset::from_rows(schema, &records, labels, None).unwrap()
    }

    // Root on `A` with one leaf per value and no UNKNOWN edge.
    fn stump(data: &Dataset) -> (DecisionTree, Vec<Category>) {
        let split = Categorizer::Attribute(AttributeCategorizer {
            attribute: 0,
            name: "A".to_string(),
            values: vec!["a0".to_string(), "a1".to_string()],
        });
        let policy = LeafPolicy::default();
        let mut tree = DecisionTree::new();
        let root = tree.create_node(split.clone(), 0);
        tree.set_root(root).unwrap();
        for category in [FIRST_CATEGORY, FIRST_CATEGORY + 1] {
            let leaf = policy.make_leaf(&CategoryDist::new(2), &[], FIRST_CATEGORY, data.schema());
            let child = tree.create_node(Categorizer::Leaf(leaf), 1);
            tree.connect(root, child, split.edge_label(category)).unwrap();
        }
        let tie_break = tie_break_order(&data.label_counts(&data.instances()));
        tree.distribute_instances(root, data, &data.instances(), &policy, &tie_break)
            .unwrap();
        (tree, tie_break)
    }

    fn nodes_after_pruning(data: &Dataset, method: PruningMethod, factor: f64) -> usize {
        let (mut tree, tie_break) = stump(data);
        assert_eq!(3, tree.num_nodes());
        prune_tree(&mut tree, data, &options(method, factor), &tie_break).unwrap();
        tree.num_nodes()
    }

    fn costly() -> LossMatrix {
        // Predicting `n` for a `y` costs ten times the opposite mistake.
        LossMatrix::new(vec![vec![0.0, 1.0], vec![10.0, 0.0]]).unwrap()
    }

    #[test]
    fn test_penalty_threshold() {
        // Leaf 2 + f * sqrt(8) against subtree f * sqrt(2 * 8), equal at f = 2 / (4 - sqrt(8)) = 1.707.
        let data = value_counts((6, 0), (0, 2), None);
        assert_eq!(3, nodes_after_pruning(&data, PruningMethod::Penalty, 1.6));
        assert_eq!(1, nodes_after_pruning(&data, PruningMethod::Penalty, 1.8));
    }

    #[test]
    fn test_linear_threshold() {
        // Two errors saved by one extra leaf.
        let data = value_counts((6, 0), (0, 2), None);
        assert_eq!(3, nodes_after_pruning(&data, PruningMethod::Linear, 1.9));
        assert_eq!(1, nodes_after_pruning(&data, PruningMethod::Linear, 2.1));
        let same = value_counts((3, 1), (3, 1), None);
        assert_eq!(1, nodes_after_pruning(&same, PruningMethod::Linear, 0.0));
    }

    #[test]
    fn test_loss_confidence_scores_the_predicted_category() {
        let data = value_counts((6, 0), (0, 2), Some(costly()));
        let opts = options(PruningMethod::LossConfidence, 0.0);
        let pruner = Pruner {
            options: &opts,
            dataset: &data,
            loss_matrix: data.loss_matrix(),
        };
        let root = data.label_counts(&data.instances());
        // A leaf predicting `n` on 6 n / 2 y costs 20, whatever the cheaper category.
        assert!(approx_eq(20.0, pruner.pessimistic_loss(&root, 1, 0.0)));
        assert!(approx_eq(
            10.0 * pessimistic_errors(2.0, 8.0, 0.6925),
            pruner.pessimistic_loss(&root, 1, 0.6925)
        ));

        // Leaf 29.4 against 4.4 + 0.4 for the separating split.
        assert_eq!(3, nodes_after_pruning(&data, PruningMethod::LossConfidence, 0.6925));
        // Leaf 29.4 against two leaves of 16.8 that predict `n` as well.
        let same = value_counts((3, 1), (3, 1), Some(costly()));
        assert_eq!(1, nodes_after_pruning(&same, PruningMethod::LossConfidence, 0.6925));
    }

    #[test]
    fn test_loss_laplace_scores_the_predicted_category() {
        let data = value_counts((6, 0), (0, 2), Some(costly()));
        let opts = options(PruningMethod::LossLaplace, 1.0);
        let pruner = Pruner {
            options: &opts,
            dataset: &data,
            loss_matrix: data.loss_matrix(),
        };
        // Smoothed `y` weight is 8 * 3 / 10.
        let root = data.label_counts(&data.instances());
        assert!(approx_eq(24.0, pruner.laplace_loss(&root, 1)));
        assert!(approx_eq(5.6, pruner.laplace_loss(&root, 2)));

        // Leaf 24 against 7.5 + 0.5.
        assert_eq!(3, nodes_after_pruning(&data, PruningMethod::LossLaplace, 1.0));
        // Leaf 24 against 13.33 + 13.33, both children predict `n`.
        let same = value_counts((3, 1), (3, 1), Some(costly()));
        assert_eq!(1, nodes_after_pruning(&same, PruningMethod::LossLaplace, 1.0));
    }

    #[test]
    fn test_confidence_zero_collapses_without_improvement() {
        let data = uninformative();
        let (mut tree, tie_break) = grow(&data);
        assert_eq!(4, tree.num_nodes());
        let report = prune_tree(&mut tree, &data, &options(PruningMethod::Confidence, 0.0), &tie_break).unwrap();
        assert_eq!(1, tree.num_nodes());
        assert_eq!(1, report.pruned_to_leaf);
        let root = tree.root().unwrap();
        assert_eq!(1, tree.categorizer(root).unwrap().leaf().unwrap().prediction.category);
        assert_eq!(2.0, tree.leaf_errors(root).unwrap());
    }

    #[test]
    fn test_confidence_zero_keeps_improvement() {
        let data = separable();
        let (mut tree, tie_break) = grow(&data);
        let before = tree.num_nodes();
        let report = prune_tree(&mut tree, &data, &options(PruningMethod::Confidence, 0.0), &tie_break).unwrap();
        assert_eq!(before, tree.num_nodes());
        assert_eq!(0, report.pruned_to_leaf);
    }

    #[test]
    fn test_pruning_monotonicity() {
        for seed in [1, 2, 3] {
            let data = noisy(seed, 300);
            let (grown, tie_break) = grow(&data);
            for method in [
                PruningMethod::Confidence,
                PruningMethod::Penalty,
                PruningMethod::Linear,
                PruningMethod::KLDistance,
                PruningMethod::LossConfidence,
                PruningMethod::LossLaplace,
            ] {
                let mut tree = grown.clone();
                let factor = if method == PruningMethod::KLDistance { 0.05 } else { 0.6925 };
                let report = prune_tree(&mut tree, &data, &options(method, factor), &tie_break).unwrap();
                assert!(report.leaves_after <= report.leaves_before, "{:?}", method);
                assert!(tree.num_leaves() <= grown.num_leaves(), "{:?}", method);
            }
            for branch_replacement in [false, true] {
                let mut tree = grown.clone();
                let opts = PruneOptions {
                    branch_replacement,
                    ..options(PruningMethod::Confidence, 0.6925)
                };
                prune_tree(&mut tree, &data, &opts, &tie_break).unwrap();
                assert!(tree.num_leaves() <= grown.num_leaves());
                assert!(
                    tree.pessimistic_errors(0.6925).unwrap() <= grown.pessimistic_errors(0.6925).unwrap() + 1e-6
                );
                // Every training instance still reaches a leaf.
                for i in 0..data.rows() {
                    assert!(tree.categorize(&data.row(i)).is_ok());
                }
            }
        }
    }

    #[test]
    fn test_kl_distance_threshold() {
        let data = separable();
        let (grown, tie_break) = grow(&data);
        let mut kept = grown.clone();
        prune_tree(&mut kept, &data, &options(PruningMethod::KLDistance, 0.5), &tie_break).unwrap();
        // Both children sit one bit away from the parent.
        assert_eq!(grown.num_nodes(), kept.num_nodes());
        let mut pruned = grown.clone();
        prune_tree(&mut pruned, &data, &options(PruningMethod::KLDistance, 1.5), &tie_break).unwrap();
        assert_eq!(1, pruned.num_nodes());
    }

    #[test]
    fn test_no_pruning() {
        let data = noisy(7, 100);
        let (mut tree, tie_break) = grow(&data);
        let report = prune_tree(&mut tree, &data, &options(PruningMethod::None, 0.0), &tie_break).unwrap();
        assert_eq!(report.nodes_before, report.nodes_after);
        assert_eq!(0, report.pruned_to_leaf + report.replaced_by_child);
    }

    #[test]
    fn test_parse_pruning_method() {
        assert_eq!(PruningMethod::KLDistance, "KLDistance".parse().unwrap());
        assert!("Reduced".parse::<PruningMethod>().is_err());
    }
}
