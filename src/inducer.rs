//! Inducer
//!
//! Grows a decision tree top down. At every node the best split is chosen,
//! the instances are partitioned by it and each partition is grown into a
//! subtree of its own. The grown tree is then pruned bottom up.
use crate::categorizer::{Categorizer, LeafPolicy};
use crate::category::{Category, UNKNOWN_CATEGORY};
use crate::constants::{
    DEFAULT_CONFIDENCE_Z, DEFAULT_LEAF_DIST_FACTOR, DEFAULT_LOWER_BOUND_MIN_SPLIT_WEIGHT,
    DEFAULT_MIN_SPLIT_WEIGHT_PERCENT, DEFAULT_UPPER_BOUND_MIN_SPLIT_WEIGHT,
};
use crate::data::Dataset;
use crate::distribution::{tie_break_order, CategoryDist, LeafDistType};
use crate::errors::TreeError;
use crate::graph::NodeId;
use crate::prune::{prune_tree, PruneOptions, PruneReport, PruningMethod};
use crate::splitter::{MinSplitWeight, SplitCandidate, SplitCriterion, SplitEvaluator};
use crate::tree::DecisionTree;
use crate::utils::{pessimistic_errors, validate_float_parameter, validate_positive_float_parameter};
use hashbrown::HashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Top down decision tree inducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeInducer {
    /// Nodes at this level become leaves, the root is at level 0.
    pub max_level: Option<usize>,
    /// Smallest weight a branch needs for a split to count.
    pub lower_bound_min_split_weight: f64,
    /// Largest weight ever required of a branch.
    pub upper_bound_min_split_weight: f64,
    /// Fraction of the node weight per label value required of a branch,
    /// clamped between the two bounds.
    pub min_split_weight_percent: f64,
    /// Nominal attributes are held to the lower bound only.
    pub nominal_lbound_only: bool,
    pub split_criterion: SplitCriterion,
    pub leaf_dist_type: LeafDistType,
    /// Correction used by the Laplace and evidence projection leaves.
    pub leaf_dist_factor: f64,
    pub pruning_method: PruningMethod,
    pub pruning_factor: f64,
    /// Confidence pruning may replace a node with its largest child.
    pub pruning_branch_replacement: bool,
    /// Penalise numeric splits by the number of thresholds tried.
    pub cont_mdl_adjust: bool,
    /// Always create an edge for unknown values, even when none were seen.
    pub unknown_edges: bool,
    /// Children break ties in favour of the majority of their parent.
    pub parent_tie_breaking: bool,
}

impl Default for TreeInducer {
    fn default() -> Self {
        TreeInducer {
            max_level: None,
            lower_bound_min_split_weight: DEFAULT_LOWER_BOUND_MIN_SPLIT_WEIGHT,
            upper_bound_min_split_weight: DEFAULT_UPPER_BOUND_MIN_SPLIT_WEIGHT,
            min_split_weight_percent: DEFAULT_MIN_SPLIT_WEIGHT_PERCENT,
            nominal_lbound_only: true,
            split_criterion: SplitCriterion::MutualInfo,
            leaf_dist_type: LeafDistType::FrequencyCounts,
            leaf_dist_factor: DEFAULT_LEAF_DIST_FACTOR,
            pruning_method: PruningMethod::Confidence,
            pruning_factor: DEFAULT_CONFIDENCE_Z,
            pruning_branch_replacement: false,
            cont_mdl_adjust: true,
            unknown_edges: true,
            parent_tie_breaking: true,
        }
    }
}

/// Error counts of a grown subtree, summed over its leaves.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GrowthStats {
    pub errors: f64,
    pub pessimistic_errors: f64,
    pub num_leaves: usize,
}

impl GrowthStats {
    fn add(&mut self, other: GrowthStats) {
        self.errors += other.errors;
        self.pessimistic_errors += other.pessimistic_errors;
        self.num_leaves += other.num_leaves;
    }
}

/// Bookkeeping of one call to [`TreeInducer::train`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Number of split nodes created per attribute.
    pub attribute_usage: HashMap<usize, usize>,
    pub nodes_created: usize,
    pub max_level: usize,
    pub growth: GrowthStats,
    pub pruning: PruneReport,
}

impl TreeInducer {
    /// Create an inducer with the default options.
    pub fn new() -> Self {
        TreeInducer::default()
    }

    pub fn validate_parameters(&self) -> Result<(), TreeError> {
        validate_positive_float_parameter(self.lower_bound_min_split_weight, "lower_bound_min_split_weight")?;
        validate_float_parameter(
            self.upper_bound_min_split_weight,
            self.lower_bound_min_split_weight,
            f64::INFINITY,
            "upper_bound_min_split_weight",
        )?;
        validate_float_parameter(self.min_split_weight_percent, 0.0, 1.0, "min_split_weight_percent")?;
        validate_positive_float_parameter(self.leaf_dist_factor, "leaf_dist_factor")?;
        validate_positive_float_parameter(self.pruning_factor, "pruning_factor")?;
        Ok(())
    }

    /// Options that depend on the data set.
    fn validate_for(&self, dataset: &Dataset) -> Result<(), TreeError> {
        if self.pruning_method == PruningMethod::LossConfidence && dataset.num_labels() != 2 {
            return Err(TreeError::InvalidParameter(
                "pruning_method".to_string(),
                "a label with two values for LossConfidence".to_string(),
                format!("{} label values", dataset.num_labels()),
            ));
        }
        Ok(())
    }

    /// `z` of the pessimistic error estimates reported by growth.
    fn confidence_z(&self) -> f64 {
        if self.pruning_method == PruningMethod::Confidence {
            self.pruning_factor
        } else {
            DEFAULT_CONFIDENCE_Z
        }
    }

    fn leaf_policy(&self) -> LeafPolicy {
        LeafPolicy {
            dist_type: self.leaf_dist_type,
            factor: self.leaf_dist_factor,
            parent_tie_breaking: self.parent_tie_breaking,
        }
    }

    fn split_evaluator(&self) -> SplitEvaluator {
        SplitEvaluator {
            min_split: MinSplitWeight {
                lower: self.lower_bound_min_split_weight,
                upper: self.upper_bound_min_split_weight,
                percent: self.min_split_weight_percent,
                nominal_lbound_only: self.nominal_lbound_only,
            },
            criterion: self.split_criterion,
            cont_mdl_adjust: self.cont_mdl_adjust,
        }
    }

    pub fn prune_options(&self) -> PruneOptions {
        PruneOptions {
            method: self.pruning_method,
            factor: self.pruning_factor,
            branch_replacement: self.pruning_branch_replacement,
            policy: self.leaf_policy(),
        }
    }

    /// Grow and prune a tree on every instance of `dataset`.
    pub fn train(&self, dataset: &Dataset) -> Result<(DecisionTree, TrainingStats), TreeError> {
        self.validate_parameters()?;
        self.validate_for(dataset)?;

        let instances = dataset.instances();
        let tie_break = tie_break_order(&dataset.label_counts(&instances));
        let mut tree = DecisionTree::new();
        let mut stats = TrainingStats::default();
        let root_inducer = SubInducer {
            inducer: self,
            evaluator: self.split_evaluator(),
            policy: self.leaf_policy(),
            level: 0,
            tie_break: tie_break.clone(),
        };
        let majority = dataset.label_counts(&instances).best_category(&tie_break);
        let (root, growth) = root_inducer.induce_decision_tree(&mut tree, dataset, &instances, majority, &mut stats)?;
        tree.set_root(root)?;
        stats.growth = growth;
        info!(
            "Grew tree with {} nodes, {} leaves and {} levels, {} training errors.",
            tree.num_nodes(),
            growth.num_leaves,
            stats.max_level + 1,
            growth.errors
        );

        stats.pruning = prune_tree(&mut tree, dataset, &self.prune_options(), &tie_break)?;
        Ok((tree, stats))
    }

    // Set methods for parameters

    /// Nodes at `max_level` or deeper are grown as leaves.
    pub fn set_max_level(mut self, max_level: Option<usize>) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn set_lower_bound_min_split_weight(mut self, lower_bound: f64) -> Self {
        self.lower_bound_min_split_weight = lower_bound;
        self
    }

    pub fn set_upper_bound_min_split_weight(mut self, upper_bound: f64) -> Self {
        self.upper_bound_min_split_weight = upper_bound;
        self
    }

    pub fn set_min_split_weight_percent(mut self, percent: f64) -> Self {
        self.min_split_weight_percent = percent;
        self
    }

    pub fn set_nominal_lbound_only(mut self, nominal_lbound_only: bool) -> Self {
        self.nominal_lbound_only = nominal_lbound_only;
        self
    }

    pub fn set_split_criterion(mut self, split_criterion: SplitCriterion) -> Self {
        self.split_criterion = split_criterion;
        self
    }

    pub fn set_leaf_dist_type(mut self, leaf_dist_type: LeafDistType) -> Self {
        self.leaf_dist_type = leaf_dist_type;
        self
    }

    pub fn set_leaf_dist_factor(mut self, leaf_dist_factor: f64) -> Self {
        self.leaf_dist_factor = leaf_dist_factor;
        self
    }

    pub fn set_pruning_method(mut self, pruning_method: PruningMethod) -> Self {
        self.pruning_method = pruning_method;
        self
    }

    pub fn set_pruning_factor(mut self, pruning_factor: f64) -> Self {
        self.pruning_factor = pruning_factor;
        self
    }

    pub fn set_pruning_branch_replacement(mut self, pruning_branch_replacement: bool) -> Self {
        self.pruning_branch_replacement = pruning_branch_replacement;
        self
    }

    pub fn set_cont_mdl_adjust(mut self, cont_mdl_adjust: bool) -> Self {
        self.cont_mdl_adjust = cont_mdl_adjust;
        self
    }

    pub fn set_unknown_edges(mut self, unknown_edges: bool) -> Self {
        self.unknown_edges = unknown_edges;
        self
    }

    pub fn set_parent_tie_breaking(mut self, parent_tie_breaking: bool) -> Self {
        self.parent_tie_breaking = parent_tie_breaking;
        self
    }

    /// Dump the options as a json object
    pub fn json_dump(&self) -> Result<String, TreeError> {
        match serde_json::to_string(self) {
            Ok(s) => Ok(s),
            Err(e) => Err(TreeError::UnableToWrite(e.to_string())),
        }
    }

    /// Load the options from a json string
    pub fn from_json(json_str: &str) -> Result<Self, TreeError> {
        match serde_json::from_str::<TreeInducer>(json_str) {
            Ok(m) => Ok(m),
            Err(e) => Err(TreeError::UnableToRead(e.to_string())),
        }
    }
}

/// Growth state of one recursive call: the shared options plus the level and
/// tie break order of the subtree being grown.
struct SubInducer<'a> {
    inducer: &'a TreeInducer,
    evaluator: SplitEvaluator,
    policy: LeafPolicy,
    level: usize,
    tie_break: Vec<Category>,
}

impl<'a> SubInducer<'a> {
    fn child(&self, tie_break: Vec<Category>) -> SubInducer<'a> {
        SubInducer {
            inducer: self.inducer,
            evaluator: self.evaluator,
            policy: self.policy,
            level: self.level + 1,
            tie_break,
        }
    }

    fn induce_decision_tree(
        &self,
        tree: &mut DecisionTree,
        dataset: &Dataset,
        instances: &[usize],
        fallback: Category,
        stats: &mut TrainingStats,
    ) -> Result<(NodeId, GrowthStats), TreeError> {
        let counts = dataset.label_counts(instances);
        let at_max_level = self.inducer.max_level.map_or(false, |m| self.level >= m);
        let split = if counts.num_nonzero() <= 1 || at_max_level {
            None
        } else {
            self.evaluator.best_split(dataset, instances)?
        };
        match split {
            None => self.make_leaf(tree, dataset, counts, fallback, stats),
            Some(split) => self.induce_tree_from_split(tree, dataset, instances, counts, &split, stats),
        }
    }

    fn make_leaf(
        &self,
        tree: &mut DecisionTree,
        dataset: &Dataset,
        counts: CategoryDist,
        fallback: Category,
        stats: &mut TrainingStats,
    ) -> Result<(NodeId, GrowthStats), TreeError> {
        let leaf = self.policy.make_leaf(&counts, &self.tie_break, fallback, dataset.schema());
        let weight = counts.total();
        let errors = (weight - counts.weight(leaf.prediction.category)).max(0.0);
        let node = self.create_node(tree, Categorizer::Leaf(leaf), counts, stats)?;
        Ok((
            node,
            GrowthStats {
                errors,
                pessimistic_errors: pessimistic_errors(errors, weight, self.inducer.confidence_z()),
                num_leaves: 1,
            },
        ))
    }

    fn create_node(
        &self,
        tree: &mut DecisionTree,
        categorizer: Categorizer,
        counts: CategoryDist,
        stats: &mut TrainingStats,
    ) -> Result<NodeId, TreeError> {
        let node = tree.create_node(categorizer, self.level);
        tree.node_mut(node)?.stats.distribution = counts;
        stats.nodes_created += 1;
        stats.max_level = stats.max_level.max(self.level);
        Ok(node)
    }

    fn induce_tree_from_split(
        &self,
        tree: &mut DecisionTree,
        dataset: &Dataset,
        instances: &[usize],
        counts: CategoryDist,
        split: &SplitCandidate,
        stats: &mut TrainingStats,
    ) -> Result<(NodeId, GrowthStats), TreeError> {
        let categorizer = split.categorizer(dataset.schema())?;
        debug!(
            "Level {}: splitting weight {} on {} with mutual information {:.4} and score {:.4}.",
            self.level,
            counts.total(),
            categorizer,
            split.mutual_info,
            split.score
        );
        *stats.attribute_usage.entry(split.attribute).or_insert(0) += 1;

        let mut parts: Vec<Vec<usize>> = vec![Vec::new(); categorizer.num_branches() + 1];
        for i in instances {
            let category = categorizer.branch_instance(dataset, *i)?;
            let slot = if category < parts.len() { category } else { UNKNOWN_CATEGORY };
            parts[slot].push(*i);
        }
        let majority = counts.best_category(&self.tie_break);
        let child = self.child(self.policy.child_tie_break(&self.tie_break, &counts));
        let num_labels = counts.num_labels();
        let node = self.create_node(tree, categorizer.clone(), counts, stats)?;

        let mut growth = GrowthStats::default();
        for (category, part) in parts.iter().enumerate() {
            if part.is_empty() && category == UNKNOWN_CATEGORY && !self.inducer.unknown_edges {
                continue;
            }
            let (child_node, child_growth) = if part.is_empty() {
                child.make_leaf(tree, dataset, CategoryDist::new(num_labels), majority, stats)?
            } else {
                child.induce_decision_tree(tree, dataset, part, majority, stats)?
            };
            tree.connect(node, child_node, categorizer.edge_label(category))?;
            growth.add(child_growth);
        }
        Ok((node, growth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::FIRST_CATEGORY;
    use crate::data::{Attribute, Schema};
    use crate::loss::LossMatrix;
    use crate::utils::approx_eq;
    use std::error::Error;
    use std::fs;

    // A decides the label, B does not.
    fn separable() -> Dataset {
        let schema = Schema::new(
            vec![Attribute::nominal("A", &["a0", "a1"]), Attribute::nominal("B", &["b0", "b1"])],
            Attribute::nominal("label", &["neg", "pos"]),
        );
        let records = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        Dataset::from_rows(schema, &records, vec![0, 0, 1, 1, 0, 0, 1, 1], None).unwrap()
    }

    fn weather() -> Result<Dataset, Box<dyn Error>> {
        let file = fs::read_to_string("resources/weather.csv")?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file.as_bytes());
        let outlook = ["sunny", "overcast", "rainy"];
        let boolean = ["FALSE", "TRUE"];
        let play = ["no", "yes"];
        let position = |values: &[&str], v: &str| -> f64 {
            values.iter().position(|x| *x == v).map(|p| p as f64).unwrap_or(f64::NAN)
        };
        let mut records = Vec::new();
        let mut labels = Vec::new();
        for record in reader.records() {
            let record = record?;
            let temperature = record[1].parse::<f64>().unwrap_or(f64::NAN);
            let humidity = record[2].parse::<f64>().unwrap_or(f64::NAN);
            records.push(vec![
                position(&outlook[..], &record[0]),
                temperature,
                humidity,
                position(&boolean[..], &record[3]),
            ]);
            labels.push(position(&play[..], &record[4]) as usize);
        }
        let schema = Schema::new(
            vec![
                Attribute::nominal("outlook", &outlook),
                Attribute::numeric("temperature"),
                Attribute::numeric("humidity"),
                Attribute::nominal("windy", &boolean),
            ],
            Attribute::nominal("play", &play),
        );
        Ok(Dataset::from_rows(schema, &records, labels, None)?)
    }

    #[test]
    fn test_separable_scenario() {
        let data = separable();
        let inducer = TreeInducer::default();
        let (mut tree, stats) = inducer.train(&data).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(Some(0), tree.categorizer(root).unwrap().attribute());
        assert_eq!(2, tree.num_nontrivial_leaves());
        assert_eq!(3, tree.num_leaves());
        assert_eq!(0.0, stats.growth.errors);
        assert_eq!(Some(&1), stats.attribute_usage.get(&0));
        assert_eq!(None, stats.attribute_usage.get(&1));

        let best = inducer.split_evaluator().best_split(&data, &data.instances()).unwrap().unwrap();
        assert!(approx_eq(1.0, best.mutual_info));

        let result = tree.test(&data, &data.loss_matrix()).unwrap();
        assert_eq!(0.0, result.errors);
        assert_eq!(FIRST_CATEGORY + 1, tree.categorize(&[1.0, 0.0]).unwrap().category);
        assert_eq!("neg", tree.categorize(&[0.0, 1.0]).unwrap().description);
    }

    #[test]
    fn test_four_instance_scenario() {
        let schema = Schema::new(
            vec![Attribute::nominal("A", &["x", "y"]), Attribute::nominal("B", &["0", "1"])],
            Attribute::nominal("label", &["l0", "l1"]),
        );
        let records = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let data = Dataset::from_rows(schema, &records, vec![0, 0, 1, 1], None).unwrap();
        for method in [
            PruningMethod::None,
            PruningMethod::Confidence,
            PruningMethod::Penalty,
            PruningMethod::Linear,
            PruningMethod::KLDistance,
            PruningMethod::LossConfidence,
            PruningMethod::LossLaplace,
        ] {
            let inducer = TreeInducer::default().set_pruning_method(method);
            let best = inducer.split_evaluator().best_split(&data, &data.instances()).unwrap().unwrap();
            assert_eq!(0, best.attribute);
            assert!(approx_eq(1.0, best.mutual_info));

            let (mut tree, stats) = inducer.train(&data).unwrap();
            let root = tree.root().unwrap();
            assert_eq!(Some(0), tree.categorizer(root).unwrap().attribute(), "{:?}", method);
            assert_eq!(2, tree.num_nontrivial_leaves(), "{:?}", method);
            assert_eq!(0.0, stats.growth.errors);
            for i in 0..data.rows() {
                assert_eq!(data.label_category(i), tree.categorize(&data.row(i)).unwrap().category);
            }
            assert_eq!(0.0, tree.test(&data, &data.loss_matrix()).unwrap().errors);
        }
    }

    #[test]
    fn test_single_label_scenario() {
        let schema = Schema::new(vec![Attribute::numeric("x")], Attribute::nominal("label", &["only"]));
        let records = vec![vec![1.0], vec![2.0], vec![3.0]];
        let data = Dataset::from_rows(schema, &records, vec![0, 0, 0], None).unwrap();
        let (tree, stats) = TreeInducer::default().train(&data).unwrap();
        assert_eq!(1, tree.num_nodes());
        assert_eq!(1, tree.num_leaves());
        assert_eq!(0.0, stats.growth.errors);
        assert_eq!(FIRST_CATEGORY, tree.categorize(&[10.0]).unwrap().category);
    }

    #[test]
    fn test_unknown_edges() {
        let data = separable();
        let (with_unknown, _) = TreeInducer::default().train(&data).unwrap();
        assert_eq!(4, with_unknown.num_nodes());
        // Missing values follow the empty UNKNOWN leaf, which predicts the parent majority.
        assert_eq!(FIRST_CATEGORY, with_unknown.categorize(&[f64::NAN, 0.0]).unwrap().category);

        let (without, _) = TreeInducer::default().set_unknown_edges(false).train(&data).unwrap();
        assert_eq!(3, without.num_nodes());
        assert!(matches!(
            without.categorize(&[f64::NAN, 0.0]),
            Err(TreeError::NoMatchingEdge(..))
        ));
    }

    #[test]
    fn test_max_level() {
        let data = separable();
        let (tree, _) = TreeInducer::default().set_max_level(Some(0)).train(&data).unwrap();
        assert_eq!(1, tree.num_nodes());
    }

    #[test]
    fn test_parameter_validation() {
        let data = separable();
        let inducer = TreeInducer::default()
            .set_lower_bound_min_split_weight(10.0)
            .set_upper_bound_min_split_weight(2.0);
        assert!(matches!(inducer.train(&data), Err(TreeError::InvalidParameter(..))));
        assert!(TreeInducer::default().set_min_split_weight_percent(1.5).validate_parameters().is_err());
        assert!(TreeInducer::default().set_pruning_factor(f64::NAN).validate_parameters().is_err());

        let schema = Schema::new(vec![Attribute::numeric("x")], Attribute::nominal("label", &["a", "b", "c"]));
        let three = Dataset::from_rows(schema, &[vec![1.0], vec![2.0], vec![3.0]], vec![0, 1, 2], None).unwrap();
        let loss_confidence = TreeInducer::default().set_pruning_method(PruningMethod::LossConfidence);
        assert!(matches!(loss_confidence.train(&three), Err(TreeError::InvalidParameter(..))));
        assert!(loss_confidence.train(&data).is_ok());
    }

    #[test]
    fn test_weather() -> Result<(), Box<dyn Error>> {
        let data = weather()?;
        assert_eq!(14, data.rows());
        let inducer = TreeInducer::default()
            .set_pruning_method(PruningMethod::None)
            .set_cont_mdl_adjust(false);
        let (tree, stats) = inducer.train(&data)?;
        assert_eq!(0.0, stats.growth.errors);
        assert_eq!(tree.num_leaves(), stats.growth.num_leaves);
        assert_eq!(tree.num_nodes(), stats.nodes_created);
        let result = tree.clone().test(&data, &data.loss_matrix())?;
        assert_eq!(0.0, result.errors);
        // Every non-root node has exactly one parent.
        let root = tree.root().ok_or(TreeError::NoRoot)?;
        for node in tree.graph().node_ids() {
            let parents = tree.graph().in_degree(node)?;
            assert_eq!(if node == root { 0 } else { 1 }, parents);
        }

        let (pruned, pruned_stats) = TreeInducer::default().train(&data)?;
        assert!(pruned_stats.pruning.leaves_after <= pruned_stats.pruning.leaves_before);
        assert_eq!(pruned.num_nodes(), pruned_stats.pruning.nodes_after);
        Ok(())
    }

    #[test]
    fn test_leaf_distributions_conserve_weight() -> Result<(), Box<dyn Error>> {
        let data = weather()?;
        for dist_type in [
            LeafDistType::AllOrNothing,
            LeafDistType::FrequencyCounts,
            LeafDistType::Laplace,
            LeafDistType::EvidenceProjection,
        ] {
            let inducer = TreeInducer::default().set_leaf_dist_type(dist_type);
            let (tree, _) = inducer.train(&data)?;
            for node in tree.graph().node_ids() {
                let info = tree.node(node)?;
                if let Categorizer::Leaf(leaf) = &info.categorizer {
                    assert!(approx_eq(leaf.distribution.total(), info.stats.distribution.total()));
                }
            }
            for i in 0..data.rows() {
                let row = data.row(i);
                let score = tree.score(&row)?;
                let predicted = tree.categorize(&row)?.category;
                let max = score.iter().copied().fold(0.0, f64::max);
                assert!(approx_eq(max, score[predicted]), "{:?}", dist_type);
            }
        }
        Ok(())
    }

    #[test]
    fn test_gain_ratio_and_loss_pruning() -> Result<(), Box<dyn Error>> {
        let data = weather()?;
        let loss = LossMatrix::new(vec![vec![0.0, 1.0], vec![5.0, 0.0]])?;
        let schema = data.schema().clone().with_loss_matrix(loss);
        let records: Vec<Vec<f64>> = (0..data.rows()).map(|i| data.row(i)).collect();
        let labels = (0..data.rows()).map(|i| data.label(i)).collect();
        let costly = Dataset::from_rows(schema, &records, labels, None)?;
        for method in [PruningMethod::LossConfidence, PruningMethod::LossLaplace] {
            let inducer = TreeInducer::default()
                .set_split_criterion(SplitCriterion::GainRatio)
                .set_pruning_method(method);
            let (tree, stats) = inducer.train(&costly)?;
            assert!(stats.pruning.leaves_after <= stats.pruning.leaves_before);
            assert!(tree.num_nodes() >= 1);
        }
        Ok(())
    }

    #[test]
    fn test_inducer_json() {
        let inducer = TreeInducer::default()
            .set_split_criterion(SplitCriterion::NormalizedMutualInfo)
            .set_max_level(Some(3));
        let json = inducer.json_dump().unwrap();
        assert_eq!(inducer, TreeInducer::from_json(&json).unwrap());
    }
}
