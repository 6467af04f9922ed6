//! Decision tree
//!
//! A rooted [`CategorizerGraph`] in which every node has at most one parent.
//! Split nodes route instances down their edges, leaves predict.
use crate::categorizer::{Categorizer, LeafPolicy, NodeLoss};
use crate::category::{AugCategory, Category, UNKNOWN_CATEGORY};
use crate::data::{Dataset, Matrix};
use crate::errors::TreeError;
use crate::graph::{CategorizerGraph, EdgeId, NodeId, NodeInfo};
use crate::loss::LossMatrix;
use crate::utils::pessimistic_errors;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DecisionTree {
    graph: CategorizerGraph,
    root: Option<NodeId>,
}

/// Weighted outcome of scoring a labeled data set with a tree.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TestResult {
    pub weight: f64,
    pub errors: f64,
    pub loss: f64,
}

impl TestResult {
    pub fn error_rate(&self) -> f64 {
        if self.weight > 0.0 {
            self.errors / self.weight
        } else {
            0.0
        }
    }

    pub fn mean_loss(&self) -> f64 {
        if self.weight > 0.0 {
            self.loss / self.weight
        } else {
            0.0
        }
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        DecisionTree::default()
    }

    /// Tree over a sparse graph, edge labels of a node need not be contiguous.
    pub fn new_sparse() -> Self {
        DecisionTree {
            graph: CategorizerGraph::new_sparse(),
            root: None,
        }
    }

    pub fn graph(&self) -> &CategorizerGraph {
        &self.graph
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn root_or_err(&self) -> Result<NodeId, TreeError> {
        self.root.ok_or(TreeError::NoRoot)
    }

    pub fn create_node(&mut self, categorizer: Categorizer, level: usize) -> NodeId {
        self.graph.create_node(categorizer, level)
    }

    pub fn node(&self, node: NodeId) -> Result<&NodeInfo, TreeError> {
        self.graph.node(node)
    }

    pub fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeInfo, TreeError> {
        self.graph.node_mut(node)
    }

    pub fn categorizer(&self, node: NodeId) -> Result<&Categorizer, TreeError> {
        self.graph.categorizer(node)
    }

    /// Make `node` the root. The root has no parent and cannot be changed
    /// once set, unless it is deleted first.
    pub fn set_root(&mut self, node: NodeId) -> Result<(), TreeError> {
        if self.graph.in_degree(node)? > 0 {
            return Err(TreeError::MultipleParents(node));
        }
        match self.root {
            Some(root) if root != node => Err(TreeError::RootExists(root)),
            _ => {
                self.root = Some(node);
                Ok(())
            }
        }
    }

    /// Connect `to` below `from`. `to` must not have a parent yet.
    pub fn connect(&mut self, from: NodeId, to: NodeId, label: AugCategory) -> Result<EdgeId, TreeError> {
        if self.root == Some(to) || self.graph.in_degree(to)? > 0 {
            return Err(TreeError::MultipleParents(to));
        }
        self.graph.connect(from, to, label)
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.graph.parents(node)?.first().copied())
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<(Category, NodeId)>, TreeError> {
        self.graph.children(node)
    }

    /// Whether `ancestor` lies strictly above `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool, TreeError> {
        let mut current = self.parent(node)?;
        while let Some(p) = current {
            if p == ancestor {
                return Ok(true);
            }
            current = self.parent(p)?;
        }
        Ok(false)
    }

    /// Delete the subtree under `node`.
    ///
    /// * `None` - `node` and all of its descendants are deleted.
    /// * `Some(node)` - only the descendants are deleted, `node` stays.
    /// * `Some(other)` - `other` takes the place of `node`: its categorizer,
    ///   statistics and children move onto `node` and the old children of
    ///   `node` are deleted. `other` may not be the root or an ancestor of `node`.
    pub fn delete_subtree(&mut self, node: NodeId, replacement: Option<NodeId>) -> Result<(), TreeError> {
        match replacement {
            None => {
                self.delete_children(node)?;
                self.graph.delete_node(node)?;
                if self.root == Some(node) {
                    self.root = None;
                }
                Ok(())
            }
            Some(r) if r == node => self.delete_children(node),
            Some(r) => self.splice(node, r),
        }
    }

    fn delete_children(&mut self, node: NodeId) -> Result<(), TreeError> {
        for (_, child) in self.graph.children(node)? {
            self.delete_subtree(child, None)?;
        }
        Ok(())
    }

    fn splice(&mut self, node: NodeId, replacement: NodeId) -> Result<(), TreeError> {
        self.graph.node(node)?;
        self.graph.node(replacement)?;
        if self.root == Some(replacement) {
            return Err(TreeError::InvalidReplacement(
                node,
                replacement,
                "the replacement is the root".to_string(),
            ));
        }
        if self.is_ancestor(replacement, node)? {
            return Err(TreeError::InvalidReplacement(
                node,
                replacement,
                "the replacement is an ancestor of the node".to_string(),
            ));
        }
        for e in self.graph.in_edges(replacement)?.to_vec() {
            self.graph.disconnect(e)?;
        }
        let old_children: Vec<NodeId> = self.graph.children(node)?.into_iter().map(|(_, c)| c).collect();
        for e in self.graph.out_edges(node)?.to_vec() {
            self.graph.disconnect(e)?;
        }
        self.graph.move_out_edges(replacement, node)?;
        let moved = self.graph.delete_node(replacement)?;
        let level = {
            let info = self.graph.node_mut(node)?;
            info.categorizer = moved.categorizer;
            info.stats = moved.stats;
            info.level
        };
        for child in old_children {
            self.delete_subtree(child, None)?;
        }
        self.assign_subtree_levels(node, level)
    }

    /// Stamp `level` on `node` and consecutive levels on its descendants.
    pub fn assign_subtree_levels(&mut self, node: NodeId, level: usize) -> Result<(), TreeError> {
        self.graph.node_mut(node)?.level = level;
        for (_, child) in self.graph.children(node)? {
            self.assign_subtree_levels(child, level + 1)?;
        }
        Ok(())
    }

    /// Split `instances` over the children of `node`, one entry per outgoing
    /// edge in edge order. Children that receive nothing get an empty list.
    pub fn route_instances(
        &self,
        node: NodeId,
        dataset: &Dataset,
        instances: &[usize],
    ) -> Result<Vec<(NodeId, Vec<usize>)>, TreeError> {
        let categorizer = self.graph.categorizer(node)?;
        let mut parts: Vec<(NodeId, Vec<usize>)> = self
            .graph
            .children(node)?
            .into_iter()
            .map(|(_, child)| (child, Vec::new()))
            .collect();
        for i in instances {
            let category = categorizer.branch_instance(dataset, *i)?;
            let child = self.graph.get_child(node, category)?;
            if let Some((_, part)) = parts.iter_mut().find(|(c, _)| *c == child) {
                part.push(*i);
            }
        }
        Ok(parts)
    }

    /// Recompute the statistics of the subtree under `node` from `instances`.
    /// Leaves get a fresh distribution under `policy`, leaves that receive
    /// weight also get a fresh prediction.
    pub fn distribute_instances(
        &mut self,
        node: NodeId,
        dataset: &Dataset,
        instances: &[usize],
        policy: &LeafPolicy,
        tie_break: &[Category],
    ) -> Result<(), TreeError> {
        let counts = dataset.label_counts(instances);
        let current = match self.graph.categorizer(node)? {
            Categorizer::Leaf(l) => Some(l.prediction.category),
            _ => None,
        };
        if let Some(current) = current {
            let leaf = policy.make_leaf(&counts, tie_break, current, dataset.schema());
            let info = self.graph.node_mut(node)?;
            info.categorizer = Categorizer::Leaf(leaf);
            info.stats.distribution = counts;
            return Ok(());
        }
        let child_tie_break = policy.child_tie_break(tie_break, &counts);
        let parts = self.route_instances(node, dataset, instances)?;
        self.graph.node_mut(node)?.stats.distribution = counts;
        for (child, part) in parts {
            self.distribute_instances(child, dataset, &part, policy, &child_tie_break)?;
        }
        Ok(())
    }

    /// Nodes visited by `row`, from the root down to its leaf.
    fn path(&self, row: &[f64]) -> Result<Vec<NodeId>, TreeError> {
        let mut node = self.root_or_err()?;
        let mut path = vec![node];
        loop {
            let categorizer = self.graph.categorizer(node)?;
            if categorizer.is_leaf() {
                return Ok(path);
            }
            node = self.graph.get_child(node, categorizer.branch(row)?)?;
            path.push(node);
        }
    }

    /// Leaf reached by `row`.
    pub fn leaf_for(&self, row: &[f64]) -> Result<NodeId, TreeError> {
        let mut node = self.root_or_err()?;
        loop {
            let categorizer = self.graph.categorizer(node)?;
            if categorizer.is_leaf() {
                return Ok(node);
            }
            node = self.graph.get_child(node, categorizer.branch(row)?)?;
        }
    }

    pub fn categorize(&self, row: &[f64]) -> Result<AugCategory, TreeError> {
        let leaf = self.leaf_for(row)?;
        Ok(self.graph.categorizer(leaf)?.leaf()?.prediction.clone())
    }

    /// Probabilities of the leaf reached by `row`, indexed by category.
    pub fn score(&self, row: &[f64]) -> Result<Vec<f64>, TreeError> {
        let leaf = self.leaf_for(row)?;
        Ok(self.graph.categorizer(leaf)?.leaf()?.score())
    }

    /// Predicted category of every row of `data`, computed in parallel.
    pub fn predict(&self, data: &Matrix<f64>) -> Result<Vec<Category>, TreeError> {
        data.index
            .par_iter()
            .map(|i| self.categorize(&data.get_row(*i)).map(|c| c.category))
            .collect()
    }

    /// Score `row` and add its loss against `actual` to every node on its path.
    pub fn score_and_record(
        &mut self,
        row: &[f64],
        actual: Category,
        weight: f64,
        loss_matrix: &LossMatrix,
    ) -> Result<Vec<f64>, TreeError> {
        let path = self.path(row)?;
        let leaf_node = *path.last().ok_or(TreeError::NoRoot)?;
        let (prediction, score) = {
            let leaf = self.graph.categorizer(leaf_node)?.leaf()?;
            (leaf.prediction.category, leaf.score())
        };
        let loss = loss_matrix.loss(actual, prediction);
        for node in path {
            self.graph.node_mut(node)?.stats.loss.add(weight, loss);
        }
        Ok(score)
    }

    /// Clear the losses recorded by [`DecisionTree::score_and_record`].
    pub fn reset_losses(&mut self) {
        for id in self.graph.node_ids() {
            if let Ok(info) = self.graph.node_mut(id) {
                info.stats.loss = NodeLoss::default();
            }
        }
    }

    /// Score every instance of `dataset`, recording the losses on the nodes.
    pub fn test(&mut self, dataset: &Dataset, loss_matrix: &LossMatrix) -> Result<TestResult, TreeError> {
        let mut result = TestResult::default();
        for i in 0..dataset.rows() {
            let row = dataset.row(i);
            let actual = dataset.label_category(i);
            let weight = dataset.weight(i);
            let prediction = self.categorize(&row)?.category;
            self.score_and_record(&row, actual, weight, loss_matrix)?;
            result.weight += weight;
            if prediction != actual {
                result.errors += weight;
            }
            result.loss += weight * loss_matrix.loss(actual, prediction);
        }
        Ok(result)
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    pub fn num_leaves(&self) -> usize {
        self.graph.num_leaves()
    }

    /// Nodes and leaves below the root, skipping the subtrees of UNKNOWN
    /// edges that received no training weight.
    fn nontrivial_counts(&self, node: NodeId, nodes: &mut usize, leaves: &mut usize) {
        let children = match self.graph.children(node) {
            Ok(c) => c,
            Err(_) => return,
        };
        *nodes += 1;
        if children.is_empty() {
            *leaves += 1;
        }
        for (label, child) in children {
            let empty = self
                .graph
                .node(child)
                .map(|n| n.stats.distribution.is_empty())
                .unwrap_or(true);
            if label == UNKNOWN_CATEGORY && empty {
                continue;
            }
            self.nontrivial_counts(child, nodes, leaves);
        }
    }

    pub fn num_nontrivial_nodes(&self) -> usize {
        let (mut nodes, mut leaves) = (0, 0);
        if let Some(root) = self.root {
            self.nontrivial_counts(root, &mut nodes, &mut leaves);
        }
        nodes
    }

    pub fn num_nontrivial_leaves(&self) -> usize {
        let (mut nodes, mut leaves) = (0, 0);
        if let Some(root) = self.root {
            self.nontrivial_counts(root, &mut nodes, &mut leaves);
        }
        leaves
    }

    /// Number of edges on the longest path from the root.
    pub fn depth(&self) -> usize {
        fn walk(tree: &DecisionTree, node: NodeId) -> usize {
            tree.graph
                .children(node)
                .unwrap_or_default()
                .into_iter()
                .map(|(_, c)| 1 + walk(tree, c))
                .max()
                .unwrap_or(0)
        }
        self.root.map(|r| walk(self, r)).unwrap_or(0)
    }

    /// Leaves of the subtree under `node`.
    pub fn leaves_under(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let children = self.graph.children(node)?;
        if children.is_empty() {
            return Ok(vec![node]);
        }
        let mut leaves = Vec::new();
        for (_, child) in children {
            leaves.extend(self.leaves_under(child)?);
        }
        Ok(leaves)
    }

    /// Training errors of a leaf: weight that reached it outside its prediction.
    pub fn leaf_errors(&self, node: NodeId) -> Result<f64, TreeError> {
        let info = self.graph.node(node)?;
        let prediction = info.categorizer.leaf()?.prediction.category;
        let dist = &info.stats.distribution;
        Ok((dist.total() - dist.weight(prediction)).max(0.0))
    }

    /// Summed pessimistic training errors of the leaves of the tree.
    pub fn pessimistic_errors(&self, z: f64) -> Result<f64, TreeError> {
        let root = match self.root {
            Some(r) => r,
            None => return Ok(0.0),
        };
        let mut total = 0.0;
        for leaf in self.leaves_under(root)? {
            let weight = self.graph.node(leaf)?.stats.distribution.total();
            total += pessimistic_errors(self.leaf_errors(leaf)?, weight, z);
        }
        Ok(total)
    }

    /// Save a tree as a json object to a file.
    ///
    /// * `path` - Path to save the tree.
    pub fn save(&self, path: &str) -> Result<(), TreeError> {
        let model = self.json_dump()?;
        match fs::write(path, model) {
            Err(e) => Err(TreeError::UnableToWrite(e.to_string())),
            Ok(_) => Ok(()),
        }
    }

    /// Dump a tree as a json object
    pub fn json_dump(&self) -> Result<String, TreeError> {
        match serde_json::to_string(self) {
            Ok(s) => Ok(s),
            Err(e) => Err(TreeError::UnableToWrite(e.to_string())),
        }
    }

    /// Load a tree from Json string
    pub fn from_json(json_str: &str) -> Result<Self, TreeError> {
        match serde_json::from_str::<DecisionTree>(json_str) {
            Ok(m) => Ok(m),
            Err(e) => Err(TreeError::UnableToRead(e.to_string())),
        }
    }

    /// Load a tree from a path to a json tree object.
    pub fn load(path: &str) -> Result<Self, TreeError> {
        let json_str = match fs::read_to_string(path) {
            Ok(s) => Ok(s),
            Err(e) => Err(TreeError::UnableToRead(e.to_string())),
        }?;
        Self::from_json(&json_str)
    }

    fn write_node(&self, node: NodeId, label: Option<&AugCategory>, depth: usize, r: &mut String) {
        let info = match self.graph.node(node) {
            Ok(info) => info,
            Err(_) => return,
        };
        let indent = "    ".repeat(depth);
        match label {
            Some(l) => *r += format!("{}{}: {}\n", indent, l, info.categorizer).as_str(),
            None => *r += format!("{}{}\n", indent, info.categorizer).as_str(),
        }
        let edges = self.graph.out_edges(node).unwrap_or_default();
        for edge in edges.iter().filter_map(|e| self.graph.edge(*e)) {
            self.write_node(edge.target, Some(&edge.label), depth + 1, r);
        }
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut r = String::new();
        if let Some(root) = self.root {
            self.write_node(root, None, 0, &mut r);
        }
        write!(f, "{}", r)
    }
}
