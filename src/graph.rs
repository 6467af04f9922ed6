//! Categorizer graph
//!
//! A directed graph whose nodes own a [`Categorizer`] and whose edges carry a
//! category label. Nodes and edges live in arenas and are referenced by
//! integer ids, freed ids are reused by later insertions.
use crate::categorizer::{Categorizer, NodeStats};
use crate::category::{AugCategory, Category, FIRST_CATEGORY, UNKNOWN_CATEGORY};
use crate::errors::TreeError;
use log::warn;
use serde::{Deserialize, Serialize};

pub type NodeId = usize;
pub type EdgeId = usize;

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Depth of the node, the root is at level 0.
    pub level: usize,
    pub categorizer: Categorizer,
    pub stats: NodeStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub label: AugCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeEntry {
    info: NodeInfo,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategorizerGraph {
    nodes: Vec<Option<NodeEntry>>,
    edges: Vec<Option<Edge>>,
    free_nodes: Vec<NodeId>,
    free_edges: Vec<EdgeId>,
    sparse: bool,
}

impl CategorizerGraph {
    /// Graph where the labels on the edges of a node must be contiguous.
    pub fn new() -> Self {
        CategorizerGraph::default()
    }

    /// Graph that accepts any set of labels on the edges of a node.
    pub fn new_sparse() -> Self {
        CategorizerGraph {
            sparse: true,
            ..Default::default()
        }
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    pub fn create_node(&mut self, categorizer: Categorizer, level: usize) -> NodeId {
        let entry = NodeEntry {
            info: NodeInfo {
                level,
                categorizer,
                stats: NodeStats::default(),
            },
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        };
        match self.free_nodes.pop() {
            Some(id) => {
                self.nodes[id] = Some(entry);
                id
            }
            None => {
                self.nodes.push(Some(entry));
                self.nodes.len() - 1
            }
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        matches!(self.nodes.get(node), Some(Some(_)))
    }

    fn entry(&self, node: NodeId) -> Result<&NodeEntry, TreeError> {
        self.nodes
            .get(node)
            .and_then(|n| n.as_ref())
            .ok_or(TreeError::NodeNotFound(node))
    }

    fn entry_mut(&mut self, node: NodeId) -> Result<&mut NodeEntry, TreeError> {
        self.nodes
            .get_mut(node)
            .and_then(|n| n.as_mut())
            .ok_or(TreeError::NodeNotFound(node))
    }

    pub fn node(&self, node: NodeId) -> Result<&NodeInfo, TreeError> {
        self.entry(node).map(|e| &e.info)
    }

    pub fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeInfo, TreeError> {
        self.entry_mut(node).map(|e| &mut e.info)
    }

    pub fn categorizer(&self, node: NodeId) -> Result<&Categorizer, TreeError> {
        self.node(node).map(|n| &n.categorizer)
    }

    /// Swap the categorizer of a node, returning the old one.
    pub fn replace_categorizer(&mut self, node: NodeId, categorizer: Categorizer) -> Result<Categorizer, TreeError> {
        let info = self.node_mut(node)?;
        Ok(std::mem::replace(&mut info.categorizer, categorizer))
    }

    pub fn edge(&self, edge: EdgeId) -> Option<&Edge> {
        self.edges.get(edge).and_then(|e| e.as_ref())
    }

    /// Add an edge from `from` to `to`.
    ///
    /// A label already used on `from` is ignored with a warning and the
    /// existing edge is returned. Unless the graph is sparse, the first label
    /// of a node must be UNKNOWN or FIRST and every next label one more than
    /// the previous one.
    pub fn connect(&mut self, from: NodeId, to: NodeId, label: AugCategory) -> Result<EdgeId, TreeError> {
        self.entry(to)?;
        let last = {
            let source = self.entry(from)?;
            if let Some(existing) = source
                .out_edges
                .iter()
                .find(|e| self.edges[**e].as_ref().map(|e| e.label.category) == Some(label.category))
            {
                warn!(
                    "Node {} already has an edge labelled {}, ignoring the new edge to {}.",
                    from, label.category, to
                );
                return Ok(*existing);
            }
            source
                .out_edges
                .last()
                .and_then(|e| self.edges[*e].as_ref())
                .map(|e| e.label.category)
        };
        if !self.sparse {
            match last {
                None if label.category != UNKNOWN_CATEGORY && label.category != FIRST_CATEGORY => {
                    return Err(TreeError::EdgeLabelOrder(
                        from,
                        label.category,
                        format!("{} or {}", UNKNOWN_CATEGORY, FIRST_CATEGORY),
                    ))
                }
                Some(prev) if label.category != prev + 1 => {
                    return Err(TreeError::EdgeLabelOrder(from, label.category, (prev + 1).to_string()))
                }
                _ => (),
            }
        }
        let edge = Edge {
            source: from,
            target: to,
            label,
        };
        let id = match self.free_edges.pop() {
            Some(id) => {
                self.edges[id] = Some(edge);
                id
            }
            None => {
                self.edges.push(Some(edge));
                self.edges.len() - 1
            }
        };
        self.entry_mut(from)?.out_edges.push(id);
        self.entry_mut(to)?.in_edges.push(id);
        Ok(id)
    }

    /// Remove an edge, returning it.
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<Edge, TreeError> {
        let removed = self
            .edges
            .get_mut(edge)
            .and_then(|e| e.take())
            .ok_or_else(|| TreeError::InvalidData(format!("edge {} does not exist", edge)))?;
        if let Ok(source) = self.entry_mut(removed.source) {
            source.out_edges.retain(|e| *e != edge);
        }
        if let Ok(target) = self.entry_mut(removed.target) {
            target.in_edges.retain(|e| *e != edge);
        }
        self.free_edges.push(edge);
        Ok(removed)
    }

    /// Move every outgoing edge of `from` onto `to`, keeping their order and
    /// labels. `to` must not have outgoing edges.
    pub(crate) fn move_out_edges(&mut self, from: NodeId, to: NodeId) -> Result<(), TreeError> {
        if !self.entry(to)?.out_edges.is_empty() {
            return Err(TreeError::InvalidReplacement(
                to,
                from,
                "target node still has outgoing edges".to_string(),
            ));
        }
        let moved = std::mem::take(&mut self.entry_mut(from)?.out_edges);
        for e in &moved {
            if let Some(edge) = self.edges[*e].as_mut() {
                edge.source = to;
            }
        }
        self.entry_mut(to)?.out_edges = moved;
        Ok(())
    }

    /// Delete a node and every edge touching it, returning its payload.
    pub fn delete_node(&mut self, node: NodeId) -> Result<NodeInfo, TreeError> {
        let entry = self.entry(node)?;
        let edges: Vec<EdgeId> = entry.out_edges.iter().chain(entry.in_edges.iter()).copied().collect();
        for e in edges {
            self.disconnect(e)?;
        }
        let entry = self.nodes[node].take().ok_or(TreeError::NodeNotFound(node))?;
        self.free_nodes.push(node);
        Ok(entry.info)
    }

    pub fn out_edges(&self, node: NodeId) -> Result<&[EdgeId], TreeError> {
        self.entry(node).map(|e| e.out_edges.as_slice())
    }

    pub fn in_edges(&self, node: NodeId) -> Result<&[EdgeId], TreeError> {
        self.entry(node).map(|e| e.in_edges.as_slice())
    }

    pub fn out_degree(&self, node: NodeId) -> Result<usize, TreeError> {
        self.entry(node).map(|e| e.out_edges.len())
    }

    pub fn in_degree(&self, node: NodeId) -> Result<usize, TreeError> {
        self.entry(node).map(|e| e.in_edges.len())
    }

    /// `(label, child)` of every outgoing edge, in edge order.
    pub fn children(&self, node: NodeId) -> Result<Vec<(Category, NodeId)>, TreeError> {
        Ok(self
            .entry(node)?
            .out_edges
            .iter()
            .filter_map(|e| self.edge(*e))
            .map(|e| (e.label.category, e.target))
            .collect())
    }

    pub fn parents(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        Ok(self
            .entry(node)?
            .in_edges
            .iter()
            .filter_map(|e| self.edge(*e))
            .map(|e| e.source)
            .collect())
    }

    /// Child reached through the edge labelled `category`, falling back to the
    /// UNKNOWN edge.
    pub fn get_child(&self, node: NodeId, category: Category) -> Result<NodeId, TreeError> {
        let mut unknown = None;
        for e in self.entry(node)?.out_edges.iter().filter_map(|e| self.edge(*e)) {
            if e.label.category == category {
                return Ok(e.target);
            }
            if e.label.category == UNKNOWN_CATEGORY {
                unknown = Some(e.target);
            }
        }
        unknown.ok_or(TreeError::NoMatchingEdge(node, category))
    }

    /// Ids of all the live nodes.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| n.as_ref())
            .filter(|n| n.out_edges.is_empty())
            .count()
    }
}
