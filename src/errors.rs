//! Errors
//!
//! Custom error types used throughout the `tddt` crate.
use thiserror::Error;

/// Errors that can occur while building, mutating or using a decision tree.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// A node id that is not (or no longer) part of the graph.
    #[error("Node {0} does not exist in the graph.")]
    NodeNotFound(usize),
    /// First value is the node, second the label found, third the label expected.
    #[error("Edge label {1} out of order on node {0}, expected {2}.")]
    EdgeLabelOrder(usize, usize, String),
    /// No outgoing edge matches the label and there is no UNKNOWN edge.
    #[error("Node {0} has no edge labelled {1} and no UNKNOWN edge.")]
    NoMatchingEdge(usize, usize),
    /// A node that already has a parent was given a second one.
    #[error("Node {0} already has a parent, a decision tree node can only have one.")]
    MultipleParents(usize),
    /// The tree already has a root.
    #[error("The tree already has root {0}.")]
    RootExists(usize),
    /// The operation requires a root but the tree is empty.
    #[error("The tree has no root.")]
    NoRoot,
    /// Subtree replacement that would break the tree structure.
    #[error("Cannot replace node {0} with node {1}: {2}.")]
    InvalidReplacement(usize, usize, String),
    /// `branch` was called on a leaf categorizer.
    #[error("Leaf categorizer cannot branch.")]
    BranchOnLeaf,
    /// A split node was asked for a prediction outside of its tree.
    #[error("Categorizer on attribute {0} is not a leaf and needs its tree to categorize.")]
    NotALeaf(usize),
    /// Attribute index outside of the instance or schema.
    #[error("Attribute index {0} is out of range for {1} attributes.")]
    AttributeOutOfRange(usize, usize),
    /// Malformed data handed to the data model.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Unable to write tree to file.
    #[error("Unable to write tree to file: {0}")]
    UnableToWrite(String),
    /// Unable to read tree from file.
    #[error("Unable to read tree from a file {0}")]
    UnableToRead(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
}
