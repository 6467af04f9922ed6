// Modules
pub mod categorizer;
pub mod category;
pub mod constants;
pub mod data;
pub mod distribution;
pub mod errors;
pub mod graph;
pub mod inducer;
pub mod loss;
pub mod prune;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use categorizer::Categorizer;
pub use category::{AugCategory, Category, FIRST_CATEGORY, UNKNOWN_CATEGORY};
pub use data::{Attribute, AttributeKind, Dataset, Matrix, Schema};
pub use errors::TreeError;
pub use inducer::{TrainingStats, TreeInducer};
pub use tree::DecisionTree;
