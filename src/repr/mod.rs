//! Tree ensemble representation used by the stage models.

/// Node identifier: an index into a tree's SoA arrays.
pub type NodeId = u32;

pub mod categories;
pub mod forest;
pub mod tree;

pub use categories::{categories_to_bitset, float_to_category, CategoriesStorage};
pub use forest::{Forest, ForestValidationError};
pub use tree::{SplitType, Tree, TreeBuilder, TreeValidationError};
