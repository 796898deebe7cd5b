//! Structure-of-arrays decision tree.
//!
//! Node 0 is the root. Child indices are local to the tree. Internal nodes
//! split on one feature, either numerically (`value < threshold` goes left) or
//! categorically (category in the node's set goes right). NaN follows the
//! node's default direction.

// Tree::new takes one argument per SoA column.
#![allow(clippy::too_many_arguments)]

use thiserror::Error;

use super::categories::{float_to_category, CategoriesStorage};
use super::NodeId;

/// Type of split in a decision tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SplitType {
    /// Go left if `value < threshold`.
    #[default]
    Numeric = 0,
    /// Go right if the category is in the node's set.
    Categorical = 1,
}

impl From<u8> for SplitType {
    fn from(value: u8) -> Self {
        match value {
            0 => SplitType::Numeric,
            _ => SplitType::Categorical,
        }
    }
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,

    #[error("node {node} has {side} child {child} but the tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },

    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },

    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },

    #[error("cycle detected at node {node}")]
    CycleDetected { node: NodeId },

    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },

    #[error("categorical segments cover {segments_len} nodes, tree has {n_nodes}")]
    CategoricalSegmentsLenMismatch { segments_len: usize, n_nodes: usize },

    #[error("node {node} has a non-finite {field}")]
    NonFinite { node: NodeId, field: &'static str },

    #[error("node {node} splits on feature {feature}, model has {n_features} features")]
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },
}

// ============================================================================
// Tree
// ============================================================================

/// Immutable tree with scalar leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f32]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    default_left: Box<[bool]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f32]>,
    split_types: Box<[SplitType]>,
    categories: CategoriesStorage,
}

impl Tree {
    /// Create a tree from parallel arrays, one entry per node.
    ///
    /// Pass `CategoriesStorage::empty()` for trees without categorical splits.
    pub fn new(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        default_left: Vec<bool>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f32>,
        split_types: Vec<SplitType>,
        categories: CategoriesStorage,
    ) -> Self {
        let n_nodes = split_indices.len();
        debug_assert_eq!(n_nodes, split_thresholds.len());
        debug_assert_eq!(n_nodes, left_children.len());
        debug_assert_eq!(n_nodes, right_children.len());
        debug_assert_eq!(n_nodes, default_left.len());
        debug_assert_eq!(n_nodes, is_leaf.len());
        debug_assert_eq!(n_nodes, leaf_values.len());
        debug_assert_eq!(n_nodes, split_types.len());

        Self {
            split_indices: split_indices.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            default_left: default_left.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            leaf_values: leaf_values.into_boxed_slice(),
            split_types: split_types.into_boxed_slice(),
            categories,
        }
    }

    /// Single-leaf tree that always predicts `value`.
    pub fn constant(value: f32) -> Self {
        Self::new(
            vec![0],
            vec![0.0],
            vec![0],
            vec![0],
            vec![false],
            vec![true],
            vec![value],
            vec![SplitType::Numeric],
            CategoriesStorage::empty(),
        )
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.split_indices.len()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    pub fn split_threshold(&self, node: NodeId) -> f32 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    pub fn default_left(&self, node: NodeId) -> bool {
        self.default_left[node as usize]
    }

    #[inline]
    pub fn split_type(&self, node: NodeId) -> SplitType {
        self.split_types[node as usize]
    }

    #[inline]
    pub fn categories(&self) -> &CategoriesStorage {
        &self.categories
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_values[node as usize]
    }

    /// Check if the tree has any categorical splits.
    pub fn has_categorical(&self) -> bool {
        self.split_types
            .iter()
            .zip(self.is_leaf.iter())
            .any(|(t, &leaf)| !leaf && *t == SplitType::Categorical)
    }

    /// Walk from the root to the leaf selected by `features`.
    ///
    /// A feature index past the end of `features` reads as missing.
    #[inline]
    pub fn traverse_to_leaf(&self, features: &[f32]) -> NodeId {
        let mut node: NodeId = 0;

        while !self.is_leaf(node) {
            let fvalue = features
                .get(self.split_index(node) as usize)
                .copied()
                .unwrap_or(f32::NAN);

            node = if fvalue.is_nan() {
                if self.default_left(node) {
                    self.left_child(node)
                } else {
                    self.right_child(node)
                }
            } else {
                match self.split_type(node) {
                    SplitType::Numeric => {
                        if fvalue < self.split_threshold(node) {
                            self.left_child(node)
                        } else {
                            self.right_child(node)
                        }
                    }
                    SplitType::Categorical => {
                        let category = float_to_category(fvalue);
                        if self.categories.category_goes_right(node, category) {
                            self.right_child(node)
                        } else {
                            self.left_child(node)
                        }
                    }
                }
            };
        }

        node
    }

    /// Leaf value for a single row of features.
    #[inline]
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        self.leaf_value(self.traverse_to_leaf(features))
    }

    /// Validate structural invariants: reachability, no cycles, child bounds.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }

        if self.has_categorical() {
            let segments_len = self.categories.segments().len();
            if segments_len != n_nodes {
                return Err(TreeValidationError::CategoricalSegmentsLenMismatch {
                    segments_len,
                    n_nodes,
                });
            }
        }

        // Iterative DFS with color marking: 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, bool)> = vec![(0, false)];

        while let Some((node, exiting)) = stack.pop() {
            let idx = node as usize;
            if exiting {
                color[idx] = 2;
                continue;
            }

            match color[idx] {
                1 => return Err(TreeValidationError::CycleDetected { node }),
                2 => return Err(TreeValidationError::DuplicateVisit { node }),
                _ => {}
            }
            color[idx] = 1;
            stack.push((node, true));

            if self.is_leaf(node) {
                continue;
            }

            let left = self.left_child(node);
            let right = self.right_child(node);
            if left == node || right == node {
                return Err(TreeValidationError::SelfLoop { node });
            }
            for (side, child) in [("left", left), ("right", right)] {
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        side,
                        child,
                        n_nodes,
                    });
                }
            }

            stack.push((right, false));
            stack.push((left, false));
        }

        if let Some(node) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: node as NodeId });
        }

        for node in 0..n_nodes as NodeId {
            let (value, field) = if self.is_leaf(node) {
                (self.leaf_value(node), "leaf value")
            } else if self.split_type(node) == SplitType::Numeric {
                (self.split_threshold(node), "threshold")
            } else {
                continue;
            };
            if !value.is_finite() {
                return Err(TreeValidationError::NonFinite { node, field });
            }
        }

        Ok(())
    }

    /// Check that every split reads a feature below `n_features`.
    pub fn validate_features(&self, n_features: usize) -> Result<(), TreeValidationError> {
        for node in 0..self.n_nodes() as NodeId {
            if self.is_leaf(node) {
                continue;
            }
            let feature = self.split_index(node);
            if feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature,
                    n_features,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// TreeBuilder
// ============================================================================

/// Node-by-node tree construction.
///
/// Nodes are addressed by id; unspecified ids stay leaves with value 0.
///
/// ```
/// use jobimpact::repr::TreeBuilder;
///
/// let tree = TreeBuilder::new()
///     .numeric(0, 0, 0.5, true, 1, 2)
///     .leaf(1, -1.0)
///     .leaf(2, 1.0)
///     .build();
/// assert_eq!(tree.predict_row(&[0.2]), -1.0);
/// assert_eq!(tree.predict_row(&[f32::NAN]), -1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f32>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f32>,
    split_types: Vec<SplitType>,
    category_sets: Vec<(NodeId, Vec<u32>)>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, node: NodeId) -> usize {
        let idx = node as usize;
        if idx >= self.is_leaf.len() {
            let n = idx + 1;
            self.split_indices.resize(n, 0);
            self.split_thresholds.resize(n, 0.0);
            self.left_children.resize(n, 0);
            self.right_children.resize(n, 0);
            self.default_left.resize(n, false);
            self.is_leaf.resize(n, true);
            self.leaf_values.resize(n, 0.0);
            self.split_types.resize(n, SplitType::Numeric);
        }
        idx
    }

    /// Numeric split: `features[feature] < threshold` goes to `left`.
    #[must_use]
    pub fn numeric(
        mut self,
        node: NodeId,
        feature: u32,
        threshold: f32,
        default_left: bool,
        left: NodeId,
        right: NodeId,
    ) -> Self {
        let idx = self.ensure(node);
        self.split_indices[idx] = feature;
        self.split_thresholds[idx] = threshold;
        self.left_children[idx] = left;
        self.right_children[idx] = right;
        self.default_left[idx] = default_left;
        self.is_leaf[idx] = false;
        self.split_types[idx] = SplitType::Numeric;
        self
    }

    /// Categorical split: categories in `right_set` go to `right`.
    #[must_use]
    pub fn categorical(
        mut self,
        node: NodeId,
        feature: u32,
        right_set: &[u32],
        default_left: bool,
        left: NodeId,
        right: NodeId,
    ) -> Self {
        let idx = self.ensure(node);
        self.split_indices[idx] = feature;
        self.split_thresholds[idx] = 0.0;
        self.left_children[idx] = left;
        self.right_children[idx] = right;
        self.default_left[idx] = default_left;
        self.is_leaf[idx] = false;
        self.split_types[idx] = SplitType::Categorical;
        self.category_sets.retain(|(n, _)| *n != node);
        self.category_sets.push((node, right_set.to_vec()));
        self
    }

    #[must_use]
    pub fn leaf(mut self, node: NodeId, value: f32) -> Self {
        let idx = self.ensure(node);
        self.is_leaf[idx] = true;
        self.leaf_values[idx] = value;
        self.split_types[idx] = SplitType::Numeric;
        self.category_sets.retain(|(n, _)| *n != node);
        self
    }

    pub fn build(mut self) -> Tree {
        if self.is_leaf.is_empty() {
            self.ensure(0);
        }
        let n_nodes = self.is_leaf.len();
        let categories = CategoriesStorage::from_node_sets(
            n_nodes,
            self.category_sets.iter().map(|(n, s)| (*n, s.as_slice())),
        );

        Tree::new(
            self.split_indices,
            self.split_thresholds,
            self.left_children,
            self.right_children,
            self.default_left,
            self.is_leaf,
            self.leaf_values,
            self.split_types,
            categories,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_tree() -> Tree {
        // root: feature 0 < 10 ? node 1 : node 2
        // node 1: feature 1 category in {2, 3} ? leaf 4 : leaf 3
        TreeBuilder::new()
            .numeric(0, 0, 10.0, false, 1, 2)
            .categorical(1, 1, &[2, 3], true, 3, 4)
            .leaf(2, 5.0)
            .leaf(3, 1.0)
            .leaf(4, 2.0)
            .build()
    }

    #[test]
    fn numeric_and_categorical_routing() {
        let tree = mixed_tree();
        assert!(tree.has_categorical());
        assert_eq!(tree.predict_row(&[12.0, 0.0]), 5.0);
        assert_eq!(tree.predict_row(&[3.0, 2.0]), 2.0);
        assert_eq!(tree.predict_row(&[3.0, 1.0]), 1.0);
    }

    #[test]
    fn missing_values_follow_default_direction() {
        let tree = mixed_tree();
        // root default is right
        assert_eq!(tree.predict_row(&[f32::NAN, 2.0]), 5.0);
        // categorical node default is left
        assert_eq!(tree.predict_row(&[1.0, f32::NAN]), 1.0);
        // short row reads as missing
        assert_eq!(tree.predict_row(&[1.0]), 1.0);
    }

    #[test]
    fn constant_tree() {
        let tree = Tree::constant(0.25);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_row(&[]), 0.25);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn validate_accepts_well_formed() {
        let tree = mixed_tree();
        assert_eq!(tree.validate(), Ok(()));
        assert_eq!(tree.validate_features(2), Ok(()));
        assert!(matches!(
            tree.validate_features(1),
            Err(TreeValidationError::FeatureOutOfRange { feature: 1, .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_structure() {
        let self_loop = TreeBuilder::new()
            .numeric(0, 0, 1.0, true, 0, 1)
            .leaf(1, 0.0)
            .build();
        assert_eq!(self_loop.validate(), Err(TreeValidationError::SelfLoop { node: 0 }));

        let out_of_bounds = TreeBuilder::new()
            .numeric(0, 0, 1.0, true, 1, 7)
            .leaf(1, 0.0)
            .build();
        assert!(matches!(
            out_of_bounds.validate(),
            Err(TreeValidationError::ChildOutOfBounds { side: "right", child: 7, .. })
        ));

        let unreachable = TreeBuilder::new()
            .numeric(0, 0, 1.0, true, 1, 2)
            .leaf(1, 0.0)
            .leaf(2, 0.0)
            .leaf(3, 0.0)
            .build();
        assert_eq!(
            unreachable.validate(),
            Err(TreeValidationError::UnreachableNode { node: 3 })
        );

        let shared_child = TreeBuilder::new()
            .numeric(0, 0, 1.0, true, 1, 1)
            .leaf(1, 0.0)
            .build();
        assert_eq!(
            shared_child.validate(),
            Err(TreeValidationError::DuplicateVisit { node: 1 })
        );
    }

    #[test]
    fn validate_rejects_non_finite_values() {
        let bad_threshold = TreeBuilder::new()
            .numeric(0, 0, f32::NAN, true, 1, 2)
            .leaf(1, 0.0)
            .leaf(2, 1.0)
            .build();
        assert_eq!(
            bad_threshold.validate(),
            Err(TreeValidationError::NonFinite { node: 0, field: "threshold" })
        );

        let bad_leaf = TreeBuilder::new()
            .numeric(0, 0, 1.0, true, 1, 2)
            .leaf(1, f32::NEG_INFINITY)
            .leaf(2, 1.0)
            .build();
        assert_eq!(
            bad_leaf.validate(),
            Err(TreeValidationError::NonFinite { node: 1, field: "leaf value" })
        );
        assert!(Tree::constant(f32::INFINITY).validate().is_err());
    }
}
