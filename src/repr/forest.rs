//! Forest of decision trees with per-group outputs.

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

use super::tree::{Tree, TreeValidationError};

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestValidationError {
    #[error("forest must have at least one output group")]
    NoGroups,

    #[error("base score has {len} entries for {n_groups} groups")]
    BaseScoreLenMismatch { n_groups: u32, len: usize },

    #[error("base score of group {group} is not finite")]
    NonFiniteBaseScore { group: usize },

    #[error("{len} tree group assignments for {n_trees} trees")]
    TreeGroupsLenMismatch { n_trees: usize, len: usize },

    #[error("tree {tree_idx} assigned to group {group}, forest has {n_groups} groups")]
    TreeGroupOutOfRange {
        tree_idx: usize,
        group: u32,
        n_groups: u32,
    },

    #[error("tree {tree_idx}: {error}")]
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

/// Additive tree ensemble.
///
/// Output for group `g` is `base_score[g]` plus the leaf values of every tree
/// assigned to `g`.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    tree_groups: Vec<u32>,
    n_groups: u32,
    base_score: Vec<f32>,
}

impl Forest {
    /// Create an empty forest with `n_groups` outputs and zero base scores.
    pub fn new(n_groups: u32) -> Self {
        Self {
            trees: Vec::new(),
            tree_groups: Vec::new(),
            n_groups,
            base_score: vec![0.0; n_groups as usize],
        }
    }

    /// Assemble a forest from decoded parts. Call [`validate`](Self::validate)
    /// before predicting.
    pub fn from_parts(trees: Vec<Tree>, tree_groups: Vec<u32>, n_groups: u32, base_score: Vec<f32>) -> Self {
        Self {
            trees,
            tree_groups,
            n_groups,
            base_score,
        }
    }

    /// Create a forest for regression (single output group).
    pub fn for_regression() -> Self {
        Self::new(1)
    }

    /// Set the base score for all groups.
    #[must_use]
    pub fn with_base_score(mut self, base_score: Vec<f32>) -> Self {
        self.base_score = base_score;
        self
    }

    /// Add a tree to the forest.
    pub fn push_tree(&mut self, tree: Tree, group: u32) {
        debug_assert!(group < self.n_groups, "group out of range");
        self.trees.push(tree);
        self.tree_groups.push(group);
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_groups(&self) -> u32 {
        self.n_groups
    }

    #[inline]
    pub fn base_score(&self) -> &[f32] {
        &self.base_score
    }

    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    #[inline]
    pub fn tree_groups(&self) -> &[u32] {
        &self.tree_groups
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    pub fn trees_with_groups(&self) -> impl Iterator<Item = (&Tree, u32)> {
        self.trees
            .iter()
            .zip(self.tree_groups.iter())
            .map(|(t, &g)| (t, g))
    }

    /// Validate group assignments, base scores and every tree.
    ///
    /// With `n_features`, also checks that no split reads past the input width.
    pub fn validate(&self, n_features: Option<usize>) -> Result<(), ForestValidationError> {
        if self.n_groups == 0 {
            return Err(ForestValidationError::NoGroups);
        }
        if self.base_score.len() != self.n_groups as usize {
            return Err(ForestValidationError::BaseScoreLenMismatch {
                n_groups: self.n_groups,
                len: self.base_score.len(),
            });
        }
        if let Some(group) = self.base_score.iter().position(|v| !v.is_finite()) {
            return Err(ForestValidationError::NonFiniteBaseScore { group });
        }
        if self.tree_groups.len() != self.trees.len() {
            return Err(ForestValidationError::TreeGroupsLenMismatch {
                n_trees: self.trees.len(),
                len: self.tree_groups.len(),
            });
        }

        for (tree_idx, &group) in self.tree_groups.iter().enumerate() {
            if group >= self.n_groups {
                return Err(ForestValidationError::TreeGroupOutOfRange {
                    tree_idx,
                    group,
                    n_groups: self.n_groups,
                });
            }
        }

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .and_then(|()| match n_features {
                    Some(n) => tree.validate_features(n),
                    None => Ok(()),
                })
                .map_err(|error| ForestValidationError::InvalidTree { tree_idx, error })?;
        }

        Ok(())
    }

    /// Raw margins for a single row, one per group.
    pub fn predict_row(&self, features: &[f32]) -> Vec<f32> {
        let mut output = self.base_score.clone();
        for (tree, group) in self.trees_with_groups() {
            output[group as usize] += tree.predict_row(features);
        }
        output
    }

    /// Raw margins for a `[n_rows, n_features]` matrix, shape `[n_rows, n_groups]`.
    pub fn predict(&self, features: ArrayView2<'_, f32>) -> Array2<f32> {
        let n_rows = features.nrows();
        let n_groups = self.n_groups as usize;
        let mut output = Array2::<f32>::zeros((n_rows, n_groups));

        for (row_idx, mut out_row) in output.rows_mut().into_iter().enumerate() {
            let row = features.row(row_idx);
            // Rows of a standard-layout matrix are contiguous; fall back to a copy otherwise.
            let owned;
            let slice = match row.as_slice() {
                Some(s) => s,
                None => {
                    owned = row.to_vec();
                    &owned
                }
            };

            for (group, &base) in self.base_score.iter().enumerate() {
                out_row[group] = base;
            }
            for (tree, group) in self.trees_with_groups() {
                out_row[group as usize] += tree.predict_row(slice);
            }
        }

        output
    }
}
