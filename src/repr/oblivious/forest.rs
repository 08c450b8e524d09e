//! Additive ensemble of oblivious trees.

use super::tree::{ObliviousTree, TreeValidationError};

/// Structural validation errors for [`ObliviousForest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tree {tree_idx}: {error}")]
pub struct ForestValidationError {
    pub tree_idx: usize,
    #[source]
    pub error: TreeValidationError,
}

/// Forest of oblivious trees with an affine post-transform.
///
/// The score of an example is `scale * Σ tree(x) + bias`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObliviousForest {
    trees: Vec<ObliviousTree>,
    n_features: usize,
    scale: f64,
    bias: f64,
}

impl ObliviousForest {
    /// Create an empty forest over `n_features` float features.
    pub fn new(n_features: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_features,
            scale: 1.0,
            bias: 0.0,
        }
    }

    /// Set the affine post-transform.
    pub fn with_scale_and_bias(mut self, scale: f64, bias: f64) -> Self {
        self.scale = scale;
        self.bias = bias;
        self
    }

    /// Add a tree, checking that its splits stay within the declared features.
    pub fn push_tree(&mut self, tree: ObliviousTree) -> Result<(), ForestValidationError> {
        tree.validate_features(self.n_features)
            .map_err(|error| ForestValidationError {
                tree_idx: self.trees.len(),
                error,
            })?;
        self.trees.push(tree);
        Ok(())
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of declared features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Get a reference to a specific tree.
    #[inline]
    pub fn tree(&self, idx: usize) -> &ObliviousTree {
        &self.trees[idx]
    }

    /// Iterate over trees in insertion order.
    pub fn trees(&self) -> impl Iterator<Item = &ObliviousTree> {
        self.trees.iter()
    }

    /// Re-check every tree against the declared feature count.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate_features(self.n_features)
                .map_err(|error| ForestValidationError { tree_idx, error })?;
        }
        Ok(())
    }

    /// Sum of leaf values, tree by tree, without the post-transform.
    ///
    /// This is the naive reference evaluation; the compiled engine must agree
    /// with it up to floating point summation order.
    ///
    /// # Panics
    ///
    /// Panics if `features.len() < self.n_features()` and a split reads past the end.
    pub fn predict_raw(&self, features: &[f32]) -> f64 {
        self.trees.iter().map(|tree| tree.predict(features)).sum()
    }

    /// Naive reference score including the post-transform.
    pub fn predict_row(&self, features: &[f32]) -> f64 {
        self.scale * self.predict_raw(features) + self.bias
    }
}
