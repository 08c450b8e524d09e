//! Single oblivious tree: ordered splits plus a dense leaf table.

/// Maximum supported tree depth.
///
/// The leaf index of an example is accumulated in a `u32`, so a tree may have at
/// most 31 splits.
pub const MAX_DEPTH: usize = 31;

/// Structural validation errors for [`ObliviousTree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree depth {depth} exceeds the maximum of {max}", max = MAX_DEPTH)]
    DepthTooLarge { depth: usize },
    #[error("tree of depth {depth} needs {expected} leaf values, got {got}")]
    LeafCountMismatch {
        depth: usize,
        expected: usize,
        got: usize,
    },
    #[error("split {split} uses feature {feature} but the model declares {n_features} features")]
    FeatureOutOfRange {
        split: usize,
        feature: u32,
        n_features: usize,
    },
}

/// One level test of an oblivious tree.
///
/// An example goes "right" (contributes a set bit) iff its feature value is
/// strictly greater than `threshold`. NaN never compares greater.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// Split border.
    pub threshold: f32,
    /// Index of the tested feature.
    pub feature: u32,
}

impl Split {
    /// Create a new split.
    #[inline]
    pub fn new(feature: u32, threshold: f32) -> Self {
        Self { threshold, feature }
    }

    /// Evaluate the split for one example, returning 0 or 1.
    #[inline]
    pub fn bit(&self, features: &[f32]) -> u32 {
        (features[self.feature as usize] > self.threshold) as u32
    }
}

/// Oblivious decision tree.
///
/// Invariant: `leaf_values.len() == 1 << splits.len()` and
/// `splits.len() <= MAX_DEPTH`. Both are checked by [`ObliviousTree::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObliviousTree {
    splits: Box<[Split]>,
    leaf_values: Box<[f64]>,
}

impl ObliviousTree {
    /// Build a tree, checking depth and leaf-count invariants.
    pub fn new(
        splits: impl Into<Box<[Split]>>,
        leaf_values: impl Into<Box<[f64]>>,
    ) -> Result<Self, TreeValidationError> {
        let splits = splits.into();
        let leaf_values = leaf_values.into();

        let depth = splits.len();
        if depth > MAX_DEPTH {
            return Err(TreeValidationError::DepthTooLarge { depth });
        }
        let expected = 1usize << depth;
        if leaf_values.len() != expected {
            return Err(TreeValidationError::LeafCountMismatch {
                depth,
                expected,
                got: leaf_values.len(),
            });
        }

        Ok(Self {
            splits,
            leaf_values,
        })
    }

    /// Number of splits (tree depth).
    #[inline]
    pub fn depth(&self) -> usize {
        self.splits.len()
    }

    /// Number of leaves (`2^depth`).
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.leaf_values.len()
    }

    /// Splits in level order.
    #[inline]
    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Leaf values indexed by path bitmask.
    #[inline]
    pub fn leaf_values(&self) -> &[f64] {
        &self.leaf_values
    }

    /// Iterate over the feature indices used by the splits, in level order.
    pub fn split_features(&self) -> impl Iterator<Item = u32> + '_ {
        self.splits.iter().map(|s| s.feature)
    }

    /// Check that every split references a feature below `n_features`.
    pub fn validate_features(&self, n_features: usize) -> Result<(), TreeValidationError> {
        for (split_idx, split) in self.splits.iter().enumerate() {
            if split.feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    split: split_idx,
                    feature: split.feature,
                    n_features,
                });
            }
        }
        Ok(())
    }

    /// Compute the leaf index for one example.
    #[inline]
    pub fn leaf_index(&self, features: &[f32]) -> usize {
        self.splits
            .iter()
            .enumerate()
            .fold(0u32, |idx, (level, split)| idx | (split.bit(features) << level)) as usize
    }

    /// Leaf value reached by one example.
    #[inline]
    pub fn predict(&self, features: &[f32]) -> f64 {
        self.leaf_values[self.leaf_index(features)]
    }
}
