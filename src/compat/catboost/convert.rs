//! Conversion from CatBoost JSON types to native oblivious trees.

use super::json::{CbModel, CbTree};
use crate::repr::oblivious::{ObliviousForest, ObliviousTree, Split, TreeValidationError};

/// Only float splits carry this type (or none at all).
const FLOAT_FEATURE_SPLIT: &str = "FloatFeature";

/// Error type for CatBoost model conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("tree {tree}: {source}")]
    InvalidTree {
        tree: usize,
        source: TreeValidationError,
    },
    #[error("tree {tree}, split {split}: unsupported split type {split_type:?}")]
    UnsupportedSplitType {
        tree: usize,
        split: usize,
        split_type: String,
    },
    #[error("tree {tree}, split {split}: missing float_feature_index")]
    MissingFeatureIndex { tree: usize, split: usize },
}

fn convert_tree(tree_idx: usize, tree: &CbTree) -> Result<ObliviousTree, ConversionError> {
    let splits = tree
        .splits
        .iter()
        .enumerate()
        .map(|(split_idx, split)| {
            if let Some(split_type) = split.split_type.as_deref() {
                if split_type != FLOAT_FEATURE_SPLIT {
                    return Err(ConversionError::UnsupportedSplitType {
                        tree: tree_idx,
                        split: split_idx,
                        split_type: split_type.to_owned(),
                    });
                }
            }
            let feature = split
                .float_feature_index
                .ok_or(ConversionError::MissingFeatureIndex {
                    tree: tree_idx,
                    split: split_idx,
                })?;
            Ok(Split::new(feature, split.border))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ObliviousTree::new(splits, tree.leaf_values.as_slice()).map_err(|source| {
        ConversionError::InvalidTree {
            tree: tree_idx,
            source,
        }
    })
}

impl CbModel {
    /// Convert to a native [`ObliviousForest`].
    ///
    /// Each tree is checked for depth and leaf count, then for feature indices
    /// against the declared float feature count.
    pub fn to_forest(&self) -> Result<ObliviousForest, ConversionError> {
        let (scale, bias) = self
            .scale_and_bias
            .map_or((1.0, 0.0), |sb| (sb.scale, sb.bias));
        let mut forest = ObliviousForest::new(self.n_features()).with_scale_and_bias(scale, bias);

        for (tree_idx, tree) in self.oblivious_trees.iter().enumerate() {
            let tree = convert_tree(tree_idx, tree)?;
            forest
                .push_tree(tree)
                .map_err(|e| ConversionError::InvalidTree {
                    tree: e.tree_idx,
                    source: e.error,
                })?;
        }
        Ok(forest)
    }
}
