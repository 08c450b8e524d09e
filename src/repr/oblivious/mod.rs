//! Oblivious decision tree representations.
//!
//! An oblivious tree applies the same `(feature, threshold)` test to every node at
//! a given depth, so the path of an example is fully described by a `depth`-bit
//! integer: bit `i` is set iff `features[splits[i].feature] > splits[i].threshold`.
//! That integer indexes directly into the tree's `2^depth` leaf values.

mod forest;
mod tree;

pub use forest::{ForestValidationError, ObliviousForest};
pub use tree::{ObliviousTree, Split, TreeValidationError, MAX_DEPTH};
