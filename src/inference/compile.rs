//! Grouping compiler: oblivious forest to block stream.
//!
//! Trees are bucketed by depth and buckets are emitted in ascending depth order.
//! Within a bucket, trees are packed four at a time into
//! [`GroupedTrees`](BlockKind::GroupedTrees) blocks. Each leftover tree becomes
//! a [`GroupedChunks`](BlockKind::GroupedChunks) block when it has at least four
//! splits, or a [`Scalar`](BlockKind::Scalar) block otherwise.
//!
//! Record layout per block kind:
//!
//! ```text
//! GroupedTrees   header | depth x Split4Record (lane k = tree k at that level)
//!                leaves: tree0 | tree1 | tree2 | tree3   (2^depth each)
//! GroupedChunks  header | depth/4 x Split4Record (lane k = split 4c+k)
//!                       | depth%4 x SplitRecord (tail splits)
//!                leaves: 2^depth
//! Scalar         header | depth x SplitRecord
//!                leaves: 2^depth
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use super::encoded::EncodedForest;
use crate::io::{
    BlockHeader, BlockKind, BlockWriter, CodecError, Split4Record, SplitRecord, ALIGNMENT,
};
use crate::repr::oblivious::{ObliviousForest, ObliviousTree};

/// Minimum depth for which a single tree is packed into 4-split chunks.
pub const MIN_CHUNKED_DEPTH: usize = 4;

/// Order in which same-depth trees are packed into groups of four.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroupingOrder {
    /// Trees keep their order of appearance in the forest.
    #[default]
    Encounter,
    /// Trees are stably sorted by their split feature-index sequence first.
    ///
    /// Trees testing the same features end up in the same group, which keeps
    /// the gathered feature values of a lane record close together.
    SortedBySplitIndex,
}

/// Compile a forest into a validated block stream.
///
/// The result scores every example like [`ObliviousForest::predict_raw`], up to
/// floating point summation order.
pub fn compile(
    forest: &ObliviousForest,
    order: GroupingOrder,
) -> Result<EncodedForest, CodecError> {
    let mut buckets: BTreeMap<usize, Vec<&ObliviousTree>> = BTreeMap::new();
    for tree in forest.trees() {
        buckets.entry(tree.depth()).or_default().push(tree);
    }

    let n_leaves: usize = forest.trees().map(ObliviousTree::n_leaves).sum();
    let mut leaf_values = Vec::with_capacity(n_leaves);
    let mut writer = BlockWriter::with_capacity(estimate_stream_len(forest));

    for (depth, mut trees) in buckets {
        if order == GroupingOrder::SortedBySplitIndex {
            trees.sort_by(|a, b| a.split_features().cmp(b.split_features()));
        }

        let mut groups = trees.chunks_exact(4);
        for group in groups.by_ref() {
            let group = [group[0], group[1], group[2], group[3]];
            write_grouped_trees(&mut writer, &mut leaf_values, depth, group);
        }
        for &tree in groups.remainder() {
            if depth >= MIN_CHUNKED_DEPTH {
                write_grouped_chunks(&mut writer, &mut leaf_values, tree);
            } else {
                write_scalar(&mut writer, &mut leaf_values, tree);
            }
        }
    }

    let encoded = EncodedForest::from_parts(
        writer.into_bytes(),
        leaf_values.into_boxed_slice(),
        forest.n_features(),
    )?;

    let stats = encoded.stats();
    debug!(
        n_trees = stats.n_trees,
        grouped_trees = stats.grouped_trees_blocks,
        grouped_chunks = stats.grouped_chunks_blocks,
        scalar = stats.scalar_blocks,
        n_leaf_values = stats.n_leaf_values,
        ?order,
        "compiled oblivious forest"
    );
    Ok(encoded)
}

/// Upper bound on stream bytes: one header per tree plus one record per split.
fn estimate_stream_len(forest: &ObliviousForest) -> usize {
    let n_splits: usize = forest.trees().map(ObliviousTree::depth).sum();
    (forest.n_trees() + n_splits) * 2 * ALIGNMENT
}

fn write_grouped_trees(
    writer: &mut BlockWriter,
    leaf_values: &mut Vec<f64>,
    depth: usize,
    group: [&ObliviousTree; 4],
) {
    writer.write(&BlockHeader::new(BlockKind::GroupedTrees, depth as u32));
    for level in 0..depth {
        let splits = group.map(|tree| &tree.splits()[level]);
        writer.write(&Split4Record::from_splits(splits));
    }
    for tree in group {
        leaf_values.extend_from_slice(tree.leaf_values());
    }
}

fn write_grouped_chunks(writer: &mut BlockWriter, leaf_values: &mut Vec<f64>, tree: &ObliviousTree) {
    writer.write(&BlockHeader::new(BlockKind::GroupedChunks, tree.depth() as u32));
    let mut chunks = tree.splits().chunks_exact(4);
    for chunk in chunks.by_ref() {
        writer.write(&Split4Record::from_splits([
            &chunk[0], &chunk[1], &chunk[2], &chunk[3],
        ]));
    }
    for split in chunks.remainder() {
        writer.write(&SplitRecord::from(split));
    }
    leaf_values.extend_from_slice(tree.leaf_values());
}

fn write_scalar(writer: &mut BlockWriter, leaf_values: &mut Vec<f64>, tree: &ObliviousTree) {
    writer.write(&BlockHeader::new(BlockKind::Scalar, tree.depth() as u32));
    for split in tree.splits() {
        writer.write(&SplitRecord::from(split));
    }
    leaf_values.extend_from_slice(tree.leaf_values());
}
