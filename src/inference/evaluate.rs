//! Block stream evaluation.
//!
//! Every call walks the stream from the start. For each block the leaf index of
//! every covered tree is computed from the split comparisons and the matching
//! leaf value is added to the running score; the leaf offset then advances by
//! the block's leaf length.
//!
//! The batch kernel replays the same walk for `N` examples at once, reading each
//! record a single time. Leaf values are accumulated in the same order as the
//! single-example walk, so batched scores are bit-identical to single scores.

use tracing::trace;

use super::encoded::EncodedForest;
use super::lanes::{LaneBackend, LANES};
use crate::io::{BlockKind, BlockReader, Split4Record, SplitRecord};

/// Largest supported batch width.
pub const MAX_BATCH_WIDTH: usize = 8;

/// Bit weight of each lane within a 4-split chunk.
const CHUNK_WEIGHTS: [u32; LANES] = [1, 2, 4, 8];

#[inline]
fn split_bit(features: &[f32], split: &SplitRecord) -> u32 {
    (features[split.feature as usize] > split.threshold) as u32
}

// =============================================================================
// Single example
// =============================================================================

/// Raw score (sum of leaf values) of one example.
///
/// # Panics
///
/// Panics if `features.len() < forest.n_features()`.
pub fn predict_raw<B: LaneBackend>(forest: &EncodedForest, features: &[f32]) -> f64 {
    assert!(
        features.len() >= forest.n_features(),
        "example has {} features, forest needs {}",
        features.len(),
        forest.n_features()
    );
    let score = walk_one::<B>(forest, features);
    debug_assert!(score.is_some(), "block stream is validated on construction");
    score.unwrap_or(f64::NAN)
}

fn walk_one<B: LaneBackend>(forest: &EncodedForest, features: &[f32]) -> Option<f64> {
    let leaves = forest.leaf_values();
    let mut reader = BlockReader::new(forest.block_bytes());
    let mut offset = 0usize;
    let mut score = 0.0f64;

    while let Some(block) = reader.next_block() {
        let n_leaves = 1usize << block.depth;
        match block.kind {
            BlockKind::Scalar => {
                let mut idx = 0u32;
                for level in 0..block.depth {
                    let split: SplitRecord = reader.read()?;
                    idx |= split_bit(features, &split) << level;
                }
                score += *leaves.get(offset + idx as usize)?;
            }
            BlockKind::GroupedChunks => {
                let (n_chunks, n_tail) = block.kind.record_counts(block.depth);
                let mut acc = B::zero();
                for chunk in 0..n_chunks {
                    let record: Split4Record = reader.read()?;
                    let weights = B::shl(B::from_array(CHUNK_WEIGHTS), 4 * chunk);
                    let bits = B::select_gt(
                        B::load(record.gather(features)),
                        B::load(record.thresholds),
                        weights,
                    );
                    acc = B::or(acc, bits);
                }
                let mut idx = B::hsum(acc);
                for tail in 0..n_tail {
                    let split: SplitRecord = reader.read()?;
                    idx |= split_bit(features, &split) << (4 * n_chunks + tail);
                }
                score += *leaves.get(offset + idx as usize)?;
            }
            BlockKind::GroupedTrees => {
                let mut acc = B::zero();
                for level in 0..block.depth {
                    let record: Split4Record = reader.read()?;
                    let bits = B::select_gt(
                        B::load(record.gather(features)),
                        B::load(record.thresholds),
                        B::splat(1 << level),
                    );
                    acc = B::or(acc, bits);
                }
                for (lane, idx) in B::to_array(acc).into_iter().enumerate() {
                    score += *leaves.get(offset + lane * n_leaves + idx as usize)?;
                }
            }
        }
        offset += block.leaf_len();
    }
    Some(score)
}

// =============================================================================
// Fixed-width batches
// =============================================================================

/// Raw scores of exactly `N` examples, sharing one walk of the block stream.
fn walk_batch<B: LaneBackend, const N: usize>(
    forest: &EncodedForest,
    rows: &[&[f32]; N],
) -> Option<[f64; N]> {
    let leaves = forest.leaf_values();
    let mut reader = BlockReader::new(forest.block_bytes());
    let mut offset = 0usize;
    let mut scores = [0.0f64; N];

    while let Some(block) = reader.next_block() {
        let n_leaves = 1usize << block.depth;
        match block.kind {
            BlockKind::Scalar => {
                let mut idx = [0u32; N];
                for level in 0..block.depth {
                    let split: SplitRecord = reader.read()?;
                    for (idx, row) in idx.iter_mut().zip(rows) {
                        *idx |= split_bit(row, &split) << level;
                    }
                }
                for (score, idx) in scores.iter_mut().zip(idx) {
                    *score += *leaves.get(offset + idx as usize)?;
                }
            }
            BlockKind::GroupedChunks => {
                let (n_chunks, n_tail) = block.kind.record_counts(block.depth);
                let mut acc = [B::zero(); N];
                for chunk in 0..n_chunks {
                    let record: Split4Record = reader.read()?;
                    let thresholds = B::load(record.thresholds);
                    let weights = B::shl(B::from_array(CHUNK_WEIGHTS), 4 * chunk);
                    for (acc, row) in acc.iter_mut().zip(rows) {
                        let bits = B::select_gt(B::load(record.gather(row)), thresholds, weights);
                        *acc = B::or(*acc, bits);
                    }
                }
                let mut idx = acc.map(B::hsum);
                for tail in 0..n_tail {
                    let split: SplitRecord = reader.read()?;
                    for (idx, row) in idx.iter_mut().zip(rows) {
                        *idx |= split_bit(row, &split) << (4 * n_chunks + tail);
                    }
                }
                for (score, idx) in scores.iter_mut().zip(idx) {
                    *score += *leaves.get(offset + idx as usize)?;
                }
            }
            BlockKind::GroupedTrees => {
                let mut acc = [B::zero(); N];
                for level in 0..block.depth {
                    let record: Split4Record = reader.read()?;
                    let thresholds = B::load(record.thresholds);
                    let bit = B::splat(1 << level);
                    for (acc, row) in acc.iter_mut().zip(rows) {
                        let bits = B::select_gt(B::load(record.gather(row)), thresholds, bit);
                        *acc = B::or(*acc, bits);
                    }
                }
                for (score, acc) in scores.iter_mut().zip(acc) {
                    for (lane, idx) in B::to_array(acc).into_iter().enumerate() {
                        *score += *leaves.get(offset + lane * n_leaves + idx as usize)?;
                    }
                }
            }
        }
        offset += block.leaf_len();
    }
    Some(scores)
}

fn run_batch<B: LaneBackend, const N: usize>(
    forest: &EncodedForest,
    rows: &[&[f32]],
    out: &mut [f64],
) {
    let Ok(rows) = <&[&[f32]; N]>::try_from(rows) else {
        debug_assert!(false, "batch of {} rows dispatched to width {N}", rows.len());
        return;
    };
    let scores = walk_batch::<B, N>(forest, rows);
    debug_assert!(scores.is_some(), "block stream is validated on construction");
    let scores = scores.unwrap_or([f64::NAN; N]);
    out.copy_from_slice(&scores);
}

/// Dispatch one batch of at most [`MAX_BATCH_WIDTH`] rows to its fixed-width kernel.
fn dispatch_width<B: LaneBackend>(forest: &EncodedForest, rows: &[&[f32]], out: &mut [f64]) {
    match rows.len() {
        0 => {}
        1 => run_batch::<B, 1>(forest, rows, out),
        2 => run_batch::<B, 2>(forest, rows, out),
        3 => run_batch::<B, 3>(forest, rows, out),
        4 => run_batch::<B, 4>(forest, rows, out),
        5 => run_batch::<B, 5>(forest, rows, out),
        6 => run_batch::<B, 6>(forest, rows, out),
        7 => run_batch::<B, 7>(forest, rows, out),
        _ => run_batch::<B, MAX_BATCH_WIDTH>(forest, rows, out),
    }
}

/// Raw scores of many examples.
///
/// Rows are processed in maximal batches of `width` (clamped to
/// `1..=MAX_BATCH_WIDTH`) plus one smaller remainder batch.
///
/// # Panics
///
/// Panics if `out.len() != rows.len()` or any row is shorter than
/// `forest.n_features()`.
pub fn predict_raw_batch<B: LaneBackend>(
    forest: &EncodedForest,
    rows: &[&[f32]],
    width: usize,
    out: &mut [f64],
) {
    assert_eq!(
        rows.len(),
        out.len(),
        "output length must equal the number of rows"
    );
    for (i, row) in rows.iter().enumerate() {
        assert!(
            row.len() >= forest.n_features(),
            "row {i} has {} features, forest needs {}",
            row.len(),
            forest.n_features()
        );
    }

    let width = width.clamp(1, MAX_BATCH_WIDTH);
    trace!(n_rows = rows.len(), width, "dispatching batch");

    let mut row_chunks = rows.chunks_exact(width);
    let mut out_chunks = out.chunks_exact_mut(width);
    for (rows, out) in row_chunks.by_ref().zip(out_chunks.by_ref()) {
        dispatch_width::<B>(forest, rows, out);
    }
    dispatch_width::<B>(forest, row_chunks.remainder(), out_chunks.into_remainder());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::compile::{compile, GroupingOrder};
    use crate::inference::lanes::{ScalarLanes, WideLanes};
    use crate::repr::oblivious::{ObliviousForest, ObliviousTree, Split};
    use rstest::rstest;

    /// Tree over features `0..depth`, all thresholds 0.5, leaf `i` = `base + i`.
    fn ladder(depth: usize, base: f64) -> ObliviousTree {
        let splits: Vec<_> = (0..depth as u32).map(|f| Split::new(f, 0.5)).collect();
        let leaves: Vec<f64> = (0..1usize << depth).map(|i| base + i as f64).collect();
        ObliviousTree::new(splits, leaves).unwrap()
    }

    fn forest_of(trees: Vec<ObliviousTree>, n_features: usize) -> ObliviousForest {
        let mut forest = ObliviousForest::new(n_features);
        for tree in trees {
            forest.push_tree(tree).unwrap();
        }
        forest
    }

    fn assert_matches_naive(forest: &ObliviousForest, features: &[f32]) {
        let encoded = compile(forest, GroupingOrder::Encounter).unwrap();
        let expected = forest.predict_raw(features);
        assert_eq!(predict_raw::<WideLanes>(&encoded, features), expected);
        assert_eq!(predict_raw::<ScalarLanes>(&encoded, features), expected);
    }

    #[rstest]
    #[case::scalar_block(vec![ladder(3, 0.0)])]
    #[case::chunk_block(vec![ladder(6, 0.0)])]
    #[case::chunk_block_no_tail(vec![ladder(8, 0.0)])]
    #[case::grouped_trees(vec![ladder(2, 0.0), ladder(2, 10.0), ladder(2, 20.0), ladder(2, 30.0)])]
    fn every_block_kind_matches_naive(#[case] trees: Vec<ObliviousTree>) {
        let forest = forest_of(trees, 8);
        let rows: [[f32; 8]; 4] = [
            [0.0; 8],
            [1.0; 8],
            [0.9, 0.0, 0.9, 0.0, 0.9, 0.0, 0.9, 0.0],
            [0.0, 0.9, 0.9, 0.0, 0.0, 0.9, 0.9, 0.0],
        ];
        for row in &rows {
            assert_matches_naive(&forest, row);
        }
    }

    #[rstest]
    #[case::scalar_block(3, 1)]
    #[case::chunk_block(6, 1)]
    #[case::grouped_trees(2, 4)]
    fn ties_go_to_zero_bit_on_every_block_kind(#[case] depth: usize, #[case] n_trees: usize) {
        let trees = (0..n_trees)
            .map(|i| ladder(depth, 100.0 * i as f64))
            .collect();
        let forest = forest_of(trees, 8);
        let at_threshold = [0.5f32; 8];
        let encoded = compile(&forest, GroupingOrder::Encounter).unwrap();

        let expected = forest.predict_raw(&at_threshold);
        // Leaf 0 of every tree
        let leaf_zero_sum: f64 = forest.trees().map(|t| t.leaf_values()[0]).sum();
        assert_eq!(expected, leaf_zero_sum);
        assert_eq!(predict_raw::<WideLanes>(&encoded, &at_threshold), expected);
        assert_eq!(predict_raw::<ScalarLanes>(&encoded, &at_threshold), expected);

        let nan = [f32::NAN; 8];
        assert_eq!(predict_raw::<WideLanes>(&encoded, &nan), leaf_zero_sum);
        assert_eq!(predict_raw::<ScalarLanes>(&encoded, &nan), leaf_zero_sum);
    }

    #[test]
    fn chunk_bits_follow_split_order() {
        // Only split 5 fires: leaf index 1 << 5
        let forest = forest_of(vec![ladder(6, 0.0)], 6);
        let encoded = compile(&forest, GroupingOrder::Encounter).unwrap();
        let features = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        assert_eq!(predict_raw::<WideLanes>(&encoded, &features), 32.0);

        // Only split 2 fires: lane 2 of the first chunk
        let features = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        assert_eq!(predict_raw::<ScalarLanes>(&encoded, &features), 4.0);
    }

    #[test]
    fn grouped_trees_read_their_own_leaf_region() {
        let forest = forest_of(
            vec![ladder(1, 0.0), ladder(1, 10.0), ladder(1, 20.0), ladder(1, 30.0)],
            1,
        );
        let encoded = compile(&forest, GroupingOrder::Encounter).unwrap();
        assert_eq!(encoded.stats().grouped_trees_blocks, 1);
        assert_eq!(predict_raw::<WideLanes>(&encoded, &[0.6]), 1.0 + 11.0 + 21.0 + 31.0);
        assert_eq!(predict_raw::<WideLanes>(&encoded, &[0.4]), 60.0);
    }

    #[test]
    fn two_stumps_sum() {
        let stump = |left, right| {
            ObliviousTree::new(vec![Split::new(0, 0.5)], vec![left, right]).unwrap()
        };
        let forest = forest_of(vec![stump(1.0, 2.0), stump(10.0, 20.0)], 1);
        let encoded = compile(&forest, GroupingOrder::Encounter).unwrap();
        assert_eq!(predict_raw::<WideLanes>(&encoded, &[0.6]), 22.0);
    }

    #[rstest]
    fn batch_matches_single(
        #[values(0, 1, 3, 4, 7, 8, 9, 17)] n_rows: usize,
        #[values(1, 3, 4, 8)] width: usize,
    ) {
        let trees = vec![
            ladder(1, 0.0),
            ladder(2, 1.0),
            ladder(2, 2.0),
            ladder(2, 3.0),
            ladder(2, 4.0),
            ladder(5, 5.0),
            ladder(9, 6.0),
        ];
        let forest = forest_of(trees, 9);
        let encoded = compile(&forest, GroupingOrder::Encounter).unwrap();

        let data: Vec<Vec<f32>> = (0..n_rows)
            .map(|r| (0..9).map(|c| ((r * 7 + c * 3) % 10) as f32 / 10.0).collect())
            .collect();
        let rows: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();

        let mut out = vec![0.0; n_rows];
        predict_raw_batch::<WideLanes>(&encoded, &rows, width, &mut out);
        let mut out_scalar = vec![0.0; n_rows];
        predict_raw_batch::<ScalarLanes>(&encoded, &rows, width, &mut out_scalar);

        for (i, row) in rows.iter().enumerate() {
            let single = predict_raw::<WideLanes>(&encoded, row);
            assert_eq!(out[i], single, "row {i}");
            assert_eq!(out_scalar[i], single, "row {i}");
        }
    }

    #[test]
    #[should_panic(expected = "output length")]
    fn batch_rejects_wrong_output_length() {
        let forest = forest_of(vec![ladder(1, 0.0)], 1);
        let encoded = compile(&forest, GroupingOrder::Encounter).unwrap();
        let row = [0.0f32];
        predict_raw_batch::<WideLanes>(&encoded, &[&row], 8, &mut []);
    }
}
