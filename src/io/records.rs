//! Fixed-layout records of the block stream.

use bytemuck::{Pod, Zeroable};

use crate::repr::oblivious::Split;

// =============================================================================
// Block kinds
// =============================================================================

/// Kind of a compiled block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    /// One tree, one split evaluated at a time.
    Scalar,
    /// One deep tree, splits evaluated four at a time plus a scalar tail.
    GroupedChunks,
    /// Four trees of equal depth evaluated lane-wise.
    GroupedTrees,
}

impl BlockKind {
    /// Stream tag of this kind. Zero is reserved so zeroed memory never decodes.
    #[inline]
    pub const fn tag(self) -> u32 {
        match self {
            BlockKind::Scalar => 1,
            BlockKind::GroupedChunks => 2,
            BlockKind::GroupedTrees => 3,
        }
    }

    #[inline]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(BlockKind::Scalar),
            2 => Some(BlockKind::GroupedChunks),
            3 => Some(BlockKind::GroupedTrees),
            _ => None,
        }
    }

    /// Number of trees covered by one block of this kind.
    #[inline]
    pub const fn n_trees(self) -> usize {
        match self {
            BlockKind::GroupedTrees => 4,
            BlockKind::Scalar | BlockKind::GroupedChunks => 1,
        }
    }

    /// Number of leaf values consumed by a block of this kind at `depth`.
    #[inline]
    pub const fn leaf_len(self, depth: u32) -> usize {
        self.n_trees() << depth
    }

    /// `(4-wide records, single records)` that follow the header.
    #[inline]
    pub const fn record_counts(self, depth: u32) -> (u32, u32) {
        match self {
            BlockKind::Scalar => (0, depth),
            BlockKind::GroupedChunks => (depth / 4, depth % 4),
            BlockKind::GroupedTrees => (depth, 0),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Block header record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BlockHeader {
    /// [`BlockKind::tag`].
    pub tag: u32,
    /// Depth of every tree in the block.
    pub depth: u32,
    /// Total number of split records (4-wide and single) following the header.
    pub n_records: u32,
    /// Number of leaf values consumed from the shared table.
    pub leaf_len: u32,
}

impl BlockHeader {
    /// Header for a block of `kind` over trees of `depth`.
    pub fn new(kind: BlockKind, depth: u32) -> Self {
        let (wide, single) = kind.record_counts(depth);
        Self {
            tag: kind.tag(),
            depth,
            n_records: wide + single,
            leaf_len: kind.leaf_len(depth) as u32,
        }
    }

    /// Decoded kind, if the tag is known.
    #[inline]
    pub fn kind(&self) -> Option<BlockKind> {
        BlockKind::from_tag(self.tag)
    }

    /// Whether the record count and leaf length agree with kind and depth.
    pub fn is_consistent(&self, kind: BlockKind) -> bool {
        let (wide, single) = kind.record_counts(self.depth);
        self.n_records == wide + single
            && u64::from(self.leaf_len) == (kind.n_trees() as u64) << self.depth
    }
}

/// A single split.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SplitRecord {
    pub threshold: f32,
    pub feature: u32,
}

impl From<&Split> for SplitRecord {
    fn from(split: &Split) -> Self {
        Self {
            threshold: split.threshold,
            feature: split.feature,
        }
    }
}

/// Four splits compared in one lane-wise pass.
///
/// Lane `k` holds either the `k`-th tree of a tree group (same level), or the
/// `k`-th split of a 4-split chunk of one tree.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Split4Record {
    pub thresholds: [f32; 4],
    pub features: [u32; 4],
}

impl Split4Record {
    pub fn from_splits(splits: [&Split; 4]) -> Self {
        Self {
            thresholds: splits.map(|s| s.threshold),
            features: splits.map(|s| s.feature),
        }
    }

    /// Gather the four tested feature values of one example.
    #[inline]
    pub fn gather(&self, features: &[f32]) -> [f32; 4] {
        self.features.map(|f| features[f as usize])
    }
}
