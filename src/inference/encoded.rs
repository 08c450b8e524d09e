//! Compiled block stream plus its shared leaf table.

use crate::io::{BlockInfo, BlockKind, BlockReader, CodecError, Split4Record, SplitRecord};

/// Compiled forest: a validated block stream and the leaf values it indexes.
///
/// Blocks consume the leaf table front to back, each advancing a shared offset
/// by [`BlockInfo::leaf_len`]. Construction walks the whole stream once, so the
/// evaluator can rely on every block being well formed and every feature index
/// being below [`n_features`](Self::n_features).
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedForest {
    blocks: Box<[u8]>,
    leaf_values: Box<[f64]>,
    n_features: usize,
    n_blocks: usize,
}

/// Block counts of a compiled forest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub n_trees: usize,
    pub scalar_blocks: usize,
    pub grouped_chunks_blocks: usize,
    pub grouped_trees_blocks: usize,
    pub n_leaf_values: usize,
}

impl CompileStats {
    /// Total number of blocks.
    pub fn n_blocks(&self) -> usize {
        self.scalar_blocks + self.grouped_chunks_blocks + self.grouped_trees_blocks
    }
}

impl EncodedForest {
    /// Validate a block stream against its leaf table and feature count.
    pub fn from_parts(
        blocks: Box<[u8]>,
        leaf_values: Box<[f64]>,
        n_features: usize,
    ) -> Result<Self, CodecError> {
        let n_blocks = validate_stream(&blocks, leaf_values.len(), n_features)?;
        Ok(Self {
            blocks,
            leaf_values,
            n_features,
            n_blocks,
        })
    }

    /// Raw block stream bytes.
    #[inline]
    pub fn block_bytes(&self) -> &[u8] {
        &self.blocks
    }

    /// Shared leaf table.
    #[inline]
    pub fn leaf_values(&self) -> &[f64] {
        &self.leaf_values
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    /// Decoded headers of every block, in stream order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        let mut reader = BlockReader::new(&self.blocks);
        std::iter::from_fn(move || {
            let info = reader.next_block()?;
            skip_records(&mut reader, info)?;
            Some(info)
        })
    }

    /// Number of source trees covered by the blocks.
    pub fn n_trees(&self) -> usize {
        self.blocks().map(|info| info.kind.n_trees()).sum()
    }

    pub fn stats(&self) -> CompileStats {
        let mut stats = CompileStats {
            n_leaf_values: self.leaf_values.len(),
            ..CompileStats::default()
        };
        for info in self.blocks() {
            stats.n_trees += info.kind.n_trees();
            match info.kind {
                BlockKind::Scalar => stats.scalar_blocks += 1,
                BlockKind::GroupedChunks => stats.grouped_chunks_blocks += 1,
                BlockKind::GroupedTrees => stats.grouped_trees_blocks += 1,
            }
        }
        stats
    }
}

fn skip_records(reader: &mut BlockReader<'_>, info: BlockInfo) -> Option<()> {
    let (wide, single) = info.kind.record_counts(info.depth);
    for _ in 0..wide {
        reader.read::<Split4Record>()?;
    }
    for _ in 0..single {
        reader.read::<SplitRecord>()?;
    }
    Some(())
}

/// Walk every block, checking headers, record presence and feature indices.
///
/// Returns the number of blocks.
fn validate_stream(
    blocks: &[u8],
    n_leaf_values: usize,
    n_features: usize,
) -> Result<usize, CodecError> {
    let check_feature = |offset: usize, feature: u32| {
        if feature as usize >= n_features {
            Err(CodecError::FeatureOutOfRange {
                offset,
                feature,
                n_features,
            })
        } else {
            Ok(())
        }
    };

    let mut reader = BlockReader::new(blocks);
    let mut n_blocks = 0;
    let mut leaf_len = 0usize;

    while let Some(info) = reader.try_next_block()? {
        let (wide, single) = info.kind.record_counts(info.depth);
        for _ in 0..wide {
            let offset = reader.position();
            let record: Split4Record = reader.read().ok_or(CodecError::Truncated { offset })?;
            for feature in record.features {
                check_feature(offset, feature)?;
            }
        }
        for _ in 0..single {
            let offset = reader.position();
            let record: SplitRecord = reader.read().ok_or(CodecError::Truncated { offset })?;
            check_feature(offset, record.feature)?;
        }
        leaf_len += info.leaf_len();
        n_blocks += 1;
    }

    if leaf_len != n_leaf_values {
        return Err(CodecError::LeafTableMismatch {
            expected: leaf_len,
            got: n_leaf_values,
        });
    }
    Ok(n_blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{BlockHeader, BlockWriter};

    fn scalar_stream(feature: u32) -> Box<[u8]> {
        let mut writer = BlockWriter::new();
        writer.write(&BlockHeader::new(BlockKind::Scalar, 1));
        writer.write(&SplitRecord {
            threshold: 0.5,
            feature,
        });
        writer.into_bytes()
    }

    #[test]
    fn accepts_valid_stream() {
        let forest = EncodedForest::from_parts(scalar_stream(0), vec![0.0, 1.0].into(), 1).unwrap();
        assert_eq!(forest.n_blocks(), 1);
        assert_eq!(forest.n_trees(), 1);
        let blocks: Vec<_> = forest.blocks().collect();
        assert_eq!(
            blocks,
            vec![BlockInfo {
                kind: BlockKind::Scalar,
                depth: 1
            }]
        );
        let stats = forest.stats();
        assert_eq!(stats.scalar_blocks, 1);
        assert_eq!(stats.n_blocks(), 1);
        assert_eq!(stats.n_leaf_values, 2);
    }

    #[test]
    fn accepts_empty_stream() {
        let forest = EncodedForest::from_parts(Box::new([]), Box::new([]), 3).unwrap();
        assert_eq!(forest.n_blocks(), 0);
        assert_eq!(forest.stats(), CompileStats::default());
    }

    #[test]
    fn rejects_feature_out_of_range() {
        let err = EncodedForest::from_parts(scalar_stream(2), vec![0.0, 1.0].into(), 2).unwrap_err();
        assert_eq!(
            err,
            CodecError::FeatureOutOfRange {
                offset: 16,
                feature: 2,
                n_features: 2
            }
        );
    }

    #[test]
    fn rejects_leaf_table_mismatch() {
        let err = EncodedForest::from_parts(scalar_stream(0), vec![0.0].into(), 1).unwrap_err();
        assert_eq!(err, CodecError::LeafTableMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn rejects_missing_records() {
        let mut writer = BlockWriter::new();
        writer.write(&BlockHeader::new(BlockKind::GroupedTrees, 2));
        writer.write(&Split4Record {
            thresholds: [0.0; 4],
            features: [0; 4],
        });
        let err = EncodedForest::from_parts(writer.into_bytes(), vec![0.0; 16].into(), 1)
            .unwrap_err();
        assert_eq!(err, CodecError::Truncated { offset: 48 });
    }
}
