//! Aligned append-only writer and forward-only checked reader.

use bytemuck::Pod;

use super::records::{BlockHeader, BlockKind};
use crate::repr::oblivious::MAX_DEPTH;

/// Every record occupies a multiple of this many bytes.
pub const ALIGNMENT: usize = 16;

#[inline]
const fn aligned_size(size: usize) -> usize {
    size.next_multiple_of(ALIGNMENT)
}

/// Errors found while validating a block stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown block kind tag {tag} at offset {offset}")]
    UnknownBlockKind { offset: usize, tag: u32 },
    #[error("block stream truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("block header at offset {offset} is inconsistent with its kind and depth")]
    InconsistentHeader { offset: usize },
    #[error("block at offset {offset} has depth {depth}, maximum is {max}", max = MAX_DEPTH)]
    DepthTooLarge { offset: usize, depth: u32 },
    #[error("split at offset {offset} uses feature {feature}, model has {n_features}")]
    FeatureOutOfRange {
        offset: usize,
        feature: u32,
        n_features: usize,
    },
    #[error("blocks consume {expected} leaf values but the table holds {got}")]
    LeafTableMismatch { expected: usize, got: usize },
}

// =============================================================================
// Writer
// =============================================================================

/// Append-only byte buffer of padded records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockWriter {
    data: Vec<u8>,
}

impl BlockWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
        }
    }

    /// Append one record followed by zero padding up to [`ALIGNMENT`].
    pub fn write<T: Pod>(&mut self, record: &T) {
        let bytes = bytemuck::bytes_of(record);
        self.data.extend_from_slice(bytes);
        let padded_len = self.data.len() + aligned_size(bytes.len()) - bytes.len();
        self.data.resize(padded_len, 0);
    }

    /// Number of bytes written so far, padding included.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Box<[u8]> {
        self.data.into_boxed_slice()
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub kind: BlockKind,
    pub depth: u32,
}

impl BlockInfo {
    /// Number of leaf values the block consumes.
    #[inline]
    pub fn leaf_len(&self) -> usize {
        self.kind.leaf_len(self.depth)
    }
}

/// Forward-only reader over a block stream.
///
/// Records must be read back with the same types, in the same order, as they
/// were written. Reads past the end, or of a record that does not fit in the
/// remaining bytes, yield `None`.
#[derive(Debug, Clone)]
pub struct BlockReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Byte offset of the next record.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read the next record as `T`.
    #[inline]
    pub fn read<T: Pod>(&mut self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        let end = self.pos.checked_add(size)?;
        let bytes = self.data.get(self.pos..end)?;
        let record = bytemuck::try_pod_read_unaligned(bytes).ok()?;
        self.pos = (self.pos + aligned_size(size)).min(self.data.len());
        Some(record)
    }

    /// Read and check the next block header.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    pub fn try_next_block(&mut self) -> Result<Option<BlockInfo>, CodecError> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let offset = self.pos;
        let header: BlockHeader = self.read().ok_or(CodecError::Truncated { offset })?;
        let kind = header.kind().ok_or(CodecError::UnknownBlockKind {
            offset,
            tag: header.tag,
        })?;
        if header.depth as usize > MAX_DEPTH {
            return Err(CodecError::DepthTooLarge {
                offset,
                depth: header.depth,
            });
        }
        if !header.is_consistent(kind) {
            return Err(CodecError::InconsistentHeader { offset });
        }
        Ok(Some(BlockInfo {
            kind,
            depth: header.depth,
        }))
    }

    /// Next block header, or `None` at the end of the stream or on a bad header.
    #[inline]
    pub fn next_block(&mut self) -> Option<BlockInfo> {
        self.try_next_block().ok().flatten()
    }
}
