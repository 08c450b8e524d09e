//! Block stream encoding for compiled forests.
//!
//! A compiled forest is an append-only byte stream of fixed-layout records. Each
//! record is padded to [`ALIGNMENT`] bytes. A block starts with a
//! [`BlockHeader`] carrying an explicit kind tag, the tree depth, the number of
//! split records that follow, and the number of leaf values the block consumes
//! from the shared leaf table.
//!
//! Records are converted to and from bytes with `bytemuck`, so reading never
//! reinterprets memory in place: every record is copied out of the stream after
//! a bounds check.

mod codec;
mod records;

pub use codec::{BlockInfo, BlockReader, BlockWriter, CodecError, ALIGNMENT};
pub use records::{BlockHeader, BlockKind, Split4Record, SplitRecord};
