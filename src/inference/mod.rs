//! Compilation and evaluation of oblivious forests.
//!
//! # Module Structure
//!
//! - [`compile`]: grouping compiler, forest to block stream
//! - [`encoded`]: validated block stream plus shared leaf table
//! - [`evaluate`]: single-example and fixed-width batch walks
//! - [`lanes`]: four-wide comparison backends (SIMD and portable)
//!
//! # Quick Start
//!
//! ```
//! use oblivious_boost::inference::{compile, predict_raw, GroupingOrder, WideLanes};
//! use oblivious_boost::repr::oblivious::{ObliviousForest, ObliviousTree, Split};
//!
//! let mut forest = ObliviousForest::new(1);
//! forest
//!     .push_tree(ObliviousTree::new(vec![Split::new(0, 0.5)], vec![1.0, 2.0]).unwrap())
//!     .unwrap();
//!
//! let encoded = compile(&forest, GroupingOrder::Encounter).unwrap();
//! assert_eq!(predict_raw::<WideLanes>(&encoded, &[0.6]), 2.0);
//! ```

pub mod compile;
pub mod encoded;
pub mod evaluate;
pub mod lanes;

pub use compile::{compile, GroupingOrder, MIN_CHUNKED_DEPTH};
pub use encoded::{CompileStats, EncodedForest};
pub use evaluate::{predict_raw, predict_raw_batch, MAX_BATCH_WIDTH};
pub use lanes::{LaneBackend, LaneKind, ScalarLanes, WideLanes, LANES};
