//! oblivious-boost: fast inference for ensembles of oblivious decision trees.
//!
//! Loads CatBoost-style JSON model descriptions, compiles the trees into a
//! grouped block stream and scores examples with four-wide lane comparisons.
//!
//! # Key Types
//!
//! - [`Model`] - Load-then-apply handle, the main entry point
//! - [`CompiledModel`] - A loaded model with its block stream and post-transform
//! - [`EngineConfig`] - Grouping order, lane backend and batch settings
//! - [`repr::oblivious::ObliviousForest`] - Canonical in-memory forest
//!
//! # Loading Models
//!
//! Use [`Model::load_path`] or [`Model::load_slice`] for JSON descriptions, or
//! [`Model::load_forest`] for a forest built in memory.
//! See the [`compat`] module for the description format.
//!
//! # C ABI
//!
//! With the `capi` feature the crate exports `ob_model_*` symbols; see `ffi`.

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod compat;
pub mod inference;
pub mod io;
pub mod model;
pub mod repr;
pub mod testing;
pub mod utils;

#[cfg(feature = "capi")]
pub mod ffi;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use model::{CompiledModel, ConfigError, EngineConfig, Model, ModelError};

pub use inference::{CompileStats, GroupingOrder, LaneKind};

pub use repr::oblivious::{ObliviousForest, ObliviousTree, Split};

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
