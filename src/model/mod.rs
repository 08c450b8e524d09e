//! Model façade.
//!
//! - [`Model`]: load-then-apply handle, empty until a load succeeds
//! - [`CompiledModel`]: compiled forest plus affine post-transform
//! - [`EngineConfig`]: compilation and evaluation settings
//! - [`ModelError`]: errors surfaced by loading and applying

mod compiled;
mod config;
mod error;
mod facade;

pub use compiled::CompiledModel;
pub use config::{ConfigError, EngineConfig};
pub use error::ModelError;
pub use facade::Model;
