//! Engine configuration with builder pattern.
//!
//! ```
//! use oblivious_boost::model::EngineConfig;
//! use oblivious_boost::inference::{GroupingOrder, LaneKind};
//!
//! // All defaults
//! let config = EngineConfig::builder().build().unwrap();
//! assert_eq!(config.batch_width, 8);
//!
//! let config = EngineConfig::builder()
//!     .grouping(GroupingOrder::SortedBySplitIndex)
//!     .lanes(LaneKind::Scalar)
//!     .batch_width(4)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;

use crate::inference::{GroupingOrder, LaneKind, MAX_BATCH_WIDTH};

// =============================================================================
// ConfigError
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidBatchWidth(usize),
    InvalidBlockSize,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBatchWidth(v) => {
                write!(f, "batch_width must be in 1..={MAX_BATCH_WIDTH}, got {v}")
            }
            Self::InvalidBlockSize => write!(f, "block_size must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// EngineConfig
// =============================================================================

/// Compilation and evaluation settings.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct EngineConfig {
    /// Order in which same-depth trees are packed into groups of four.
    #[builder(default)]
    pub grouping: GroupingOrder,

    /// Lane backend for grouped blocks.
    #[builder(default)]
    pub lanes: LaneKind,

    /// Maximal number of examples evaluated together per block walk.
    #[builder(default = MAX_BATCH_WIDTH)]
    pub batch_width: usize,

    /// Rows per chunk handed to one worker in ndarray prediction.
    #[builder(default = 64)]
    pub block_size: usize,
}

impl<S: engine_config_builder::IsComplete> EngineConfigBuilder<S> {
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BATCH_WIDTH).contains(&self.batch_width) {
            return Err(ConfigError::InvalidBatchWidth(self.batch_width));
        }
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}
