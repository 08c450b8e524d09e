//! Load-then-apply model handle.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use super::compiled::CompiledModel;
use super::config::EngineConfig;
use super::error::ModelError;
use crate::compat::catboost::CbModel;
use crate::repr::oblivious::ObliviousForest;

/// Model handle that may or may not hold a loaded model.
///
/// Loading takes `&mut self` and replaces the current model only on success;
/// a failed load leaves the previous model in place. Applying takes `&self`,
/// so a loaded `Model` can be shared across threads for concurrent scoring.
///
/// ```
/// use oblivious_boost::Model;
///
/// let json = br#"{
///     "features_info": {"float_features": [{}]},
///     "oblivious_trees": [
///         {"splits": [{"border": 0.5, "float_feature_index": 0}], "leaf_values": [0.0, 1.0]}
///     ]
/// }"#;
///
/// let mut model = Model::new();
/// model.load_slice(json).unwrap();
/// assert_eq!(model.apply(&[0.6]).unwrap(), 1.0);
/// assert_eq!(model.apply(&[0.4]).unwrap(), 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Model {
    compiled: Option<CompiledModel>,
    config: EngineConfig,
}

impl Model {
    /// Empty handle with the default engine configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty handle compiling future loads with `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            compiled: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.compiled.is_some()
    }

    /// The loaded model, if any.
    pub fn compiled(&self) -> Option<&CompiledModel> {
        self.compiled.as_ref()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load a JSON model description from a file.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading model");
        let file = File::open(path)?;
        self.load_reader(BufReader::new(file))
    }

    /// Load a JSON model description from a reader.
    pub fn load_reader(&mut self, reader: impl Read) -> Result<(), ModelError> {
        let description: CbModel = serde_json::from_reader(reader)?;
        self.load_description(&description)
    }

    /// Load a JSON model description held in memory.
    pub fn load_slice(&mut self, bytes: &[u8]) -> Result<(), ModelError> {
        let description: CbModel = serde_json::from_slice(bytes)?;
        self.load_description(&description)
    }

    fn load_description(&mut self, description: &CbModel) -> Result<(), ModelError> {
        let forest = description.to_forest()?;
        self.load_forest(&forest)
    }

    /// Compile and install an in-memory forest.
    pub fn load_forest(&mut self, forest: &ObliviousForest) -> Result<(), ModelError> {
        let compiled = CompiledModel::from_forest(forest, &self.config)?;
        debug!(
            n_features = compiled.n_features(),
            n_trees = forest.n_trees(),
            scale = compiled.scale(),
            bias = compiled.bias(),
            "model loaded"
        );
        self.compiled = Some(compiled);
        Ok(())
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    fn loaded(&self) -> Result<&CompiledModel, ModelError> {
        self.compiled.as_ref().ok_or(ModelError::NotLoaded)
    }

    /// Score one example.
    pub fn apply(&self, features: &[f32]) -> Result<f64, ModelError> {
        self.loaded()?.apply(features)
    }

    /// Score many examples into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != rows.len()`.
    pub fn apply_batch_into(&self, rows: &[&[f32]], out: &mut [f64]) -> Result<(), ModelError> {
        self.loaded()?.apply_batch_into(rows, out)
    }

    /// Score many examples, allocating the output.
    pub fn apply_many(&self, rows: &[&[f32]]) -> Result<Vec<f64>, ModelError> {
        self.loaded()?.apply_many(rows)
    }

    /// Score owned row vectors.
    pub fn apply_rows(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>, ModelError> {
        self.loaded()?.apply_rows(rows)
    }

    /// Declared feature count, or 0 when no model is loaded.
    pub fn feature_count(&self) -> usize {
        self.compiled.as_ref().map_or(0, CompiledModel::n_features)
    }
}
