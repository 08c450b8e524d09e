//! Compiled, immutable model.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use tracing::debug;

use super::config::EngineConfig;
use super::error::ModelError;
use crate::inference::{
    compile, predict_raw, predict_raw_batch, CompileStats, EncodedForest, LaneKind, ScalarLanes,
    WideLanes,
};
use crate::repr::oblivious::ObliviousForest;
use crate::utils::run_with_threads;

/// Compiled forest plus its affine post-transform.
///
/// Immutable once built and safe to share across threads; every method takes
/// `&self`.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    encoded: EncodedForest,
    scale: f64,
    bias: f64,
    config: EngineConfig,
}

impl CompiledModel {
    /// Compile a programmatically built forest.
    pub fn from_forest(forest: &ObliviousForest, config: &EngineConfig) -> Result<Self, ModelError> {
        forest.validate()?;
        let encoded = compile(forest, config.grouping)?;
        debug!(
            n_features = encoded.n_features(),
            n_trees = forest.n_trees(),
            scale = forest.scale(),
            bias = forest.bias(),
            lanes = ?config.lanes,
            "model compiled"
        );
        Ok(Self {
            encoded,
            scale: forest.scale(),
            bias: forest.bias(),
            config: config.clone(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn n_features(&self) -> usize {
        self.encoded.n_features()
    }

    pub fn n_trees(&self) -> usize {
        self.encoded.n_trees()
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn stats(&self) -> CompileStats {
        self.encoded.stats()
    }

    pub fn encoded(&self) -> &EncodedForest {
        &self.encoded
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    fn check_features(&self, got: usize) -> Result<(), ModelError> {
        let expected = self.n_features();
        if got < expected {
            return Err(ModelError::InsufficientFeatures { expected, got });
        }
        Ok(())
    }

    #[inline]
    fn transform(&self, raw: f64) -> f64 {
        self.scale * raw + self.bias
    }

    /// Score one example: `scale * Σ leaf + bias`.
    ///
    /// Extra trailing features are ignored.
    pub fn apply(&self, features: &[f32]) -> Result<f64, ModelError> {
        self.check_features(features.len())?;
        let raw = match self.config.lanes {
            LaneKind::Simd => predict_raw::<WideLanes>(&self.encoded, features),
            LaneKind::Scalar => predict_raw::<ScalarLanes>(&self.encoded, features),
        };
        Ok(self.transform(raw))
    }

    /// Score many examples into `out`.
    ///
    /// Every row is checked before anything is written. Results equal
    /// [`apply`](Self::apply) on each row, bit for bit.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != rows.len()`.
    pub fn apply_batch_into(&self, rows: &[&[f32]], out: &mut [f64]) -> Result<(), ModelError> {
        assert_eq!(
            out.len(),
            rows.len(),
            "output length must equal the number of rows"
        );
        for row in rows {
            self.check_features(row.len())?;
        }
        self.apply_batch_unchecked(rows, out);
        Ok(())
    }

    fn apply_batch_unchecked(&self, rows: &[&[f32]], out: &mut [f64]) {
        let width = self.config.batch_width;
        match self.config.lanes {
            LaneKind::Simd => predict_raw_batch::<WideLanes>(&self.encoded, rows, width, out),
            LaneKind::Scalar => predict_raw_batch::<ScalarLanes>(&self.encoded, rows, width, out),
        }
        for y in out.iter_mut() {
            *y = self.transform(*y);
        }
    }

    /// Score many examples, allocating the output.
    pub fn apply_many(&self, rows: &[&[f32]]) -> Result<Vec<f64>, ModelError> {
        let mut out = vec![0.0; rows.len()];
        self.apply_batch_into(rows, &mut out)?;
        Ok(out)
    }

    /// Score owned row vectors.
    pub fn apply_rows(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>, ModelError> {
        let rows: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        self.apply_many(&rows)
    }

    /// Score a sample-major feature matrix `[n_samples, n_features]`.
    ///
    /// Rows are split into chunks of `block_size` and spread over a rayon pool.
    ///
    /// # Arguments
    ///
    /// * `features` - Feature matrix with shape `[n_samples, n_features]`
    /// * `n_threads` - Thread count: 0 = auto, 1 = sequential, >1 = exact count
    pub fn predict(
        &self,
        features: ArrayView2<f32>,
        n_threads: usize,
    ) -> Result<Array1<f64>, ModelError> {
        let (n_rows, n_cols) = features.dim();
        self.check_features(n_cols)?;

        let mut output = Array1::<f64>::zeros(n_rows);
        if n_rows == 0 {
            return Ok(output);
        }

        let block_size = self.config.block_size;
        run_with_threads(n_threads, |parallelism| {
            let feature_chunks = features.axis_chunks_iter(Axis(0), block_size);
            let output_chunks = output.axis_chunks_iter_mut(Axis(0), block_size);
            parallelism.maybe_par_bridge_for_each(
                feature_chunks.zip(output_chunks),
                |(feat_chunk, mut out_chunk)| {
                    // Copies only when the chunk is not row-major contiguous
                    let feat_chunk = feat_chunk.as_standard_layout();
                    let data = feat_chunk.as_slice().unwrap_or_default();
                    let rows: Vec<&[f32]> = if n_cols == 0 {
                        vec![&[][..]; feat_chunk.nrows()]
                    } else {
                        data.chunks_exact(n_cols).collect()
                    };
                    let mut scores = vec![0.0; rows.len()];
                    self.apply_batch_unchecked(&rows, &mut scores);
                    out_chunk.assign(&ArrayView1::from(&scores));
                },
            );
        });

        Ok(output)
    }
}
