//! Test case loading and forest generation for integration tests.
//!
//! For assertion helpers, use `oblivious_boost::testing`.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use oblivious_boost::repr::oblivious::{ObliviousForest, ObliviousTree, Split};

// Re-export testing utilities for convenience
#[allow(unused_imports)]
pub use oblivious_boost::assert_approx_eq;
#[allow(unused_imports)]
pub use oblivious_boost::testing::{assert_scores_eq, DEFAULT_TOLERANCE};

// =============================================================================
// Test Case Loading
// =============================================================================

/// Base directory for test cases.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases")
}

/// Directory for CatBoost JSON test cases.
pub fn catboost_test_cases_dir() -> PathBuf {
    test_cases_dir().join("catboost")
}

/// Load a JSON file and deserialize it.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> T {
    let file =
        File::open(path).unwrap_or_else(|e| panic!("Failed to open {}: {e}", path.display()));
    serde_json::from_reader(file)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

// =============================================================================
// Common Test Data Structures
// =============================================================================

/// Input features for a test case.
#[derive(Debug, Deserialize)]
pub struct TestInput {
    /// Features matrix, where None represents NaN (missing value)
    pub features: Vec<Vec<Option<f64>>>,
    pub num_rows: usize,
    pub num_features: usize,
}

impl TestInput {
    /// Convert input features to f32, mapping None to NaN.
    pub fn to_f32_rows(&self) -> Vec<Vec<f32>> {
        self.features
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&x| x.map(|v| v as f32).unwrap_or(f32::NAN))
                    .collect()
            })
            .collect()
    }

    /// Convert to a flat row-major f32 buffer.
    pub fn to_flat_f32(&self) -> Vec<f32> {
        self.to_f32_rows().into_iter().flatten().collect()
    }
}

/// Expected scores for a test case.
#[derive(Debug, Deserialize)]
pub struct TestExpected {
    /// Post-transformed scores, one per row.
    pub predictions: Vec<f64>,
    /// Raw sums of leaf values, before scale and bias.
    #[serde(default)]
    pub raw_predictions: Option<Vec<f64>>,
}

/// A complete test case: model path, input and expected output.
pub struct TestCase {
    pub name: String,
    pub model_path: PathBuf,
    pub input: TestInput,
    pub expected: TestExpected,
}

/// Load `{name}.model.json`, `{name}.input.json` and `{name}.expected.json`.
pub fn load_catboost_case(name: &str) -> TestCase {
    let dir = catboost_test_cases_dir();
    TestCase {
        name: name.to_string(),
        model_path: dir.join(format!("{name}.model.json")),
        input: load_json(&dir.join(format!("{name}.input.json"))),
        expected: load_json(&dir.join(format!("{name}.expected.json"))),
    }
}

// =============================================================================
// Random Forests
// =============================================================================

/// Random tree of `depth` splits over `n_features` features.
///
/// Thresholds are drawn from a small grid so that ties with grid-valued
/// features actually occur.
pub fn random_tree(rng: &mut impl Rng, depth: usize, n_features: usize) -> ObliviousTree {
    let splits: Vec<Split> = (0..depth)
        .map(|_| {
            let feature = rng.gen_range(0..n_features) as u32;
            let threshold = rng.gen_range(-4i32..=4) as f32 * 0.25;
            Split::new(feature, threshold)
        })
        .collect();
    let leaves: Vec<f64> = (0..1usize << depth)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();
    ObliviousTree::new(splits, leaves).expect("valid random tree")
}

/// Random forest mixing depths in `0..=max_depth`.
pub fn random_forest(seed: u64, n_trees: usize, max_depth: usize, n_features: usize) -> ObliviousForest {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut forest = ObliviousForest::new(n_features);
    for _ in 0..n_trees {
        let depth = rng.gen_range(0..=max_depth);
        forest
            .push_tree(random_tree(&mut rng, depth, n_features))
            .expect("features in range");
    }
    forest
}

/// Random rows on the threshold grid, with occasional NaN.
pub fn random_rows(seed: u64, n_rows: usize, n_features: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_rows)
        .map(|_| {
            (0..n_features)
                .map(|_| {
                    if rng.gen_bool(0.05) {
                        f32::NAN
                    } else {
                        rng.gen_range(-5i32..=5) as f32 * 0.25
                    }
                })
                .collect()
        })
        .collect()
}
