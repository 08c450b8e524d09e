//! Fuzz target for block stream validation.
//!
//! Arbitrary bytes are offered as a compiled block stream. Validation must
//! reject anything the evaluator could not walk safely; an accepted stream
//! must score a NaN row without panicking.
//!
//! Run with:
//! ```sh
//! cargo +nightly fuzz run fuzz_block_stream
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

use oblivious_boost::inference::{predict_raw, EncodedForest, WideLanes};

fuzz_target!(|data: &[u8]| {
    let [n_features, n_leaves, blocks @ ..] = data else {
        return;
    };
    let n_features = usize::from(n_features % 16);
    let leaves = vec![1.0; usize::from(*n_leaves) * 16];
    if let Ok(forest) = EncodedForest::from_parts(blocks.into(), leaves.into(), n_features) {
        let row = vec![f32::NAN; n_features];
        let _ = predict_raw::<WideLanes>(&forest, &row);
    }
});
