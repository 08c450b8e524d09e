//! Fuzz target for the JSON model loader.
//!
//! Arbitrary bytes are loaded as a model description. Loading must either
//! succeed or return an error, never panic; a loaded model must score a zero
//! row without panicking.
//!
//! Run with:
//! ```sh
//! cargo +nightly fuzz run fuzz_model_load
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

use oblivious_boost::Model;

fuzz_target!(|data: &[u8]| {
    let mut model = Model::new();
    if model.load_slice(data).is_ok() {
        let row = vec![0.0f32; model.feature_count()];
        let _ = model.apply(&row);
    }
});
