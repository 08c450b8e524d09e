//! CatBoost JSON model loading.
//!
//! Parse with `serde_json` into [`CbModel`], then call [`CbModel::to_forest`]:
//!
//! ```
//! use oblivious_boost::compat::catboost::CbModel;
//!
//! let json = r#"{
//!     "features_info": {"float_features": [{}]},
//!     "oblivious_trees": [
//!         {"splits": [{"border": 0.5, "float_feature_index": 0}], "leaf_values": [0.0, 1.0]}
//!     ]
//! }"#;
//! let model: CbModel = serde_json::from_str(json).unwrap();
//! let forest = model.to_forest().unwrap();
//! assert_eq!(forest.predict_row(&[0.6]), 1.0);
//! ```

mod convert;
mod json;

pub use convert::ConversionError;
pub use json::{CbModel, CbSplit, CbTree, FeaturesInfo, FloatFeature, ScaleAndBias};
