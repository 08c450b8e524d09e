//! CatBoost JSON model description.
//!
//! These are foreign types used only for parsing; [`CbModel::to_forest`]
//! converts them to the native [`ObliviousForest`](crate::repr::oblivious::ObliviousForest).
//! Only the keys needed for float-feature scoring are modelled; anything else
//! in the document is ignored.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{serde_as, OneOrMany};

// =============================================================================
// Custom deserializers for CatBoost-specific formats
// =============================================================================

#[serde_as]
#[derive(Deserialize)]
struct BiasRepr(#[serde_as(as = "OneOrMany<_>")] Vec<f64>);

/// `[scale, [bias, ...]]` or `[scale, bias]`.
///
/// Arrays of any other length are accepted and ignored, leaving the defaults.
fn deserialize_scale_and_bias<'de, D>(deserializer: D) -> Result<Option<ScaleAndBias>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(D::Error::custom("scale_and_bias must be an array")),
    };
    let Ok([scale, bias]) = <[Value; 2]>::try_from(items) else {
        return Ok(None);
    };

    let scale = scale
        .as_f64()
        .ok_or_else(|| D::Error::custom("scale must be a number"))?;
    let BiasRepr(bias) = BiasRepr::deserialize(bias).map_err(D::Error::custom)?;
    let bias = *bias
        .first()
        .ok_or_else(|| D::Error::custom("bias array is empty"))?;

    Ok(Some(ScaleAndBias { scale, bias }))
}

// =============================================================================
// Model structure
// =============================================================================

/// Affine post-transform `scale * raw + bias`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleAndBias {
    pub scale: f64,
    pub bias: f64,
}

/// Metadata of one float feature. Only the entry count matters for scoring.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FloatFeature {
    #[serde(default)]
    pub feature_index: Option<u32>,
    #[serde(default)]
    pub flat_feature_index: Option<u32>,
    #[serde(default)]
    pub borders: Vec<f32>,
    #[serde(default)]
    pub has_nans: bool,
    #[serde(default)]
    pub nan_value_treatment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeaturesInfo {
    pub float_features: Vec<FloatFeature>,
}

/// One split of an oblivious tree level.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CbSplit {
    pub border: f32,
    #[serde(default)]
    pub float_feature_index: Option<u32>,
    #[serde(default)]
    pub split_index: Option<u32>,
    #[serde(default)]
    pub split_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CbTree {
    pub splits: Vec<CbSplit>,
    pub leaf_values: Vec<f64>,
}

/// Root of a CatBoost JSON model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CbModel {
    pub features_info: FeaturesInfo,
    pub oblivious_trees: Vec<CbTree>,
    #[serde(default, deserialize_with = "deserialize_scale_and_bias")]
    pub scale_and_bias: Option<ScaleAndBias>,
}

impl CbModel {
    /// Number of float features declared by the model.
    pub fn n_features(&self) -> usize {
        self.features_info.float_features.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> serde_json::Result<CbModel> {
        serde_json::from_str(json)
    }

    #[test]
    fn parses_minimal_model() {
        let model = parse(
            r#"{
                "features_info": {"float_features": [{}, {"borders": [0.5], "has_nans": true}]},
                "oblivious_trees": [
                    {"splits": [{"border": 0.5, "float_feature_index": 1}], "leaf_values": [0.0, 1.0]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(model.n_features(), 2);
        assert!(model.features_info.float_features[1].has_nans);
        assert_eq!(model.oblivious_trees.len(), 1);
        assert_eq!(model.oblivious_trees[0].splits[0].float_feature_index, Some(1));
        assert_eq!(model.scale_and_bias, None);
    }

    #[test]
    fn ignores_unknown_keys() {
        let model = parse(
            r#"{
                "model_info": {"params": "{}"},
                "features_info": {"float_features": [{"feature_index": 0, "flat_feature_index": 0, "nan_value_treatment": "AsIs"}]},
                "oblivious_trees": [
                    {"splits": [], "leaf_values": [2.5], "leaf_weights": [1.0]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(model.oblivious_trees[0].leaf_values, vec![2.5]);
    }

    #[test]
    fn scale_and_bias_forms() {
        let base = r#""features_info": {"float_features": []}, "oblivious_trees": []"#;

        let nested = parse(&format!(r#"{{{base}, "scale_and_bias": [2.0, [1.0]]}}"#)).unwrap();
        assert_eq!(
            nested.scale_and_bias,
            Some(ScaleAndBias {
                scale: 2.0,
                bias: 1.0
            })
        );

        let bare = parse(&format!(r#"{{{base}, "scale_and_bias": [0.5, -3.0]}}"#)).unwrap();
        assert_eq!(
            bare.scale_and_bias,
            Some(ScaleAndBias {
                scale: 0.5,
                bias: -3.0
            })
        );

        let odd = parse(&format!(r#"{{{base}, "scale_and_bias": [2.0]}}"#)).unwrap();
        assert_eq!(odd.scale_and_bias, None);

        let null = parse(&format!(r#"{{{base}, "scale_and_bias": null}}"#)).unwrap();
        assert_eq!(null.scale_and_bias, None);
    }

    #[test]
    fn rejects_malformed_scale_and_bias() {
        let base = r#""features_info": {"float_features": []}, "oblivious_trees": []"#;
        assert!(parse(&format!(r#"{{{base}, "scale_and_bias": 1.0}}"#)).is_err());
        assert!(parse(&format!(r#"{{{base}, "scale_and_bias": ["x", [1.0]]}}"#)).is_err());
        assert!(parse(&format!(r#"{{{base}, "scale_and_bias": [1.0, []]}}"#)).is_err());
    }

    #[test]
    fn rejects_missing_required_keys() {
        assert!(parse(r#"{"oblivious_trees": []}"#).is_err());
        assert!(parse(r#"{"features_info": {"float_features": []}}"#).is_err());
        assert!(parse(
            r#"{"features_info": {"float_features": []}, "oblivious_trees": [{"splits": []}]}"#
        )
        .is_err());
    }
}
