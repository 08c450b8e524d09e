//! Public error type of the model façade.

use crate::compat::catboost::ConversionError;
use crate::io::CodecError;
use crate::repr::oblivious::ForestValidationError;

/// Errors surfaced by loading and applying a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The description is not well-formed JSON or misses required fields.
    #[error("failed to parse model description: {0}")]
    Parse(#[source] serde_json::Error),

    /// The description parsed but violates a structural invariant.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("model is not loaded")]
    NotLoaded,

    #[error("not enough features: expected at least {expected}, got {got}")]
    InsufficientFeatures { expected: usize, got: usize },

    /// The description source could not be read.
    #[error("failed to read model description: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_io() {
            ModelError::Io(error.into())
        } else {
            ModelError::Parse(error)
        }
    }
}

impl From<ConversionError> for ModelError {
    fn from(error: ConversionError) -> Self {
        ModelError::InvalidModel(error.to_string())
    }
}

impl From<ForestValidationError> for ModelError {
    fn from(error: ForestValidationError) -> Self {
        ModelError::InvalidModel(error.to_string())
    }
}

impl From<CodecError> for ModelError {
    fn from(error: CodecError) -> Self {
        ModelError::InvalidModel(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_syntax_error_is_parse() {
        let error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ModelError::from(error), ModelError::Parse(_)));
    }

    #[test]
    fn json_io_error_is_io() {
        struct Broken;
        impl std::io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }
        let error = serde_json::from_reader::<_, serde_json::Value>(Broken).unwrap_err();
        assert!(matches!(ModelError::from(error), ModelError::Io(_)));
    }

    #[test]
    fn display() {
        let error = ModelError::InsufficientFeatures {
            expected: 3,
            got: 1,
        };
        assert_eq!(
            error.to_string(),
            "not enough features: expected at least 3, got 1"
        );
    }
}
