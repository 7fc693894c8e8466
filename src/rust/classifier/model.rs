use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::InferenceError;
use crate::vectorizer::FeatureVector;

/// A loaded inference artifact.
///
/// Implementations must be deterministic and safe for concurrent reads:
/// the handle is shared by every in-flight request without locking.
pub trait Model: Send + Sync + fmt::Debug {
    /// Number of features each input row must have.
    fn input_dim(&self) -> usize;

    /// Predicts the label of a single row. Callers validate the row width first.
    fn predict_row(&self, features: &FeatureVector) -> Result<String, InferenceError>;

    /// Short name of the artifact kind, used in logs.
    fn kind(&self) -> &'static str;
}

/// Output of one prediction, tied to the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionResult {
    pub label: String,
    pub model_version: String,
}

/// An immutable model artifact bound to one resolved registry version.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    name: String,
    version: String,
    locator: String,
    loaded_at: DateTime<Utc>,
    artifact: Arc<dyn Model>,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>, version: impl Into<String>, artifact: Arc<dyn Model>) -> Self {
        let name = name.into();
        let version = version.into();
        Self {
            locator: model_locator(&name, &version),
            name,
            version,
            loaded_at: Utc::now(),
            artifact,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Canonical `models:/{name}/{version}` locator of the artifact.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn input_dim(&self) -> usize {
        self.artifact.input_dim()
    }

    pub fn kind(&self) -> &'static str {
        self.artifact.kind()
    }

    /// Runs inference on one feature row.
    ///
    /// A row whose width differs from [`input_dim`](Self::input_dim) is
    /// rejected before the artifact ever sees it.
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        let expected = self.input_dim();
        if features.len() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }
        let label = self.artifact.predict_row(features)?;
        Ok(PredictionResult {
            label,
            model_version: self.version.clone(),
        })
    }
}

pub fn model_locator(name: &str, version: &str) -> String {
    format!("models:/{}/{}", name, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::LinearModel;

    fn handle() -> ModelHandle {
        let model = LinearModel::from_json_str(
            r#"{"classes": ["neg", "pos"], "coef": [[-1.0, 1.0]], "intercept": [0.0]}"#,
        )
        .unwrap();
        ModelHandle::new("sentiment", "3", Arc::new(model))
    }

    #[test]
    fn test_locator_is_canonical() {
        let handle = handle();
        assert_eq!(handle.locator(), "models:/sentiment/3");
        assert_eq!(handle.version(), "3");
        assert!(handle.loaded_at() <= Utc::now());
    }

    #[test]
    fn test_wrong_width_is_an_inference_error() {
        let handle = handle();
        for width in [0, 1, 3, 100] {
            let err = handle.predict(&FeatureVector::zeros(width)).unwrap_err();
            assert_eq!(err, InferenceError::ShapeMismatch { expected: 2, actual: width });
        }
    }

    #[test]
    fn test_prediction_carries_version() {
        let result = handle().predict(&FeatureVector::from(vec![0.0, 2.0])).unwrap();
        assert_eq!(result.label, "pos");
        assert_eq!(result.model_version, "3");
    }
}
