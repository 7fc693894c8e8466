use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Deserialize;

use super::model::Model;
use super::utils::argmax;
use crate::error::{InferenceError, ServeError};
use crate::vectorizer::FeatureVector;

#[derive(Debug, Deserialize)]
struct LinearArtifact {
    classes: Vec<String>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
}

/// A linear classifier stored as `model.json`.
///
/// Either one weight row per class (argmax decision) or, for two classes,
/// a single row whose positive decision selects the second class.
#[derive(Debug, Clone)]
pub struct LinearModel {
    classes: Vec<String>,
    coef: Array2<f32>,
    intercept: Array1<f32>,
}

impl LinearModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServeError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ServeError> {
        let artifact: LinearArtifact = serde_json::from_str(raw)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: LinearArtifact) -> Result<Self, ServeError> {
        let rows = artifact.coef.len();
        let width = artifact.coef.first().map_or(0, Vec::len);
        if rows == 0 || width == 0 {
            return Err(ServeError::InvalidArtifact("linear model has no weights".into()));
        }
        if artifact.coef.iter().any(|row| row.len() != width) {
            return Err(ServeError::InvalidArtifact("linear model rows differ in length".into()));
        }
        if artifact.intercept.len() != rows {
            return Err(ServeError::InvalidArtifact(format!(
                "linear model has {} intercepts for {} weight rows",
                artifact.intercept.len(),
                rows
            )));
        }
        let binary = rows == 1 && artifact.classes.len() == 2;
        if !binary && artifact.classes.len() != rows {
            return Err(ServeError::InvalidArtifact(format!(
                "linear model has {} classes for {} weight rows",
                artifact.classes.len(),
                rows
            )));
        }

        let coef = Array2::from_shape_vec((rows, width), artifact.coef.into_iter().flatten().collect())
            .map_err(|e| ServeError::InvalidArtifact(e.to_string()))?;
        Ok(Self {
            classes: artifact.classes,
            coef,
            intercept: Array1::from(artifact.intercept),
        })
    }
}

impl Model for LinearModel {
    fn input_dim(&self) -> usize {
        self.coef.ncols()
    }

    fn predict_row(&self, features: &FeatureVector) -> Result<String, InferenceError> {
        let scores = self.coef.dot(features.values()) + &self.intercept;
        let idx = if self.coef.nrows() == 1 {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(scores.view())
                .ok_or_else(|| InferenceError::Artifact("linear model produced no scores".into()))?
        };
        self.classes
            .get(idx)
            .cloned()
            .ok_or_else(|| InferenceError::Artifact(format!("class index {} out of range", idx)))
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_decision() {
        let model = LinearModel::from_json_str(
            r#"{"classes": ["0", "1"], "coef": [[1.0, -1.0]], "intercept": [-0.5]}"#,
        )
        .unwrap();
        assert_eq!(model.input_dim(), 2);
        assert_eq!(model.predict_row(&vec![1.0, 0.0].into()).unwrap(), "1");
        assert_eq!(model.predict_row(&vec![0.0, 1.0].into()).unwrap(), "0");
        // Decision exactly at zero falls to the first class.
        assert_eq!(model.predict_row(&vec![0.5, 0.0].into()).unwrap(), "0");
    }

    #[test]
    fn test_multiclass_argmax() {
        let model = LinearModel::from_json_str(
            r#"{
                "classes": ["sports", "tech", "business"],
                "coef": [[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]],
                "intercept": [0.0, 0.0, 0.1]
            }"#,
        )
        .unwrap();
        assert_eq!(model.predict_row(&vec![2.0, 0.0].into()).unwrap(), "sports");
        assert_eq!(model.predict_row(&vec![0.0, 2.0].into()).unwrap(), "tech");
        assert_eq!(model.predict_row(&vec![0.0, 0.0].into()).unwrap(), "business");
    }

    #[test]
    fn test_rejects_malformed_weights() {
        let cases = [
            r#"{"classes": ["a"], "coef": [], "intercept": []}"#,
            r#"{"classes": ["a", "b"], "coef": [[1.0], [1.0, 2.0]], "intercept": [0.0, 0.0]}"#,
            r#"{"classes": ["a", "b"], "coef": [[1.0]], "intercept": [0.0, 1.0]}"#,
            r#"{"classes": ["a", "b", "c"], "coef": [[1.0]], "intercept": [0.0]}"#,
        ];
        for case in cases {
            assert!(
                matches!(LinearModel::from_json_str(case), Err(ServeError::InvalidArtifact(_))),
                "accepted {}",
                case
            );
        }
    }
}
