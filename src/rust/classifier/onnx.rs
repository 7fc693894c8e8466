use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::info;
use ort::session::Session;
use ort::value::{Tensor, TensorElementType, ValueType};

use super::model::Model;
use crate::error::{InferenceError, ServeError};
use crate::runtime::{create_session_builder, RuntimeConfig};
use crate::vectorizer::FeatureVector;

const LABEL_OUTPUT: &str = "output_label";

#[derive(Debug, Clone, Copy)]
enum LabelKind {
    Int64,
    Text,
}

/// A classifier exported to ONNX and run through ONNX Runtime.
///
/// The model is expected to:
/// - take a float tensor of shape `[batch, n_features]` as its first input,
///   with `n_features` fixed
/// - emit labels either on an output named `output_label` or on output 0,
///   as an int64 or string tensor with one entry per row
///
/// Running a session needs exclusive access, so concurrent predictions on one
/// model take turns.
#[derive(Debug)]
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
    input_dim: usize,
    label_index: usize,
    label_kind: LabelKind,
}

impl OnnxModel {
    pub fn load<P: AsRef<Path>>(path: P, config: &RuntimeConfig) -> Result<Self, ServeError> {
        let path = path.as_ref();
        info!("Loading ONNX model from {:?}", path);
        let session = create_session_builder(config)?.commit_from_file(path)?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| ServeError::InvalidArtifact("ONNX model has no inputs".into()))?;
        let input_dim = match input.dtype() {
            ValueType::Tensor {
                ty: TensorElementType::Float32,
                shape,
                ..
            } => match shape.last() {
                Some(&d) if d > 0 => d as usize,
                _ => {
                    return Err(ServeError::InvalidArtifact(format!(
                        "ONNX input '{}' has no fixed feature dimension: {:?}",
                        input.name(),
                        shape
                    )))
                }
            },
            other => {
                return Err(ServeError::InvalidArtifact(format!(
                    "ONNX input '{}' must be a float tensor, found {:?}",
                    input.name(),
                    other
                )))
            }
        };
        let input_name = input.name().to_string();

        let label_index = session
            .outputs()
            .iter()
            .position(|o| o.name() == LABEL_OUTPUT)
            .unwrap_or(0);
        let label_output = session
            .outputs()
            .get(label_index)
            .ok_or_else(|| ServeError::InvalidArtifact("ONNX model has no outputs".into()))?;
        let label_kind = match label_output.dtype() {
            ValueType::Tensor {
                ty: TensorElementType::Int64,
                ..
            } => LabelKind::Int64,
            ValueType::Tensor {
                ty: TensorElementType::String,
                ..
            } => LabelKind::Text,
            other => {
                return Err(ServeError::InvalidArtifact(format!(
                    "ONNX label output '{}' must be an int64 or string tensor, found {:?}",
                    label_output.name(),
                    other
                )))
            }
        };

        info!(
            "ONNX model ready: input '{}' with {} features, labels from '{}'",
            input_name,
            input_dim,
            label_output.name()
        );
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_dim,
            label_index,
            label_kind,
        })
    }
}

impl Model for OnnxModel {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict_row(&self, features: &FeatureVector) -> Result<String, InferenceError> {
        let input = Tensor::from_array(([1usize, features.len()], features.values().to_vec()))
            .map_err(|e| InferenceError::Artifact(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(vec![(self.input_name.as_str(), input)])
            .map_err(|e| InferenceError::Artifact(format!("Failed to run model: {}", e)))?;
        let output = &outputs[self.label_index];

        let label = match self.label_kind {
            LabelKind::Int64 => output
                .try_extract_tensor::<i64>()
                .map_err(|e| InferenceError::Artifact(format!("Failed to extract labels: {}", e)))?
                .1
                .first()
                .map(|label| label.to_string()),
            LabelKind::Text => output
                .try_extract_strings()
                .map_err(|e| InferenceError::Artifact(format!("Failed to extract labels: {}", e)))?
                .1
                .into_iter()
                .next(),
        };
        label.ok_or_else(|| InferenceError::Artifact("model returned no label".into()))
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
