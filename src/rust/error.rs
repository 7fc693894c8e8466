use std::io;
use std::path::PathBuf;

use ort::Error as OrtError;

/// Failures that prevent the server from starting.
///
/// None of these are recoverable at request time: if one surfaces during
/// [`bootstrap`](crate::bootstrap) the process must not start serving.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("Model '{0}' is not registered in the model store")]
    ModelNotRegistered(String),
    #[error("Model '{name}' has no version in stages {stages:?}")]
    NoVersionAvailable { name: String, stages: Vec<String> },
    #[error("No loadable artifact found for model version at {0:?}")]
    ArtifactMissing(PathBuf),
    #[error("Unsupported artifact location: {0}")]
    UnsupportedArtifact(String),
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
    #[error("Model store unreachable: {0}")]
    StoreUnreachable(reqwest::Error),
    #[error("Model store error: {0}")]
    Store(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Artifact decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("ONNX Runtime error: {0}")]
    Runtime(String),
    #[error("Vectorizer produces {vectorizer} features but the model expects {model}")]
    ShapeMismatch { vectorizer: usize, model: usize },
}

impl<R> From<OrtError<R>> for ServeError {
    fn from(err: OrtError<R>) -> Self {
        ServeError::Runtime(err.to_string())
    }
}

/// Error statuses and undecodable bodies mean the registry answered; only
/// failures to get an answer at all count as unreachable.
impl From<reqwest::Error> for ServeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_status() || err.is_decode() {
            ServeError::Store(err.to_string())
        } else {
            ServeError::StoreUnreachable(err)
        }
    }
}

/// Failures raised while running inference on a single feature row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("feature vector has {actual} dimensions, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("{0}")]
    Artifact(String),
}

/// Request-level failures of the predict pipeline.
///
/// The variant names the stage that failed so the boundary can pick a
/// status code and the logs can tell bad input from a broken artifact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Normalization error: {0}")]
    Normalization(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Normalization(_) => "normalize",
            Self::Encoding(_) => "encode",
            Self::Inference(_) => "infer",
        }
    }

    /// True for failures caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Normalization(_))
    }
}
