mod linear;
mod model;
mod onnx;
pub(crate) mod utils;

use std::path::Path;
use std::sync::Arc;

pub use linear::LinearModel;
pub use model::{model_locator, Model, ModelHandle, PredictionResult};
pub use onnx::OnnxModel;

use crate::error::ServeError;
use crate::runtime::RuntimeConfig;

/// File name of an ONNX model artifact inside a version directory.
pub const ONNX_ARTIFACT: &str = "model.onnx";
/// File name of a linear model artifact inside a version directory.
pub const LINEAR_ARTIFACT: &str = "model.json";

/// Artifact file names in lookup order.
pub const ARTIFACT_FILES: [&str; 2] = [ONNX_ARTIFACT, LINEAR_ARTIFACT];

/// Loads whichever model artifact a version directory holds.
pub fn load_model_dir(dir: &Path, runtime: &RuntimeConfig) -> Result<Arc<dyn Model>, ServeError> {
    let onnx = dir.join(ONNX_ARTIFACT);
    if onnx.is_file() {
        return Ok(Arc::new(OnnxModel::load(&onnx, runtime)?));
    }
    let linear = dir.join(LINEAR_ARTIFACT);
    if linear.is_file() {
        return Ok(Arc::new(LinearModel::load(&linear)?));
    }
    Err(ServeError::ArtifactMissing(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_linear_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(LINEAR_ARTIFACT),
            r#"{"classes": ["a", "b"], "coef": [[1.0, 2.0, 3.0]], "intercept": [0.0]}"#,
        )
        .unwrap();
        let model = load_model_dir(dir.path(), &RuntimeConfig::default()).unwrap();
        assert_eq!(model.kind(), "linear");
        assert_eq!(model.input_dim(), 3);
    }

    #[test]
    fn test_empty_dir_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model_dir(dir.path(), &RuntimeConfig::default()).unwrap_err();
        assert!(matches!(err, ServeError::ArtifactMissing(_)));
    }
}
