#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use verdict::{LinearModel, ModelHandle, Pipeline, VectorizerHandle};

pub const VECTORIZER_JSON: &str = r#"{
    "vocabulary": {
        "love": 0, "great": 1, "awesome": 2,
        "hate": 3, "awful": 4, "terrible": 5,
        "this": 6, "movie": 7
    },
    "idf": [1.5, 1.5, 1.5, 1.5, 1.5, 1.5, 1.0, 1.0],
    "norm": "l2"
}"#;

/// Positive words push right, negative words push left; the empty row falls
/// to the majority class through the intercept.
pub const MODEL_JSON: &str = r#"{
    "classes": ["negative", "positive"],
    "coef": [[2.0, 2.0, 2.0, -2.0, -2.0, -2.0, 0.0, 0.0]],
    "intercept": [0.1]
}"#;

pub fn sentiment_pipeline() -> Pipeline {
    let vectorizer = VectorizerHandle::from_json_str(VECTORIZER_JSON).expect("vectorizer");
    let model = LinearModel::from_json_str(MODEL_JSON).expect("model");
    Pipeline::builder()
        .with_model(ModelHandle::new("sentiment", "1", Arc::new(model)))
        .with_vectorizer(vectorizer)
        .build()
        .expect("pipeline")
}

/// Writes `<root>/<name>/<version>/model.json` with an optional stage.
pub fn write_model_version(root: &Path, name: &str, version: &str, stage: Option<&str>, model: &str) {
    let dir = root.join(name).join(version);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("model.json"), model).unwrap();
    if let Some(stage) = stage {
        fs::write(dir.join("version.json"), format!(r#"{{"stage": "{}"}}"#, stage)).unwrap();
    }
}
