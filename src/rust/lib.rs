//! A text-classification inference server with Prometheus telemetry.
//!
//! At startup a [`ModelResolver`] picks the model version to serve from a
//! [`ModelStore`], the vectorizer artifact is loaded, and both are frozen into
//! a [`Pipeline`]. Each request then runs normalize → encode → infer, and
//! records request, latency and prediction metrics in a shared
//! [`MetricsRegistry`].
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use verdict::{LinearModel, ModelHandle, Pipeline, VectorizerHandle};
//!
//! let vectorizer = VectorizerHandle::from_json_str(
//!     r#"{"vocabulary": {"love": 0, "hate": 1}}"#,
//! )?;
//! let model = LinearModel::from_json_str(
//!     r#"{"classes": ["negative", "positive"], "coef": [[1.0, -1.0]], "intercept": [0.0]}"#,
//! )?;
//!
//! let pipeline = Pipeline::builder()
//!     .with_model(ModelHandle::new("sentiment", "1", Arc::new(model)))
//!     .with_vectorizer(vectorizer)
//!     .build()?;
//!
//! let result = pipeline.handle_predict_request("I LOVE this!!")?;
//! assert_eq!(result.label, "positive");
//! assert_eq!(pipeline.metrics().prediction_count("positive"), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! [`Pipeline`] is `Send + Sync`. The model and vectorizer are never mutated
//! after startup and the metrics registry synchronizes internally, so one
//! `Arc<Pipeline>` serves every concurrent request.

pub mod classifier;
pub mod config;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
mod runtime;
pub mod server;
pub mod store;
pub mod vectorizer;

pub use classifier::{LinearModel, Model, ModelHandle, OnnxModel, PredictionResult};
pub use config::{ServerConfig, StoreConfig};
pub use error::{InferenceError, PipelineError, ServeError};
pub use metrics::MetricsRegistry;
pub use normalizer::{NormalizedText, Normalizer, TextNormalizer};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use runtime::RuntimeConfig;
pub use server::{bootstrap, router, serve};
pub use store::{LocalModelStore, ModelResolver, ModelStore, RemoteModelStore};
pub use vectorizer::{FeatureEncoder, FeatureVector, VectorizerHandle};

pub fn init_logger() {
    env_logger::init();
}
