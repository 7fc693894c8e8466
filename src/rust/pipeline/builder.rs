use std::sync::Arc;

use log::info;

use super::orchestrator::Pipeline;
use crate::classifier::ModelHandle;
use crate::error::ServeError;
use crate::metrics::MetricsRegistry;
use crate::normalizer::{Normalizer, TextNormalizer};
use crate::vectorizer::{FeatureEncoder, VectorizerHandle};

/// A builder for constructing a [`Pipeline`] with a fluent interface.
///
/// `build` is the last startup check: it refuses to produce a pipeline whose
/// encoder and model disagree on the feature dimensionality.
#[derive(Default, Debug)]
pub struct PipelineBuilder {
    model: Option<ModelHandle>,
    encoder: Option<Arc<dyn FeatureEncoder>>,
    normalizer: Option<Arc<dyn Normalizer>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: ModelHandle) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_vectorizer(self, vectorizer: VectorizerHandle) -> Self {
        self.with_encoder(Arc::new(vectorizer))
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn FeatureEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Replaces the default [`TextNormalizer`].
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Shares an existing registry instead of creating a fresh one.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Pipeline, ServeError> {
        let model = self
            .model
            .ok_or_else(|| ServeError::MissingConfig("pipeline has no model".into()))?;
        let encoder = self
            .encoder
            .ok_or_else(|| ServeError::MissingConfig("pipeline has no vectorizer".into()))?;

        if encoder.dimension() != model.input_dim() {
            return Err(ServeError::ShapeMismatch {
                vectorizer: encoder.dimension(),
                model: model.input_dim(),
            });
        }
        info!(
            "Pipeline ready: {} serving {} features",
            model.locator(),
            encoder.dimension()
        );

        Ok(Pipeline {
            normalizer: self
                .normalizer
                .unwrap_or_else(|| Arc::new(TextNormalizer::default())),
            encoder,
            model,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}
