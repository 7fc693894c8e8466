use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use crate::classifier::{ModelHandle, PredictionResult};
use crate::error::PipelineError;
use crate::metrics::MetricsRegistry;
use crate::normalizer::Normalizer;
use crate::vectorizer::FeatureEncoder;

/// HTTP method label recorded for predict requests.
pub const PREDICT_METHOD: &str = "POST";
/// Endpoint label recorded for predict requests.
pub const PREDICT_ENDPOINT: &str = "/predict";

/// Records one request-count sample on creation and exactly one latency
/// observation when dropped, whichever way the request ends.
pub struct RequestTimer<'a> {
    metrics: &'a MetricsRegistry,
    endpoint: &'a str,
    started: Instant,
}

impl<'a> RequestTimer<'a> {
    pub fn start(metrics: &'a MetricsRegistry, method: &str, endpoint: &'a str) -> Self {
        metrics.increment_request_count(method, endpoint);
        Self {
            metrics,
            endpoint,
            started: Instant::now(),
        }
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics
            .observe_latency(self.endpoint, self.started.elapsed().as_secs_f64());
    }
}

/// The per-request normalize → encode → infer → instrument sequence.
///
/// All fields are immutable after construction; the pipeline is shared by
/// concurrent requests through an `Arc` without further locking.
#[derive(Debug)]
pub struct Pipeline {
    pub(super) normalizer: Arc<dyn Normalizer>,
    pub(super) encoder: Arc<dyn FeatureEncoder>,
    pub(super) model: ModelHandle,
    pub(super) metrics: Arc<MetricsRegistry>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Pipeline>();
    }
};

impl Pipeline {
    /// Creates a new PipelineBuilder for fluent construction
    pub fn builder() -> super::builder::PipelineBuilder {
        super::builder::PipelineBuilder::new()
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Width of the feature vectors fed to the model.
    pub fn dimension(&self) -> usize {
        self.encoder.dimension()
    }

    /// Classifies one raw text and records its telemetry.
    ///
    /// Every call adds one request-count sample and one latency observation
    /// for [`PREDICT_ENDPOINT`]; only successful calls add a prediction-count
    /// sample.
    pub fn handle_predict_request(&self, raw_text: &str) -> Result<PredictionResult, PipelineError> {
        let _timer = RequestTimer::start(&self.metrics, PREDICT_METHOD, PREDICT_ENDPOINT);

        let result = self.run(raw_text);
        match &result {
            Ok(prediction) => {
                debug!("Prediction: {}", prediction.label);
                self.metrics.increment_prediction_count(&prediction.label);
            }
            Err(e) => warn!("Predict request failed at {} stage: {}", e.stage(), e),
        }
        result
    }

    fn run(&self, raw_text: &str) -> Result<PredictionResult, PipelineError> {
        let normalized = self.normalizer.normalize(raw_text)?;
        debug!("Normalized text: {}", normalized);

        let features = self.encoder.encode(&normalized)?;
        Ok(self.model.predict(&features)?)
    }
}
