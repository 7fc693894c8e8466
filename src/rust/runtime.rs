use std::sync::OnceLock;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::error::ServeError;

static ENVIRONMENT: OnceLock<bool> = OnceLock::new();

/// ONNX Runtime session settings applied to every loaded ONNX model.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

/// Configures the process-wide ONNX Runtime environment once.
///
/// Returns whether this call installed the configuration; later calls are no-ops.
pub fn ensure_initialized() -> bool {
    *ENVIRONMENT.get_or_init(|| ort::init().with_name("verdict").commit())
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ServeError> {
    ensure_initialized();
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(config.optimization_level)?;

    Ok(builder)
}
