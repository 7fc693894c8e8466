mod builder;
mod orchestrator;

pub use builder::PipelineBuilder;
pub use orchestrator::{Pipeline, RequestTimer, PREDICT_ENDPOINT, PREDICT_METHOD};
