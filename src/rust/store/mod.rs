//! Model registry access and startup-time model resolution.

mod local;
mod remote;
mod resolver;

use std::sync::Arc;

use async_trait::async_trait;

pub use local::LocalModelStore;
pub use remote::RemoteModelStore;
pub use resolver::{ModelResolver, DEFAULT_STAGES, UNSTAGED};

use crate::classifier::Model;
use crate::error::ServeError;

/// A versioned registry of model artifacts.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Highest version of `name` whose stage is one of `stages`.
    ///
    /// An empty `stages` slice matches every stage. Returns
    /// [`ServeError::ModelNotRegistered`] when the store has no model called
    /// `name` at all, and `Ok(None)` when it has one but no matching version.
    async fn latest_version(&self, name: &str, stages: &[String]) -> Result<Option<String>, ServeError>;

    /// Loads the artifact of one concrete version.
    async fn load_artifact(&self, name: &str, version: &str) -> Result<Arc<dyn Model>, ServeError>;
}

/// Picks the numerically highest version; non-numeric versions are ignored.
pub(crate) fn highest_version<I, S>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    versions
        .into_iter()
        .filter_map(|v| v.as_ref().parse::<u64>().ok())
        .max()
        .map(|v| v.to_string())
}

pub(crate) fn stage_matches(stage: &str, stages: &[String]) -> bool {
    stages.is_empty() || stages.iter().any(|s| s.eq_ignore_ascii_case(stage))
}
