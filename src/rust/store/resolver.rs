use std::sync::Arc;

use log::{info, warn};

use super::ModelStore;
use crate::classifier::{model_locator, ModelHandle};
use crate::error::ServeError;

/// Stages searched first when resolving a model version.
pub const DEFAULT_STAGES: [&str; 2] = ["Production", "Staging"];

/// Stage name of versions that were never promoted.
pub const UNSTAGED: &str = "None";

/// Determines which model version to serve and loads it, once, at startup.
pub struct ModelResolver {
    store: Arc<dyn ModelStore>,
    stages: Vec<String>,
}

impl ModelResolver {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            stages: DEFAULT_STAGES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Overrides the stages searched before falling back to unstaged versions.
    ///
    /// An empty list searches every stage.
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Finds the version to serve: the latest in the configured stages, else the
    /// latest unstaged one.
    pub async fn latest_version(&self, model_name: &str) -> Result<String, ServeError> {
        if model_name.trim().is_empty() {
            return Err(ServeError::MissingConfig("model name is empty".into()));
        }

        if let Some(version) = self.store.latest_version(model_name, &self.stages).await? {
            return Ok(version);
        }

        let unstaged = vec![UNSTAGED.to_string()];
        warn!(
            "No version of '{}' in stages {:?}, falling back to stage {}",
            model_name, self.stages, UNSTAGED
        );
        if let Some(version) = self.store.latest_version(model_name, &unstaged).await? {
            return Ok(version);
        }

        let mut tried = self.stages.clone();
        tried.extend(unstaged);
        Err(ServeError::NoVersionAvailable {
            name: model_name.to_string(),
            stages: tried,
        })
    }

    /// Resolves and loads the model to serve for the process lifetime.
    pub async fn resolve(&self, model_name: &str) -> Result<ModelHandle, ServeError> {
        let version = self.latest_version(model_name).await?;
        info!("Fetching model from: {}", model_locator(model_name, &version));

        let artifact = self.store.load_artifact(model_name, &version).await?;
        let handle = ModelHandle::new(model_name, version, artifact);
        info!(
            "Model {} loaded ({} artifact, {} features)",
            handle.locator(),
            handle.kind(),
            handle.input_dim()
        );
        Ok(handle)
    }
}
