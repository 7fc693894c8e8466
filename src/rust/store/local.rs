use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{highest_version, stage_matches, ModelStore};
use crate::classifier::{load_model_dir, Model};
use crate::error::ServeError;
use crate::runtime::RuntimeConfig;
use crate::store::UNSTAGED;

const VERSION_METADATA: &str = "version.json";

#[derive(Debug, Deserialize)]
struct VersionMetadata {
    #[serde(default)]
    stage: Option<String>,
}

/// A model registry laid out on the local filesystem.
///
/// ```text
/// <root>/<model name>/<version>/model.onnx | model.json
///                               version.json   {"stage": "Production"}
/// ```
///
/// A version without `version.json` is unstaged.
#[derive(Debug, Clone)]
pub struct LocalModelStore {
    root: PathBuf,
    runtime: RuntimeConfig,
}

impl LocalModelStore {
    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("VERDICT_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("verdict").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("verdict").join("models");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("verdict").join("models")
    }

    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            runtime: RuntimeConfig::default(),
        })
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    fn stage_of(&self, version_dir: &Path) -> Result<String, ServeError> {
        let path = version_dir.join(VERSION_METADATA);
        if !path.is_file() {
            return Ok(UNSTAGED.to_string());
        }
        let metadata: VersionMetadata = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(metadata.stage.unwrap_or_else(|| UNSTAGED.to_string()))
    }
}

#[async_trait]
impl ModelStore for LocalModelStore {
    async fn latest_version(&self, name: &str, stages: &[String]) -> Result<Option<String>, ServeError> {
        let model_dir = self.root.join(name);
        if !model_dir.is_dir() {
            return Err(ServeError::ModelNotRegistered(name.to_string()));
        }

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&model_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let version = entry.file_name().to_string_lossy().into_owned();
            let stage = self.stage_of(&entry.path())?;
            log::debug!("Found {} version {} in stage {}", name, version, stage);
            if stage_matches(&stage, stages) {
                candidates.push(version);
            }
        }
        Ok(highest_version(candidates))
    }

    async fn load_artifact(&self, name: &str, version: &str) -> Result<Arc<dyn Model>, ServeError> {
        load_model_dir(&self.version_dir(name, version), &self.runtime)
    }
}
