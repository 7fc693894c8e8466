use std::net::SocketAddr;
use std::path::PathBuf;

use crate::runtime::RuntimeConfig;
use crate::store::DEFAULT_STAGES;

/// Default location of the vectorizer artifact, relative to the working directory.
pub const DEFAULT_VECTORIZER_PATH: &str = "models/vectorizer.json";

/// Largest accepted `/predict` request body, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Where model versions are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// A registry directory on local disk.
    Local { root: PathBuf },
    /// An MLflow-compatible HTTP registry; artifacts are cached under `cache_dir`.
    Remote { base_url: String, cache_dir: PathBuf },
}

/// Everything the server needs before it can accept traffic.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub model_name: String,
    pub store: StoreConfig,
    pub stages: Vec<String>,
    pub vectorizer_path: PathBuf,
    pub body_limit: usize,
    pub runtime: RuntimeConfig,
}

impl ServerConfig {
    /// A configuration with defaults for everything except the model and its store.
    pub fn new(model_name: impl Into<String>, store: StoreConfig) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            model_name: model_name.into(),
            store,
            stages: DEFAULT_STAGES.iter().map(|s| s.to_string()).collect(),
            vectorizer_path: PathBuf::from(DEFAULT_VECTORIZER_PATH),
            body_limit: DEFAULT_BODY_LIMIT,
            runtime: RuntimeConfig::default(),
        }
    }
}
