use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{highest_version, ModelStore};
use crate::classifier::{load_model_dir, Model, ARTIFACT_FILES};
use crate::error::ServeError;
use crate::runtime::RuntimeConfig;

const LATEST_VERSIONS_PATH: &str = "api/2.0/mlflow/registered-models/get-latest-versions";
const DOWNLOAD_URI_PATH: &str = "api/2.0/mlflow/model-versions/get-download-uri";
const PROXIED_ARTIFACTS_PATH: &str = "api/2.0/mlflow-artifacts/artifacts";

#[derive(Debug, Serialize)]
struct LatestVersionsRequest<'a> {
    name: &'a str,
    stages: &'a [String],
}

#[derive(Debug, Deserialize)]
struct LatestVersionsResponse {
    #[serde(default)]
    model_versions: Vec<RemoteVersion>,
}

#[derive(Debug, Deserialize)]
struct RemoteVersion {
    version: String,
    #[serde(default)]
    current_stage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadUriResponse {
    artifact_uri: String,
}

/// An MLflow-compatible model registry reached over HTTP.
///
/// Artifacts are downloaded once into `cache_dir/<name>/<version>/` next to a
/// `.sha256` digest file, and loaded from there.
#[derive(Debug, Clone)]
pub struct RemoteModelStore {
    base_url: String,
    cache_dir: PathBuf,
    client: reqwest::Client,
    runtime: RuntimeConfig,
    download_lock: Arc<Mutex<()>>,
}

impl RemoteModelStore {
    pub fn new<P: AsRef<Path>>(base_url: impl Into<String>, cache_dir: P) -> Result<Self, ServeError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_dir,
            client: reqwest::Client::new(),
            runtime: RuntimeConfig::default(),
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Maps a registry artifact URI to an HTTP URL that can be fetched.
    pub fn artifact_url(&self, artifact_uri: &str) -> Result<String, ServeError> {
        if let Some(path) = artifact_uri.strip_prefix("mlflow-artifacts:") {
            let path = path.trim_start_matches('/');
            return Ok(format!("{}/{}", self.endpoint(PROXIED_ARTIFACTS_PATH), path));
        }
        if artifact_uri.starts_with("http://") || artifact_uri.starts_with("https://") {
            return Ok(artifact_uri.trim_end_matches('/').to_string());
        }
        Err(ServeError::UnsupportedArtifact(artifact_uri.to_string()))
    }

    async fn download_uri(&self, name: &str, version: &str) -> Result<String, ServeError> {
        let response = self
            .client
            .get(self.endpoint(DOWNLOAD_URI_PATH))
            .query(&[("name", name), ("version", version)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServeError::Store(format!("{} version {} not found", name, version)));
        }
        let body: DownloadUriResponse = response.error_for_status()?.json().await?;
        log::info!("Artifact URI for {} version {}: {}", name, version, body.artifact_uri);
        Ok(body.artifact_uri)
    }

    /// Downloads the first artifact file the registry serves for this version.
    async fn fetch_artifact(&self, base: &str, dir: &Path) -> Result<(), ServeError> {
        for file in ARTIFACT_FILES {
            let path = dir.join(file);
            if path.is_file() {
                if verify_file(&path)? {
                    log::info!("Cached {} verified at {:?}", file, path);
                    return Ok(());
                }
                log::warn!("Cached {} failed verification, redownloading", file);
                fs::remove_file(&path)?;
            }

            let url = format!("{}/{}", base, file);
            log::info!("Downloading {} from {}", file, url);
            let response = self.client.get(&url).send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                log::info!("Registry has no {} for this version", file);
                continue;
            }
            let bytes = response.error_for_status()?.bytes().await?;
            log::info!("Downloaded {} bytes", bytes.len());

            // The sidecar lets later startups detect a tampered or truncated cache.
            fs::create_dir_all(dir)?;
            fs::write(&path, &bytes)?;
            fs::write(digest_path(&path), sha256_hex(&bytes))?;
            return Ok(());
        }
        Err(ServeError::ArtifactMissing(dir.to_path_buf()))
    }
}

#[async_trait]
impl ModelStore for RemoteModelStore {
    async fn latest_version(&self, name: &str, stages: &[String]) -> Result<Option<String>, ServeError> {
        log::info!("Querying {} for latest {} version in stages {:?}", self.base_url, name, stages);
        let response = self
            .client
            .post(self.endpoint(LATEST_VERSIONS_PATH))
            .json(&LatestVersionsRequest { name, stages })
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServeError::ModelNotRegistered(name.to_string()));
        }
        let body: LatestVersionsResponse = response.error_for_status()?.json().await?;
        for version in &body.model_versions {
            log::debug!(
                "Registry reports {} version {} in stage {:?}",
                name,
                version.version,
                version.current_stage
            );
        }
        Ok(highest_version(body.model_versions.iter().map(|v| v.version.as_str())))
    }

    async fn load_artifact(&self, name: &str, version: &str) -> Result<Arc<dyn Model>, ServeError> {
        let dir = self.cache_dir.join(name).join(version);
        {
            let _lock = self.download_lock.lock().await;
            let artifact_uri = self.download_uri(name, version).await?;
            let base = self.artifact_url(&artifact_uri)?;
            self.fetch_artifact(&base, &dir).await?;
        }
        load_model_dir(&dir, &self.runtime)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn digest_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

/// True when `path` matches the digest recorded next to it.
fn verify_file(path: &Path) -> Result<bool, ServeError> {
    let digest_path = digest_path(path);
    if !digest_path.is_file() {
        return Ok(false);
    }
    let expected = fs::read_to_string(digest_path)?;
    let actual = sha256_hex(&fs::read(path)?);
    if actual != expected.trim() {
        log::warn!("Digest mismatch for {:?}: expected {}, got {}", path, expected.trim(), actual);
        return Ok(false);
    }
    Ok(true)
}
