use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use verdict::{LocalModelStore, RuntimeConfig, ServerConfig, StoreConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Registered model to serve
    #[arg(long, env = "VERDICT_MODEL_NAME")]
    model_name: String,

    /// MLflow-compatible registry URL; when unset the local store is used
    #[arg(long, env = "VERDICT_REGISTRY_URI")]
    registry_uri: Option<String>,

    /// Local store root, or the artifact cache when a registry URL is set
    #[arg(long, env = "VERDICT_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Path of the vectorizer artifact
    #[arg(long, env = "VERDICT_VECTORIZER", default_value = verdict::config::DEFAULT_VECTORIZER_PATH)]
    vectorizer: PathBuf,

    /// Stage searched before unstaged versions (repeatable, or comma-separated)
    #[arg(
        long = "stage",
        env = "VERDICT_STAGES",
        value_delimiter = ',',
        default_values = verdict::store::DEFAULT_STAGES
    )]
    stages: Vec<String>,

    #[arg(long, env = "VERDICT_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[arg(short, long, env = "VERDICT_PORT", default_value_t = 5000)]
    port: u16,

    /// Largest accepted /predict request body, in bytes
    #[arg(long, env = "VERDICT_MAX_BODY_BYTES", default_value_t = verdict::config::DEFAULT_BODY_LIMIT)]
    max_body_bytes: usize,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    intra_threads: usize,

    /// ONNX Runtime inter-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    inter_threads: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let models_dir = self
            .models_dir
            .unwrap_or_else(LocalModelStore::get_default_models_dir);
        let store = match self.registry_uri {
            Some(base_url) => StoreConfig::Remote {
                base_url,
                cache_dir: models_dir,
            },
            None => StoreConfig::Local { root: models_dir },
        };

        let mut config = ServerConfig::new(self.model_name, store);
        config.bind = SocketAddr::new(self.host, self.port);
        config.stages = self.stages;
        config.vectorizer_path = self.vectorizer;
        config.body_limit = self.max_body_bytes;
        config.runtime = RuntimeConfig {
            intra_threads: self.intra_threads,
            inter_threads: self.inter_threads,
            ..RuntimeConfig::default()
        };
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    verdict::init_logger();
    let config = Args::parse().into_config();

    info!("=== Starting verdict for model '{}' ===", config.model_name);
    info!("Store: {:?}", config.store);
    info!("Vectorizer: {:?}", config.vectorizer_path);

    verdict::serve(config).await.context("server terminated")?;
    Ok(())
}
