//! HTTP boundary: startup, routing and response rendering.
//!
//! | Route          | Purpose                                              |
//! |----------------|------------------------------------------------------|
//! | `GET /`        | input form; request and latency metrics only         |
//! | `POST /predict`| classify the `text` form field; body size is capped  |
//! | `GET /metrics` | Prometheus exposition of the metrics registry        |

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use log::{error, info};
use serde::Deserialize;

use crate::config::{ServerConfig, StoreConfig};
use crate::error::ServeError;
use crate::metrics::EXPOSITION_CONTENT_TYPE;
use crate::pipeline::{Pipeline, RequestTimer};
use crate::store::{LocalModelStore, ModelResolver, ModelStore, RemoteModelStore};
use crate::vectorizer::VectorizerHandle;

const HOME_ENDPOINT: &str = "/";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

#[derive(Debug, Deserialize)]
struct PredictForm {
    text: String,
}

/// Builds the store named by the configuration.
pub fn model_store(config: &ServerConfig) -> Result<Arc<dyn ModelStore>, ServeError> {
    let store: Arc<dyn ModelStore> = match &config.store {
        StoreConfig::Local { root } => {
            info!("Using local model store at {:?}", root);
            Arc::new(LocalModelStore::new(root)?.with_runtime_config(config.runtime.clone()))
        }
        StoreConfig::Remote { base_url, cache_dir } => {
            info!("Using remote model store at {} (cache {:?})", base_url, cache_dir);
            Arc::new(
                RemoteModelStore::new(base_url.clone(), cache_dir)?
                    .with_runtime_config(config.runtime.clone()),
            )
        }
    };
    Ok(store)
}

/// Runs the whole startup phase: resolve the model, load the vectorizer and
/// check they agree. Nothing is served unless this succeeds.
pub async fn bootstrap(config: &ServerConfig) -> Result<Pipeline, ServeError> {
    if config.model_name.trim().is_empty() {
        return Err(ServeError::MissingConfig("model name is required".into()));
    }

    let resolver = ModelResolver::new(model_store(config)?).with_stages(config.stages.clone());
    let model = resolver.resolve(&config.model_name).await?;
    let vectorizer = VectorizerHandle::load(&config.vectorizer_path)?;

    Pipeline::builder()
        .with_model(model)
        .with_vectorizer(vectorizer)
        .build()
}

/// Builds the routes; `/predict` bodies larger than `body_limit` bytes are
/// refused with 413 before they reach the pipeline.
pub fn router(pipeline: Arc<Pipeline>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route(
            "/predict",
            post(predict).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/metrics", get(metrics))
        .with_state(AppState { pipeline })
}

/// Bootstraps the pipeline, then serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    let pipeline = match bootstrap(&config).await {
        Ok(pipeline) => Arc::new(pipeline),
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e);
        }
    };

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(pipeline, config.body_limit))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn home(State(state): State<AppState>) -> Html<String> {
    let _timer = RequestTimer::start(state.pipeline.metrics(), "GET", HOME_ENDPOINT);
    Html(render_page(None, None))
}

async fn predict(State(state): State<AppState>, Form(form): Form<PredictForm>) -> Response {
    match state.pipeline.handle_predict_request(&form.text) {
        Ok(result) => Html(render_page(Some(&result.label), None)).into_response(),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Html(render_page(None, Some(&e.to_string())))).into_response()
        }
    }
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.pipeline.metrics().export(),
    )
}

fn render_page(result: Option<&str>, failure: Option<&str>) -> String {
    let mut body = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>Text Classifier</title></head>\n<body>\n\
         <h1>Text Classifier</h1>\n\
         <form action=\"/predict\" method=\"post\">\n\
         <textarea name=\"text\" rows=\"6\" cols=\"60\"></textarea><br>\n\
         <button type=\"submit\">Predict</button>\n</form>\n",
    );
    if let Some(label) = result {
        body.push_str(&format!("<p class=\"result\">Prediction: {}</p>\n", escape_html(label)));
    }
    if let Some(message) = failure {
        body.push_str(&format!("<p class=\"error\">{}</p>\n", escape_html(message)));
    }
    body.push_str("</body>\n</html>\n");
    body
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
