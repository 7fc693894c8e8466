//! Router-level tests for the HTTP boundary.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use verdict::config::DEFAULT_BODY_LIMIT;
use verdict::{router, Pipeline};

use common::sentiment_pipeline;

fn app() -> (Arc<Pipeline>, Router) {
    let pipeline = Arc::new(sentiment_pipeline());
    let app = router(Arc::clone(&pipeline), DEFAULT_BODY_LIMIT);
    (pipeline, app)
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .expect("Failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

fn predict_request(form_body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form_body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_home_records_request_metrics_only() {
    let (pipeline, app) = app();
    let resp = app.oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("<form action=\"/predict\""));

    let metrics = pipeline.metrics();
    assert_eq!(metrics.request_count("GET", "/"), 1);
    assert_eq!(metrics.latency_observations("/"), 1);
    assert_eq!(metrics.total_predictions(), 0);
}

#[tokio::test]
async fn test_predict_returns_label() {
    let (pipeline, app) = app();
    let resp = app
        .oneshot(predict_request("text=I+LOVE+this%21%21"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Prediction: positive"));
    assert_eq!(pipeline.metrics().prediction_count("positive"), 1);
}

#[tokio::test]
async fn test_malformed_text_is_unprocessable() {
    let (pipeline, app) = app();
    let resp = app.oneshot(predict_request("text=bad%00input")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(resp).await;
    assert!(body.contains("Normalization error"));
    assert!(!body.contains("Prediction:"));

    let metrics = pipeline.metrics();
    assert_eq!(metrics.request_count("POST", "/predict"), 1);
    assert_eq!(metrics.latency_observations("/predict"), 1);
    assert_eq!(metrics.total_predictions(), 0);
}

#[tokio::test]
async fn test_long_review_is_classified() {
    let (pipeline, app) = app();
    let review = "great+movie+".repeat(900);
    assert!(review.len() > 10_000);
    let resp = app
        .oneshot(predict_request(&format!("text={}", review)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Prediction: positive"));
    assert_eq!(pipeline.metrics().prediction_count("positive"), 1);
}

#[tokio::test]
async fn test_oversized_body_is_refused_before_the_pipeline() {
    let pipeline = Arc::new(sentiment_pipeline());
    let app = router(Arc::clone(&pipeline), 64);
    let resp = app
        .oneshot(predict_request(&format!("text={}", "a".repeat(100))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let metrics = pipeline.metrics();
    assert_eq!(metrics.request_count("POST", "/predict"), 0);
    assert_eq!(metrics.total_predictions(), 0);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let (_pipeline, app) = app();
    app.clone().oneshot(get("/")).await.unwrap();
    app.clone()
        .oneshot(predict_request("text=awful+movie"))
        .await
        .unwrap();

    let resp = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let first = body_text(resp).await;
    assert!(first.contains("app_request_count_total{method=\"GET\",endpoint=\"/\"} 1"));
    assert!(first.contains("app_request_count_total{method=\"POST\",endpoint=\"/predict\"} 1"));
    assert!(first.contains("app_request_latency_seconds_count{endpoint=\"/predict\"} 1"));
    assert!(first.contains("model_prediction_count_total{prediction=\"negative\"} 1"));

    // Scraping is not itself instrumented, so a second export is identical.
    let second = body_text(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(first, second);
}
