mod common;

use std::sync::Arc;
use std::thread;

use verdict::pipeline::{PREDICT_ENDPOINT, PREDICT_METHOD};
use verdict::PipelineError;

use common::sentiment_pipeline;

#[test]
fn test_positive_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = sentiment_pipeline();
    let result = pipeline.handle_predict_request("I LOVE this!!")?;
    assert_eq!(result.label, "positive");
    assert_eq!(result.model_version, "1");
    assert_eq!(pipeline.metrics().prediction_count("positive"), 1);
    Ok(())
}

#[test]
fn test_empty_text_gets_majority_label() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = sentiment_pipeline();
    let result = pipeline.handle_predict_request("")?;
    assert_eq!(result.label, "positive");

    let result = pipeline.handle_predict_request("completely unrelated words")?;
    assert_eq!(result.label, "positive");
    Ok(())
}

#[test]
fn test_negative_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = sentiment_pipeline();
    let result = pipeline.handle_predict_request("What an AWFUL, terrible movie.")?;
    assert_eq!(result.label, "negative");
    Ok(())
}

#[test]
fn test_long_review_gets_a_label() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = sentiment_pipeline();
    let review = "great movie ".repeat(900);
    assert!(review.chars().count() > 10_000);

    let result = pipeline.handle_predict_request(&review)?;
    assert_eq!(result.label, "positive");
    assert_eq!(pipeline.metrics().prediction_count("positive"), 1);
    Ok(())
}

#[test]
fn test_predictions_are_deterministic() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = sentiment_pipeline();
    for text in ["I love this movie", "I hate this movie", "", "meh"] {
        let first = pipeline.handle_predict_request(text)?;
        let second = pipeline.handle_predict_request(text)?;
        assert_eq!(first, second, "prediction changed for {:?}", text);
    }
    Ok(())
}

#[test]
fn test_successful_requests_are_counted_once() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = sentiment_pipeline();
    let texts = ["great", "awful", "awesome movie", "terrible", "love"];
    for text in texts {
        pipeline.handle_predict_request(text)?;
    }

    let metrics = pipeline.metrics();
    let n = texts.len() as u64;
    assert_eq!(metrics.request_count(PREDICT_METHOD, PREDICT_ENDPOINT), n);
    assert_eq!(metrics.latency_observations(PREDICT_ENDPOINT), n);
    assert_eq!(metrics.total_predictions(), n);
    assert_eq!(metrics.prediction_count("positive"), 3);
    assert_eq!(metrics.prediction_count("negative"), 2);
    Ok(())
}

#[test]
fn test_normalization_failure_is_not_a_prediction() {
    let pipeline = sentiment_pipeline();
    let err = pipeline.handle_predict_request("broken\u{7}input").unwrap_err();
    assert!(matches!(err, PipelineError::Normalization(_)));

    let metrics = pipeline.metrics();
    assert_eq!(metrics.request_count(PREDICT_METHOD, PREDICT_ENDPOINT), 1);
    assert_eq!(metrics.latency_observations(PREDICT_ENDPOINT), 1);
    assert_eq!(metrics.total_predictions(), 0);
}

#[test]
fn test_concurrent_requests() {
    let pipeline = Arc::new(sentiment_pipeline());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                let text = if i % 2 == 0 { "love it" } else { "hate it" };
                for _ in 0..50 {
                    pipeline.handle_predict_request(text).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let metrics = pipeline.metrics();
    assert_eq!(metrics.request_count(PREDICT_METHOD, PREDICT_ENDPOINT), 200);
    assert_eq!(metrics.latency_observations(PREDICT_ENDPOINT), 200);
    assert_eq!(metrics.prediction_count("positive"), 100);
    assert_eq!(metrics.prediction_count("negative"), 100);
}
