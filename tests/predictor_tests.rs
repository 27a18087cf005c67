// Predictor: request shape, artifact parsing tolerance, analysis wiring

mod common;

use common::{StubEngine, write_prediction_artifact};
use loadwatch::forecast::predictor::parse_prediction_artifact;
use loadwatch::forecast::{CircuitBreaker, ForecastError, Predictor};
use loadwatch::models::Horizon;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn predictor() -> (Predictor, Arc<StubEngine>) {
    let engine = Arc::new(StubEngine::default());
    let breaker = Arc::new(CircuitBreaker::new(3, Duration::from_secs(60)));
    (Predictor::new(engine.clone(), breaker), engine)
}

#[tokio::test]
async fn request_targets_canonical_model_with_fixed_periods() {
    let (predictor, engine) = predictor();
    let dir = tempfile::TempDir::new().unwrap();
    let artifact = write_prediction_artifact(&dir, &[40.0, 42.0, 45.0]);
    engine.queue_predict_success(&artifact, 45.0);

    let result = predictor.predict("web", Horizon::OneHour).await;
    assert!(result.success, "{}", result.message);

    let calls = engine.predict_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model_name, "web_1h");
    assert_eq!(calls[0].future_periods_seconds, 60);
    assert_eq!(calls[0].freq_seconds, "60S");
    assert_eq!(calls[0].cap_value, 110.0);
    assert_eq!(calls[0].floor_value, 0.0);
}

#[tokio::test]
async fn frequency_scales_with_horizon() {
    let (predictor, engine) = predictor();
    let dir = tempfile::TempDir::new().unwrap();
    for _ in 0..2 {
        let artifact = write_prediction_artifact(&dir, &[50.0]);
        engine.queue_predict_success(&artifact, 50.0);
    }

    predictor.predict("web", Horizon::SixHours).await;
    predictor.predict("web", Horizon::TwentyFourHours).await;

    let calls = engine.predict_calls.lock().unwrap();
    assert_eq!(calls[0].freq_seconds, "360S");
    assert_eq!(calls[0].model_name, "web_6h");
    assert_eq!(calls[1].freq_seconds, "1440S");
    assert_eq!(calls[1].model_name, "web_24h");
}

#[tokio::test]
async fn final_value_comes_from_last_series_point() {
    let (predictor, engine) = predictor();
    let dir = tempfile::TempDir::new().unwrap();
    let artifact = write_prediction_artifact(&dir, &[30.0, 55.0, 61.5]);
    // engine claims a different final value; the parsed series wins
    engine.queue_predict_success(&artifact, 99.0);

    let result = predictor.predict("web", Horizon::OneHour).await;
    assert!(result.success);
    assert_eq!(result.final_predicted_value, Some(61.5));
    assert_eq!(result.series.len(), 3);
    assert_eq!(result.horizon_label, "1 hour");
    assert!(!result.is_anomaly);
}

#[tokio::test]
async fn anomaly_and_recommendations_ride_along() {
    let (predictor, engine) = predictor();
    let dir = tempfile::TempDir::new().unwrap();
    let artifact = write_prediction_artifact(&dir, &[88.0, 91.0, 93.0]);
    engine.queue_predict_success(&artifact, 93.0);

    let result = predictor.predict("web", Horizon::SixHours).await;
    assert!(result.success);
    assert!(result.is_anomaly, "final 93.0 crosses the 90 threshold");
    assert!(
        result
            .recommendations
            .iter()
            .any(|r| r.contains("scaling up")),
        "{:?}",
        result.recommendations
    );
}

#[tokio::test]
async fn engine_error_becomes_failed_result() {
    let (predictor, engine) = predictor();
    engine.queue_predict_error(ForecastError::ModelNotFound("web_1h".into()));

    let result = predictor.predict("web", Horizon::OneHour).await;
    assert!(!result.success);
    assert!(result.message.starts_with("Prediction failed: "));
    assert!(result.message.contains("web_1h"));
    assert!(result.series.is_empty());
    assert_eq!(result.final_predicted_value, None);
}

#[tokio::test]
async fn unreadable_artifact_is_a_failure() {
    let (predictor, engine) = predictor();
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("nope.csv");
    engine.queue_predict_success(&missing, 50.0);

    let result = predictor.predict("web", Horizon::OneHour).await;
    assert!(!result.success);
    assert!(result.message.starts_with("Prediction failed: "));
}

#[tokio::test]
async fn open_breaker_short_circuits_without_engine_call() {
    let engine = Arc::new(StubEngine::default());
    let breaker = Arc::new(CircuitBreaker::new(1, Duration::from_secs(300)));
    breaker.record_failure(); // threshold 1: breaker opens
    let predictor = Predictor::new(engine.clone(), breaker);

    let result = predictor.predict("web", Horizon::OneHour).await;
    assert!(!result.success);
    assert!(engine.predict_calls.lock().unwrap().is_empty());
    assert!(!predictor.engine_available());
}

#[tokio::test]
async fn non_transient_failure_after_cooldown_closes_the_circuit() {
    let engine = Arc::new(StubEngine::default());
    let breaker = Arc::new(CircuitBreaker::new(1, Duration::ZERO));
    breaker.record_failure(); // open; zero cooldown admits the next call
    let predictor = Predictor::new(engine.clone(), breaker);

    // the engine is reachable again but the model was never trained
    engine.queue_predict_error(ForecastError::ModelNotFound("web_1h".into()));
    let result = predictor.predict("web", Horizon::OneHour).await;
    assert!(!result.success);
    assert!(predictor.engine_available(), "an answered call must close the circuit");

    // a healthy follow-up call reaches the engine instead of being rejected
    let dir = tempfile::TempDir::new().unwrap();
    let artifact = write_prediction_artifact(&dir, &[42.0]);
    engine.queue_predict_success(&artifact, 42.0);
    let result = predictor.predict("web", Horizon::OneHour).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(engine.predict_calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn available_models_is_empty_on_engine_failure() {
    let (predictor, engine) = predictor();
    engine.healthy.store(false, Ordering::Relaxed);
    assert!(predictor.available_models().await.is_empty());
    assert!(!predictor.engine_ready().await);

    engine.healthy.store(true, Ordering::Relaxed);
    engine.models.lock().unwrap().push("web_1h".into());
    assert_eq!(predictor.available_models().await, vec!["web_1h"]);
    assert!(predictor.engine_ready().await);
}

#[test]
fn artifact_parser_skips_corrupt_rows() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("p.csv");
    std::fs::write(
        &path,
        "timestamp,predicted_value,lower_bound,upper_bound\n\
         2025-06-01T00:00:00,40.5,35.0,46.0\n\
         2025-06-01T00:01:00,not-a-number,35.0,46.0\n\
         2025-06-01T00:02:00,41.0\n\
         \n\
         2025-06-01T00:03:00, 42.25 , 37.0 , 47.5\n",
    )
    .unwrap();

    let points = parse_prediction_artifact(&path).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].predicted_value, 40.5);
    assert_eq!(points[1].predicted_value, 42.25);
    assert_eq!(points[1].timestamp, "2025-06-01T00:03:00");
    assert_eq!(points[1].upper_bound, 47.5);
}

#[test]
fn artifact_with_no_surviving_rows_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("p.csv");
    std::fs::write(
        &path,
        "timestamp,predicted_value,lower_bound,upper_bound\nbad,row\n",
    )
    .unwrap();

    assert!(matches!(
        parse_prediction_artifact(&path),
        Err(ForecastError::Parse(_))
    ));
}
