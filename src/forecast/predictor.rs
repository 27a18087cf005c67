// Per-horizon prediction: resolve the model identity, request a fixed-count
// series from the engine, parse its artifact tolerating row-level corruption,
// and attach anomaly/recommendation analysis.

use super::engine::{ForecastEngine, PredictRequest};
use super::{CircuitBreaker, ForecastError, ForecastResult, analysis};
use crate::models::{Horizon, ModelIdentity, PredictionPoint, PredictionResult};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Every horizon is asked for the same number of points; resolution scales
/// with the horizon instead (1h -> 60 one-minute points, 24h -> 60
/// 24-minute points).
const FUTURE_PERIODS: u32 = 60;

/// Wider than the training cap of 100 on purpose: the engine may extrapolate
/// past the training ceiling and surface genuine overload predictions instead
/// of clipping them.
const PREDICT_CAP: f64 = 110.0;
const PREDICT_FLOOR: f64 = 0.0;

pub struct Predictor {
    engine: Arc<dyn ForecastEngine>,
    breaker: Arc<CircuitBreaker>,
}

impl Predictor {
    pub fn new(engine: Arc<dyn ForecastEngine>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { engine, breaker }
    }

    /// Predict `horizon` ahead using the `{base}_{horizon}` model. Never
    /// returns `Err`; failures come back as `success=false` results.
    #[instrument(skip(self), fields(operation = "predict"))]
    pub async fn predict(&self, base_name: &str, horizon: Horizon) -> PredictionResult {
        let identity = ModelIdentity::new(base_name, horizon);
        let model_name = identity.canonical_name();

        if let Err(e) = self.breaker.check() {
            return PredictionResult::failure(horizon, format!("Prediction failed: {}", e));
        }

        let request = PredictRequest {
            model_name: model_name.clone(),
            future_periods_seconds: FUTURE_PERIODS,
            freq_seconds: format!("{}S", horizon.seconds() / 60),
            cap_value: PREDICT_CAP,
            floor_value: PREDICT_FLOOR,
        };

        let response = match self.engine.predict(&request).await {
            Ok(r) => r,
            Err(e) => {
                if e.is_transient() {
                    self.breaker.record_failure();
                } else {
                    // engine answered; resolves a half-open probe
                    self.breaker.record_success();
                }
                tracing::warn!(model = %model_name, error = %e, "prediction call failed");
                return PredictionResult::failure(horizon, format!("Prediction failed: {}", e));
            }
        };
        self.breaker.record_success();

        if !response.success {
            return PredictionResult::failure(
                horizon,
                format!("Prediction failed: {}", response.message),
            );
        }

        let series = match parse_prediction_artifact(Path::new(&response.prediction_csv_path)) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(
                    model = %model_name,
                    path = %response.prediction_csv_path,
                    error = %e,
                    "prediction artifact unusable"
                );
                return PredictionResult::failure(horizon, format!("Prediction failed: {}", e));
            }
        };

        // parse_prediction_artifact guarantees a non-empty series here
        let final_value = series.last().map(|p| p.predicted_value);
        let is_anomaly = analysis::detect_anomaly(&series);
        let recommendations = analysis::recommendations(&series, horizon.label());

        PredictionResult {
            success: true,
            message: "Success".into(),
            horizon_label: horizon.label().to_string(),
            final_predicted_value: final_value,
            is_anomaly,
            recommendations,
            series,
        }
    }

    /// Models currently known to the engine. Empty on any failure; the status
    /// endpoint reports availability separately.
    pub async fn available_models(&self) -> Vec<String> {
        if self.breaker.check().is_err() {
            return Vec::new();
        }
        match self.engine.list_models().await {
            Ok(models) => {
                self.breaker.record_success();
                models
            }
            Err(e) => {
                if e.is_transient() {
                    self.breaker.record_failure();
                } else {
                    self.breaker.record_success();
                }
                tracing::warn!(error = %e, "listing engine models failed");
                Vec::new()
            }
        }
    }

    /// Direct engine health probe, recorded into the breaker.
    pub async fn engine_ready(&self) -> bool {
        match self.engine.health().await {
            Ok(()) => {
                self.breaker.record_success();
                true
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::debug!(error = %e, "engine health probe failed");
                false
            }
        }
    }

    pub fn engine_available(&self) -> bool {
        self.breaker.is_available()
    }
}

/// Parse the engine's 4-column artifact (timestamp, predicted_value,
/// lower_bound, upper_bound). The header row is skipped; rows that fail
/// numeric parsing are dropped individually and the survivors kept in file
/// order. Zero surviving rows is a failure, not a zero-length success.
pub fn parse_prediction_artifact(path: &Path) -> ForecastResult<Vec<PredictionPoint>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ForecastError::Parse(format!("{}: {}", path.display(), e)))?;

    let mut points = Vec::new();
    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 4 {
            continue;
        }
        let (Ok(predicted_value), Ok(lower_bound), Ok(upper_bound)) = (
            parts[1].trim().parse::<f64>(),
            parts[2].trim().parse::<f64>(),
            parts[3].trim().parse::<f64>(),
        ) else {
            continue;
        };
        points.push(PredictionPoint {
            timestamp: parts[0].trim().to_string(),
            predicted_value,
            lower_bound,
            upper_bound,
        });
    }

    if points.is_empty() {
        return Err(ForecastError::Parse(format!(
            "no parseable rows in {}",
            path.display()
        )));
    }
    Ok(points)
}
