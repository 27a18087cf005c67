// HTTP client for the forecasting engine (train / predict / health / models).
// The engine's algorithm is opaque; this module only speaks its wire format.

use super::{ForecastError, ForecastResult};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// POST /train body. Field names follow the engine's API.
#[derive(Debug, Clone, Serialize)]
pub struct TrainRequest {
    pub csv_filepath: String,
    pub metric_name: String,
    pub cap_value: f64,
    pub floor_value: f64,
    pub model_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainResponse {
    pub success: bool,
    pub message: String,
    pub model_name: String,
    pub data_points: u64,
}

/// POST /predict body. `freq_seconds` is the engine's pandas-style frequency
/// string, e.g. "60S".
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub model_name: String,
    pub future_periods_seconds: u32,
    pub freq_seconds: String,
    pub cap_value: f64,
    pub floor_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub message: String,
    pub prediction_csv_path: String,
    #[serde(default)]
    pub final_prediction_time: String,
    pub final_predicted_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelsResponse {
    models: Vec<String>,
}

/// Remote time-series forecasting capability. Trait seam so orchestration and
/// prediction logic can be tested against a stub engine.
#[async_trait]
pub trait ForecastEngine: Send + Sync {
    async fn health(&self) -> ForecastResult<()>;
    async fn train(&self, req: &TrainRequest) -> ForecastResult<TrainResponse>;
    async fn predict(&self, req: &PredictRequest) -> ForecastResult<PredictResponse>;
    async fn list_models(&self) -> ForecastResult<Vec<String>>;
}

/// Per-call timeouts. Training is allowed to run long; a client-side timeout
/// does not cancel the engine-side job.
#[derive(Debug, Clone)]
pub struct EngineTimeouts {
    pub health: Duration,
    pub train: Duration,
    pub predict: Duration,
    pub models: Duration,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(5),
            train: Duration::from_secs(600),
            predict: Duration::from_secs(120),
            models: Duration::from_secs(10),
        }
    }
}

pub struct HttpForecastEngine {
    client: reqwest::Client,
    base_url: String,
    timeouts: EngineTimeouts,
}

impl HttpForecastEngine {
    pub fn new(base_url: impl Into<String>, timeouts: EngineTimeouts) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ForecastEngine for HttpForecastEngine {
    #[instrument(skip(self), fields(engine = "http", operation = "health"))]
    async fn health(&self) -> ForecastResult<()> {
        with_retry("health", 2, || async {
            let resp = self
                .client
                .get(self.url("/health"))
                .timeout(self.timeouts.health)
                .send()
                .await
                .map_err(|e| map_transport_error(e, "health"))?;
            if resp.status().is_success() {
                Ok(())
            } else {
                Err(ForecastError::ServiceUnavailable(format!(
                    "health check returned {}",
                    resp.status()
                )))
            }
        })
        .await
    }

    #[instrument(skip(self, req), fields(engine = "http", operation = "train", model = %req.model_name))]
    async fn train(&self, req: &TrainRequest) -> ForecastResult<TrainResponse> {
        // No retry: a duplicate long-running training job is worse than a
        // reported failure.
        let resp = self
            .client
            .post(self.url("/train"))
            .timeout(self.timeouts.train)
            .json(req)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "train"))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ForecastError::ModelNotFound(req.model_name.clone()));
        }
        if !status.is_success() {
            return Err(ForecastError::ServiceUnavailable(format!(
                "train returned {}: {}",
                status,
                resp.text().await.unwrap_or_default()
            )));
        }
        resp.json::<TrainResponse>()
            .await
            .map_err(|e| ForecastError::Parse(format!("train response: {}", e)))
    }

    #[instrument(skip(self, req), fields(engine = "http", operation = "predict", model = %req.model_name))]
    async fn predict(&self, req: &PredictRequest) -> ForecastResult<PredictResponse> {
        with_retry("predict", 2, || async {
            let resp = self
                .client
                .post(self.url("/predict"))
                .timeout(self.timeouts.predict)
                .json(req)
                .send()
                .await
                .map_err(|e| map_transport_error(e, "predict"))?;
            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ForecastError::ModelNotFound(req.model_name.clone()));
            }
            if !status.is_success() {
                return Err(ForecastError::ServiceUnavailable(format!(
                    "predict returned {}: {}",
                    status,
                    resp.text().await.unwrap_or_default()
                )));
            }
            resp.json::<PredictResponse>()
                .await
                .map_err(|e| ForecastError::Parse(format!("predict response: {}", e)))
        })
        .await
    }

    #[instrument(skip(self), fields(engine = "http", operation = "list_models"))]
    async fn list_models(&self) -> ForecastResult<Vec<String>> {
        let resp = self
            .client
            .get(self.url("/models"))
            .timeout(self.timeouts.models)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "models"))?;
        if !resp.status().is_success() {
            return Err(ForecastError::ServiceUnavailable(format!(
                "models returned {}",
                resp.status()
            )));
        }
        let body = resp
            .json::<ModelsResponse>()
            .await
            .map_err(|e| ForecastError::Parse(format!("models response: {}", e)))?;
        Ok(body.models)
    }
}

fn map_transport_error(e: reqwest::Error, what: &str) -> ForecastError {
    if e.is_timeout() {
        ForecastError::Timeout(format!("{}: {}", what, e))
    } else {
        ForecastError::ServiceUnavailable(format!("{}: {}", what, e))
    }
}

/// Bounded retry with jittered backoff for transient engine failures.
async fn with_retry<T, F, Fut>(op: &str, attempts: u32, f: F) -> ForecastResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ForecastResult<T>>,
{
    let mut last_err = None;
    for attempt in 1..=attempts {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < attempts => {
                let jitter_ms = rand::thread_rng().gen_range(0..100);
                let backoff = Duration::from_millis(250 * attempt as u64 + jitter_ms);
                tracing::debug!(
                    operation = op,
                    attempt,
                    error = %e,
                    backoff_ms = backoff.as_millis() as u64,
                    "transient engine failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| ForecastError::ServiceUnavailable(op.to_string())))
}
