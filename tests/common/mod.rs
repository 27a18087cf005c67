// Shared test helpers: sample builders, temp store, stub forecasting engine

#![allow(dead_code)]

use async_trait::async_trait;
use loadwatch::forecast::{
    ForecastEngine, ForecastError, ForecastResult, PredictRequest, PredictResponse, TrainRequest,
    TrainResponse,
};
use loadwatch::metrics_repo::MetricsRepo;
use loadwatch::models::{RawSample, ScoredSample};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn raw_sample(timestamp: i64) -> RawSample {
    RawSample {
        timestamp,
        cpu_usage_percent: Some(50.0),
        memory_usage_bytes: Some(4.0 * 1024.0 * 1024.0 * 1024.0),
        memory_capacity_bytes: Some(8.0 * 1024.0 * 1024.0 * 1024.0),
        disk_read_throughput_kbs: Some(512.0),
        disk_write_throughput_kbs: Some(512.0),
        network_received_throughput_kbs: Some(64.0),
        network_transmitted_throughput_kbs: Some(64.0),
    }
}

pub fn scored_sample(timestamp: i64) -> ScoredSample {
    loadwatch::scoring::score(&raw_sample(timestamp))
}

/// Temp-dir SQLite store, initialized.
pub async fn temp_repo(dir: &tempfile::TempDir) -> MetricsRepo {
    let path = dir.path().join("metrics.db");
    let repo = MetricsRepo::connect(path.to_str().unwrap(), 30)
        .await
        .unwrap();
    repo.init().await.unwrap();
    repo
}

/// Seed one scored sample every `step_ms` covering the trailing `span_ms`.
pub async fn seed_samples(repo: &MetricsRepo, span_ms: i64, step_ms: i64) {
    let now = chrono::Local::now().timestamp_millis();
    let mut ts = now - span_ms;
    while ts < now {
        repo.append(&scored_sample(ts)).await.unwrap();
        ts += step_ms;
    }
}

/// In-process engine double. Records requests; training reads the handed-off
/// artifact like the real engine would, predictions are queued per test.
pub struct StubEngine {
    pub healthy: AtomicBool,
    pub models: Mutex<Vec<String>>,
    pub train_calls: Mutex<Vec<TrainRequest>>,
    pub predict_calls: Mutex<Vec<PredictRequest>>,
    /// Model names whose training fails with ServiceUnavailable.
    pub fail_train_for: Mutex<Vec<String>>,
    /// Responses handed out per predict call, in order.
    pub predict_queue: Mutex<Vec<ForecastResult<PredictResponse>>>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            models: Mutex::new(Vec::new()),
            train_calls: Mutex::new(Vec::new()),
            predict_calls: Mutex::new(Vec::new()),
            fail_train_for: Mutex::new(Vec::new()),
            predict_queue: Mutex::new(Vec::new()),
        }
    }
}

impl StubEngine {
    pub fn queue_predict_success(&self, csv_path: &std::path::Path, final_value: f64) {
        self.predict_queue
            .lock()
            .unwrap()
            .push(Ok(PredictResponse {
                success: true,
                message: "Prediction completed successfully".into(),
                prediction_csv_path: csv_path.to_string_lossy().into_owned(),
                final_prediction_time: String::new(),
                final_predicted_value: final_value,
            }));
    }

    pub fn queue_predict_error(&self, err: ForecastError) {
        self.predict_queue.lock().unwrap().push(Err(err));
    }
}

#[async_trait]
impl ForecastEngine for StubEngine {
    async fn health(&self) -> ForecastResult<()> {
        if self.healthy.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(ForecastError::ServiceUnavailable("stub is down".into()))
        }
    }

    async fn train(&self, req: &TrainRequest) -> ForecastResult<TrainResponse> {
        self.train_calls.lock().unwrap().push(req.clone());
        if self
            .fail_train_for
            .lock()
            .unwrap()
            .contains(&req.model_name)
        {
            return Err(ForecastError::ServiceUnavailable(
                "stub train failure".into(),
            ));
        }
        // data_points from the artifact, like the real engine
        let rows = std::fs::read_to_string(&req.csv_filepath)
            .map(|c| c.lines().count().saturating_sub(1))
            .map_err(|e| ForecastError::Parse(format!("artifact: {}", e)))?;
        self.models.lock().unwrap().push(req.model_name.clone());
        Ok(TrainResponse {
            success: true,
            message: format!("Model '{}' trained successfully", req.model_name),
            model_name: req.model_name.clone(),
            data_points: rows as u64,
        })
    }

    async fn predict(&self, req: &PredictRequest) -> ForecastResult<PredictResponse> {
        self.predict_calls.lock().unwrap().push(req.clone());
        let mut queue = self.predict_queue.lock().unwrap();
        if queue.is_empty() {
            return Err(ForecastError::ModelNotFound(req.model_name.clone()));
        }
        queue.remove(0)
    }

    async fn list_models(&self) -> ForecastResult<Vec<String>> {
        if !self.healthy.load(Ordering::Relaxed) {
            return Err(ForecastError::ServiceUnavailable("stub is down".into()));
        }
        Ok(self.models.lock().unwrap().clone())
    }
}

/// Write a 4-column prediction artifact with the given predicted values.
pub fn write_prediction_artifact(dir: &tempfile::TempDir, values: &[f64]) -> std::path::PathBuf {
    let path = dir.path().join("prediction.csv");
    let mut content = String::from("timestamp,predicted_value,lower_bound,upper_bound\n");
    for (i, v) in values.iter().enumerate() {
        content.push_str(&format!(
            "2025-06-01T00:{:02}:00,{},{},{}\n",
            i,
            v,
            v - 5.0,
            v + 5.0
        ));
    }
    std::fs::write(&path, content).unwrap();
    path
}
