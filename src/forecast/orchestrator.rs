// Multi-horizon training: one export + one training job per horizon, each
// with the horizon's own window/sampling policy. Jobs are independent;
// partial failure never aborts siblings.

use super::engine::{ForecastEngine, TrainRequest};
use super::CircuitBreaker;
use crate::export::Exporter;
use crate::models::{CompositeTrainingResult, Horizon, HorizonTrainingOutcome, ModelIdentity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Training cap/floor: scores are bounded so the model learns a [0,100]
/// series. Prediction calls deliberately use a wider cap (see `Predictor`).
const TRAIN_CAP: f64 = 100.0;
const TRAIN_FLOOR: f64 = 0.0;

/// Serializes concurrent train_all calls for the same base name; without
/// this, two callers would race to overwrite the same horizon models.
/// Released entries are pruned on the next acquisition, so arbitrary
/// caller-supplied base names cannot grow the map without bound.
struct TrainingLocks {
    inner: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TrainingLocks {
    fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, base_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // strong_count == 1 means only the map still holds the entry
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(base_name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct Orchestrator {
    exporter: Arc<Exporter>,
    engine: Arc<dyn ForecastEngine>,
    breaker: Arc<CircuitBreaker>,
    training_locks: TrainingLocks,
}

impl Orchestrator {
    pub fn new(
        exporter: Arc<Exporter>,
        engine: Arc<dyn ForecastEngine>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            exporter,
            engine,
            breaker,
            training_locks: TrainingLocks::new(),
        }
    }

    /// Train all three horizon models for `base_name` on `metric_name`.
    /// Always attempts exactly three jobs; the composite succeeds when at
    /// least one of them did.
    #[instrument(skip(self), fields(operation = "train_all"))]
    pub async fn train_all(&self, metric_name: &str, base_name: &str) -> CompositeTrainingResult {
        let lock = self.training_locks.lock_for(base_name);
        let _guard = lock.lock().await;

        let mut outcomes = Vec::with_capacity(Horizon::ALL.len());
        for horizon in Horizon::ALL {
            outcomes.push(self.train_horizon(metric_name, base_name, horizon).await);
        }

        let trained = outcomes.iter().filter(|o| o.success).count();
        CompositeTrainingResult {
            success: trained > 0,
            message: format!(
                "Training completed: {}/{} models trained successfully",
                trained,
                Horizon::ALL.len()
            ),
            outcomes,
        }
    }

    async fn train_horizon(
        &self,
        metric_name: &str,
        base_name: &str,
        horizon: Horizon,
    ) -> HorizonTrainingOutcome {
        let identity = ModelIdentity::new(base_name, horizon);
        let model_name = identity.canonical_name();

        let failed = |message: String| HorizonTrainingOutcome {
            model_name: model_name.clone(),
            horizon,
            success: false,
            message,
            data_points: 0,
        };

        if base_name.trim().is_empty() {
            return failed("base model name must not be empty".into());
        }

        let exported = match self
            .exporter
            .export(
                metric_name,
                horizon.lookback_hours(),
                horizon.sample_interval_secs(),
            )
            .await
        {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(model = %model_name, error = %e, "training data export failed");
                return failed(format!("Export failed: {}", e));
            }
        };

        if let Err(e) = self.breaker.check() {
            return failed(format!("Training skipped: {}", e));
        }

        let request = TrainRequest {
            csv_filepath: exported.path.to_string_lossy().into_owned(),
            metric_name: metric_name.to_string(),
            cap_value: TRAIN_CAP,
            floor_value: TRAIN_FLOOR,
            model_name: model_name.clone(),
        };

        match self.engine.train(&request).await {
            Ok(resp) if resp.success => {
                self.breaker.record_success();
                tracing::info!(
                    model = %model_name,
                    data_points = resp.data_points,
                    "horizon model trained"
                );
                HorizonTrainingOutcome {
                    model_name,
                    horizon,
                    success: true,
                    message: resp.message,
                    data_points: resp.data_points,
                }
            }
            Ok(resp) => {
                self.breaker.record_success(); // engine answered; only the job failed
                failed(format!("Training failed: {}", resp.message))
            }
            Err(e) => {
                if e.is_transient() {
                    self.breaker.record_failure();
                } else {
                    // engine answered; resolves a half-open probe
                    self.breaker.record_success();
                }
                tracing::warn!(model = %model_name, error = %e, "training job failed");
                failed(format!("Training failed: {}", e))
            }
        }
    }
}
