// Historical sample export: scored samples -> semicolon-delimited training
// artifact consumed by the forecasting engine.

use crate::forecast::{ForecastError, ForecastResult};
use crate::metrics_repo::MetricsRepo;
use crate::models::ScoredSample;
use chrono::TimeZone;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Minimum usable rows before an artifact is written.
pub const MIN_TRAINING_SAMPLES: usize = 10;

/// Where training series go. The engine reads artifacts back by path, so the
/// default sink is a CSV file; tests substitute an in-memory one.
pub trait TrainingDataSink: Send + Sync {
    /// Write one (timestamp_ms, value) series. Returns the artifact path the
    /// engine should be pointed at.
    fn write_series(&self, metric_name: &str, rows: &[(i64, f64)]) -> ForecastResult<PathBuf>;

    /// Delete artifacts older than `ttl`. Returns how many were removed.
    fn cleanup_older_than(&self, ttl: Duration) -> ForecastResult<usize>;
}

/// CSV sink: `Timestamp;{metric}` header, `yyyy-MM-dd HH:mm:ss;{value}` rows,
/// uniquely-timestamped filenames (no locking needed, single writer per file).
pub struct CsvTrainingSink {
    dir: PathBuf,
}

impl CsvTrainingSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TrainingDataSink for CsvTrainingSink {
    fn write_series(&self, metric_name: &str, rows: &[(i64, f64)]) -> ForecastResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let epoch_ms = chrono::Local::now().timestamp_millis();
        let path = self
            .dir
            .join(format!("system_metrics_{}_{}.csv", metric_name, epoch_ms));

        let mut content = String::with_capacity(rows.len() * 32);
        content.push_str(&format!("Timestamp;{}\n", metric_name));
        for (ts, value) in rows {
            let formatted = chrono::Local
                .timestamp_millis_opt(*ts)
                .single()
                .ok_or_else(|| ForecastError::Validation(format!("bad timestamp {}", ts)))?
                .format("%Y-%m-%d %H:%M:%S");
            content.push_str(&format!("{};{}\n", formatted, value));
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    fn cleanup_older_than(&self, ttl: Duration) -> ForecastResult<usize> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Ok(0); // nothing exported yet
        };
        let now = std::time::SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if now.duration_since(modified).unwrap_or_default() > ttl {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(error = %e, path = %path.display(), "artifact cleanup failed");
                } else {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

/// A written training artifact.
#[derive(Debug, Clone)]
pub struct ExportedSeries {
    pub path: PathBuf,
    pub data_points: usize,
}

pub struct Exporter {
    repo: Arc<MetricsRepo>,
    sink: Arc<dyn TrainingDataSink>,
}

impl Exporter {
    pub fn new(repo: Arc<MetricsRepo>, sink: Arc<dyn TrainingDataSink>) -> Self {
        Self { repo, sink }
    }

    /// Export `metric_name` over the trailing `lookback_hours`, downsampled to
    /// one row per `sample_interval_secs` bucket. Fails with
    /// `InsufficientData` before writing anything when fewer than
    /// `MIN_TRAINING_SAMPLES` usable rows remain.
    #[instrument(skip(self), fields(operation = "export_training_series"))]
    pub async fn export(
        &self,
        metric_name: &str,
        lookback_hours: u32,
        sample_interval_secs: u64,
    ) -> ForecastResult<ExportedSeries> {
        if !ScoredSample::is_known_metric(metric_name) {
            return Err(ForecastError::Validation(format!(
                "unknown metric '{}'",
                metric_name
            )));
        }

        let now_ms = chrono::Local::now().timestamp_millis();
        let from_ms = now_ms - (lookback_hours as i64) * 3_600_000;
        let samples = self.repo.range_query(from_ms, now_ms).await?;

        let rows: Vec<(i64, f64)> = samples
            .iter()
            .filter_map(|s| s.metric_value(metric_name).map(|v| (s.raw.timestamp, v)))
            .collect();
        let rows = downsample(&rows, (sample_interval_secs as i64) * 1000);

        if rows.len() < MIN_TRAINING_SAMPLES {
            return Err(ForecastError::InsufficientData {
                have: rows.len(),
                need: MIN_TRAINING_SAMPLES,
            });
        }

        let path = self.sink.write_series(metric_name, &rows)?;
        tracing::debug!(
            metric = metric_name,
            data_points = rows.len(),
            path = %path.display(),
            "training series exported"
        );
        Ok(ExportedSeries {
            path,
            data_points: rows.len(),
        })
    }

    /// Remove stale handoff artifacts (called from the worker's prune tick).
    pub fn cleanup_artifacts(&self, ttl: Duration) -> ForecastResult<usize> {
        self.sink.cleanup_older_than(ttl)
    }
}

/// One row per time bucket, last sample in the bucket wins. Input is
/// ascending, so output stays ascending.
fn downsample(rows: &[(i64, f64)], bucket_ms: i64) -> Vec<(i64, f64)> {
    if bucket_ms <= 0 {
        return rows.to_vec();
    }
    let mut by_bucket: BTreeMap<i64, (i64, f64)> = BTreeMap::new();
    for &(ts, v) in rows {
        let bucket = (ts / bucket_ms) * bucket_ms;
        by_bucket.insert(bucket, (ts, v));
    }
    by_bucket.into_values().collect()
}

/// Parse the artifact back (header + `timestamp;value` rows). Test support
/// and a sanity hook for debugging handoffs.
pub fn read_artifact(path: &Path) -> ForecastResult<Vec<(String, f64)>> {
    let content = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in content.lines().skip(1) {
        let Some((ts, value)) = line.split_once(';') else {
            continue;
        };
        let Ok(value) = value.parse::<f64>() else {
            continue;
        };
        out.push((ts.to_string(), value));
    }
    Ok(out)
}
