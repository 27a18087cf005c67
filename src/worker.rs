// Background ingestion worker: sample -> score -> append, on a fixed tick.
// Collection runs independently of request serving; per-tick failures are
// logged and the loop keeps going.

use crate::collector::Collector;
use crate::export::Exporter;
use crate::metrics_repo::MetricsRepo;
use crate::scoring;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Repos and shutdown wiring for the worker.
pub struct WorkerDeps {
    pub collector: Arc<Collector>,
    pub metrics_repo: Arc<MetricsRepo>,
    pub exporter: Arc<Exporter>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing config. Stats logging and pruning run on their own
/// real-time intervals, independent of the sample tick.
pub struct WorkerConfig {
    pub sample_interval_secs: u64,
    pub stats_log_interval_secs: u64,
    pub prune_interval_secs: u64,
    /// Export artifacts older than this are deleted on the prune tick.
    pub artifact_ttl: Duration,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        collector,
        metrics_repo,
        exporter,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_secs,
        stats_log_interval_secs,
        prune_interval_secs,
        artifact_ttl,
    } = config;

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(sample_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut prune_tick = interval(Duration::from_secs(prune_interval_secs));
        prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut samples_saved_total: u64 = 0;
        let mut samples_pruned_total: u64 = 0;

        let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", sample_interval_secs);
        let _guard = worker_span.enter();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let raw = match collector.sample().await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "sample", "sample collection failed");
                            continue;
                        }
                    };
                    let scored = scoring::score(&raw);
                    match metrics_repo.append(&scored).await {
                        Ok(()) => {
                            samples_saved_total += 1;
                            tracing::debug!(
                                operation = "append",
                                overall_load_score = scored.overall_load_score,
                                "sample stored"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "append", "sample store failed");
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        samples_saved_total,
                        samples_pruned_total,
                        "app stats"
                    );
                }
                _ = prune_tick.tick() => {
                    match metrics_repo.prune_old_samples().await {
                        Ok(n) => {
                            samples_pruned_total += n;
                            tracing::debug!(operation = "prune_old_samples", pruned = n, "old samples pruned");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "prune_old_samples", "prune failed");
                        }
                    }
                    match exporter.cleanup_artifacts(artifact_ttl) {
                        Ok(n) if n > 0 => {
                            tracing::debug!(operation = "cleanup_artifacts", removed = n, "stale artifacts removed");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "cleanup_artifacts", "artifact cleanup failed");
                        }
                    }
                }
            }
        }
    })
}
