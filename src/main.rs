use anyhow::Result;
use loadwatch::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let collector = Arc::new(collector::Collector::new());
    let metrics_repo = Arc::new(
        metrics_repo::MetricsRepo::connect(
            &app_config.database.path,
            app_config.database.retention_days,
        )
        .await?,
    );
    metrics_repo.init().await?;

    let sink = Arc::new(export::CsvTrainingSink::new(&app_config.forecast.export_dir));
    let exporter = Arc::new(export::Exporter::new(metrics_repo.clone(), sink));

    let engine = Arc::new(forecast::HttpForecastEngine::new(
        &app_config.forecast.engine_url,
        forecast::engine::EngineTimeouts {
            health: Duration::from_secs(app_config.forecast.health_timeout_secs),
            train: Duration::from_secs(app_config.forecast.train_timeout_secs),
            predict: Duration::from_secs(app_config.forecast.predict_timeout_secs),
            models: Duration::from_secs(10),
        },
    ));
    let breaker = Arc::new(forecast::CircuitBreaker::new(
        app_config.forecast.breaker_failure_threshold,
        Duration::from_secs(app_config.forecast.breaker_cooldown_secs),
    ));
    let orchestrator = Arc::new(forecast::Orchestrator::new(
        exporter.clone(),
        engine.clone(),
        breaker.clone(),
    ));
    let predictor = Arc::new(forecast::Predictor::new(engine, breaker));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            collector: collector.clone(),
            metrics_repo: metrics_repo.clone(),
            exporter: exporter.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            sample_interval_secs: app_config.collector.sample_interval_secs,
            stats_log_interval_secs: app_config.collector.stats_log_interval_secs,
            prune_interval_secs: app_config.collector.prune_interval_secs,
            artifact_ttl: Duration::from_secs(app_config.forecast.export_ttl_hours * 3600),
        },
    );

    let app = routes::app(metrics_repo, collector, orchestrator, predictor);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let in_container = std::path::Path::new("/.dockerenv").exists()
        || std::env::var("CONTAINER").as_deref() == Ok("1");

    if in_container {
        // In Docker: run server until error or SIGTERM (no signal handler; avoids immediate exit)
        axum::serve(listener, app).await?;
    } else {
        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = async {
                #[cfg(unix)]
                {
                    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                        Ok(s) => s,
                        Err(_) => {
                            let _ = tokio::signal::ctrl_c().await;
                            return;
                        }
                    };
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                #[cfg(not(unix))]
                {
                    tokio::signal::ctrl_c().await
                }
            } => {
                tracing::info!("Received shutdown signal");
                let _ = shutdown_tx.send(());
                let _ = worker_handle.await;
            }
        }
    }

    Ok(())
}
