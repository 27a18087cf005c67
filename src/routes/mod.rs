// HTTP routes: system-load queries + prediction/training API

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::collector::Collector;
use crate::forecast::{Orchestrator, Predictor};
use crate::metrics_repo::MetricsRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) metrics_repo: Arc<MetricsRepo>,
    pub(crate) collector: Arc<Collector>,
    pub(crate) orchestrator: Arc<Orchestrator>,
    pub(crate) predictor: Arc<Predictor>,
}

pub fn app(
    metrics_repo: Arc<MetricsRepo>,
    collector: Arc<Collector>,
    orchestrator: Arc<Orchestrator>,
    predictor: Arc<Predictor>,
) -> Router {
    let state = AppState {
        metrics_repo,
        collector,
        orchestrator,
        predictor,
    };
    Router::new()
        .route("/", get(|| async { "loadwatch: system load forecasting" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/system-load/current", get(http::current_handler))
        .route("/api/system-load/latest", get(http::latest_handler))
        .route("/api/system-load/history", get(http::history_handler))
        .route("/api/system-load/stats", get(http::stats_handler))
        .route("/api/system-load/collect", post(http::collect_handler))
        .route("/api/system-load/health", get(http::load_health_handler))
        .route("/api/predictions/train", post(http::train_handler))
        .route("/api/predictions/models", get(http::models_handler))
        .route("/api/predictions/health", get(http::prediction_health_handler))
        .route(
            "/api/predictions/{horizon}/{base}",
            get(http::predict_handler),
        )
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
