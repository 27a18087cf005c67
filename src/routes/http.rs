// Handlers: system-load queries, training, per-horizon predictions

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::AppState;
use crate::models::Horizon;
use crate::scoring;
use crate::version::{NAME, VERSION};

/// Latest sample older than this means collection has stalled.
const COLLECTOR_STALE_AFTER_MS: i64 = 60_000;

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::warn!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}

fn now_ms() -> i64 {
    chrono::Local::now().timestamp_millis()
}

/// GET /api/system-load/current — most recent stored sample.
pub(super) async fn current_handler(State(state): State<AppState>) -> Response {
    match state.metrics_repo.latest().await {
        Ok(Some(sample)) => axum::Json(sample).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({ "error": "no samples collected yet" })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Deserialize)]
pub(super) struct LatestParams {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// GET /api/system-load/latest?limit=10 — latest N samples, ascending.
pub(super) async fn latest_handler(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Response {
    match state.metrics_repo.latest_n(params.limit).await {
        Ok(samples) => axum::Json(samples).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Deserialize)]
pub(super) struct WindowParams {
    #[serde(default = "default_hours")]
    hours: u32,
}

fn default_hours() -> u32 {
    24
}

/// GET /api/system-load/history?hours=24 — samples in the trailing window.
pub(super) async fn history_handler(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Response {
    let to = now_ms();
    let from = to - (params.hours as i64) * 3_600_000;
    match state.metrics_repo.range_query(from, to).await {
        Ok(samples) => axum::Json(samples).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/system-load/stats?hours=24 — collection statistics.
pub(super) async fn stats_handler(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Response {
    let to = now_ms();
    let from = to - (params.hours as i64) * 3_600_000;

    let total = match state.metrics_repo.count().await {
        Ok(n) => n,
        Err(e) => return internal_error(e),
    };
    let window = match state.metrics_repo.range_query(from, to).await {
        Ok(samples) => samples,
        Err(e) => return internal_error(e),
    };
    let average_load = match state.metrics_repo.average_overall_load(from, to).await {
        Ok(avg) => avg,
        Err(e) => return internal_error(e),
    };
    let latest_ts = match state.metrics_repo.latest().await {
        Ok(s) => s.map(|s| s.raw.timestamp),
        Err(e) => return internal_error(e),
    };

    axum::Json(serde_json::json!({
        "totalSamples": total,
        "windowHours": params.hours,
        "windowSamples": window.len(),
        "averageLoad": average_load,
        "latestTimestamp": latest_ts,
    }))
    .into_response()
}

/// POST /api/system-load/collect — take one sample immediately, outside the
/// worker's schedule, and store it.
pub(super) async fn collect_handler(State(state): State<AppState>) -> Response {
    let raw = match state.collector.sample().await {
        Ok(r) => r,
        Err(e) => return internal_error(e),
    };
    let scored = scoring::score(&raw);
    if let Err(e) = state.metrics_repo.append(&scored).await {
        return internal_error(e);
    }
    axum::Json(scored).into_response()
}

/// GET /api/system-load/health — collection liveness (latest sample age).
pub(super) async fn load_health_handler(State(state): State<AppState>) -> Response {
    let latest = match state.metrics_repo.latest().await {
        Ok(l) => l,
        Err(e) => return internal_error(e),
    };
    let age_ms = latest.as_ref().map(|s| now_ms() - s.raw.timestamp);
    let healthy = age_ms.is_some_and(|a| a < COLLECTOR_STALE_AFTER_MS);
    axum::Json(serde_json::json!({
        "healthy": healthy,
        "lastSampleAgeMs": age_ms,
        "timestamp": now_ms(),
    }))
    .into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TrainBody {
    metric_name: String,
    base_model_name: String,
}

/// POST /api/predictions/train — train all three horizon models. Always 200;
/// the body carries the per-horizon and composite outcome.
pub(super) async fn train_handler(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<TrainBody>,
) -> Response {
    let result = state
        .orchestrator
        .train_all(&body.metric_name, &body.base_model_name)
        .await;
    axum::Json(result).into_response()
}

/// GET /api/predictions/{horizon}/{base} — forecast `horizon` ahead with the
/// `{base}_{horizon}` model.
pub(super) async fn predict_handler(
    State(state): State<AppState>,
    Path((horizon, base)): Path<(String, String)>,
) -> Response {
    let horizon: Horizon = match horizon.parse() {
        Ok(h) => h,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };
    let result = state.predictor.predict(&base, horizon).await;
    if result.success {
        axum::Json(result).into_response()
    } else {
        (StatusCode::BAD_GATEWAY, axum::Json(result)).into_response()
    }
}

/// GET /api/predictions/models — engine model list plus availability.
pub(super) async fn models_handler(State(state): State<AppState>) -> Response {
    let models = state.predictor.available_models().await;
    axum::Json(serde_json::json!({
        "models": models,
        "count": models.len(),
        "engineAvailable": state.predictor.engine_available(),
    }))
    .into_response()
}

/// GET /api/predictions/health — live engine probe.
pub(super) async fn prediction_health_handler(State(state): State<AppState>) -> Response {
    let ready = state.predictor.engine_ready().await;
    axum::Json(serde_json::json!({
        "engineReady": ready,
        "timestamp": now_ms(),
    }))
    .into_response()
}
