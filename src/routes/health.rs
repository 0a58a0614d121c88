use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
}

async fn root(State(state): State<AppState>) -> Response {
    let storage_ok = tokio::fs::metadata(state.data_dir())
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    let response = HealthResponse {
        storage: if storage_ok { "available" } else { "unavailable" },
        timestamp: now_iso(),
        status: if storage_ok { "ok" } else { "degraded" },
    };

    let status_code = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let response = HealthInfoResponse {
        service: "vocab-review-backend",
        version: env!("CARGO_PKG_VERSION"),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
        active_sessions: state.sessions().len(),
    };

    Json(response).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    let response = LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    };

    Json(response).into_response()
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct HealthResponse {
    storage: &'static str,
    timestamp: String,
    status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    start_time: String,
    uptime: u64,
    active_sessions: usize,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}
