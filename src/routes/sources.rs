use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::session_key;
use crate::response::{json_error, AppError, SuccessResponse};
use crate::services::source;
use crate::services::trainer::TrainerError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemovedSource {
    source: String,
    closed_sessions: usize,
}

/// Deletes a source list and its progress, tearing down sessions bound to it.
pub async fn remove_source(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    session_key(&headers)?;
    source::resolve(state.data_dir(), &name).map_err(TrainerError::from)?;

    let closed_sessions = state.sessions().close_source(name.trim()).await;
    let existed = source::remove(state.data_dir(), &name)
        .await
        .map_err(TrainerError::from)?;
    if !existed {
        return Err(json_error(
            StatusCode::NOT_FOUND,
            "SOURCE_UNREADABLE",
            format!("词汇文件 {name} 不存在"),
        ));
    }

    tracing::info!(source = %name, closed_sessions, "source removed");
    Ok(SuccessResponse::new(
        "词汇文件已删除",
        RemovedSource {
            source: name,
            closed_sessions,
        },
    )
    .into_response())
}
