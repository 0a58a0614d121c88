use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use vocab_review_algo::Judgment;

use crate::auth::session_key;
use crate::response::{AppError, SuccessResponse};
use crate::services::trainer::{TrainerError, TrainerSession, TrainerView};
use crate::state::AppState;

#[derive(Deserialize)]
struct OpenRequest {
    source: String,
}

#[derive(Deserialize)]
struct JudgeRequest {
    judgment: String,
}

#[derive(Deserialize)]
struct WordRequest {
    word: String,
    definition: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParamsRequest {
    base_low: u32,
    base_medium: u32,
}

pub async fn open_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let key = session_key(&headers)?;
    let request: OpenRequest = parse_body(&body)?;

    let view = state
        .sessions()
        .open(
            key,
            state.data_dir(),
            &request.source,
            state.config().default_offsets,
        )
        .await?;
    Ok(respond(view))
}

pub async fn close_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let key = session_key(&headers)?;
    if !state.sessions().remove(&key).await {
        return Err(TrainerError::SessionNotFound.into());
    }
    Ok(SuccessResponse::message("会话已关闭").into_response())
}

pub async fn view(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    with_session(&state, &headers, TrainerSession::view).await
}

pub async fn next(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    with_session(&state, &headers, TrainerSession::next).await
}

pub async fn judge(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: JudgeRequest = parse_body(&body)?;
    let judgment: Judgment = request
        .judgment
        .parse()
        .map_err(|_| AppError::validation("判断值无效，必须是 u、s 或 k"))?;

    with_session(&state, &headers, move |session| session.judge(judgment)).await
}

pub async fn undo(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    with_session(&state, &headers, TrainerSession::undo).await
}

pub async fn promote(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    with_session(&state, &headers, TrainerSession::promote).await
}

pub async fn add_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: WordRequest = parse_body(&body)?;
    with_session(&state, &headers, move |session| {
        session.add_word(&request.word, &request.definition)
    })
    .await
}

pub async fn edit_current(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: WordRequest = parse_body(&body)?;
    with_session(&state, &headers, move |session| {
        session.edit_word(&request.word, &request.definition)
    })
    .await
}

pub async fn update_params(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: ParamsRequest = parse_body(&body)?;
    with_session(&state, &headers, move |session| {
        session.update_params(request.base_low, request.base_medium)
    })
    .await
}

pub async fn reset(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let key = session_key(&headers)?;
    let session = state.sessions().get(&key)?;
    let mut guard = session.lock().await;
    let view = guard.reset(state.data_dir()).await?;
    Ok(respond(view))
}

/// Runs `op` with the caller's session locked for its whole duration, then
/// persists whatever it changed before the lock is released.
async fn with_session<F>(state: &AppState, headers: &HeaderMap, op: F) -> Result<Response, AppError>
where
    F: FnOnce(&mut TrainerSession) -> Result<TrainerView, TrainerError> + Send,
{
    let key = session_key(headers)?;
    let session = state.sessions().get(&key)?;
    let mut guard = session.lock().await;
    let result = op(&mut *guard);
    guard.persist().await;
    Ok(respond(result?))
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|_| AppError::validation("请求参数不合法"))
}

fn respond(mut view: TrainerView) -> Response {
    let message = std::mem::take(&mut view.message);
    SuccessResponse::new(message, view).into_response()
}
