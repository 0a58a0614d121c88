mod health;
mod sources;
mod trainer;

use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/trainer", get(trainer::view).fallback(fallback_handler))
        .route(
            "/api/trainer/session",
            post(trainer::open_session)
                .delete(trainer::close_session)
                .fallback(fallback_handler),
        )
        .route("/api/trainer/next", post(trainer::next).fallback(fallback_handler))
        .route("/api/trainer/judge", post(trainer::judge).fallback(fallback_handler))
        .route("/api/trainer/undo", post(trainer::undo).fallback(fallback_handler))
        .route(
            "/api/trainer/promote",
            post(trainer::promote).fallback(fallback_handler),
        )
        .route(
            "/api/trainer/words",
            post(trainer::add_word).fallback(fallback_handler),
        )
        .route(
            "/api/trainer/current",
            put(trainer::edit_current).fallback(fallback_handler),
        )
        .route(
            "/api/trainer/params",
            put(trainer::update_params).fallback(fallback_handler),
        )
        .route("/api/trainer/reset", post(trainer::reset).fallback(fallback_handler))
        .route(
            "/api/sources/:name",
            delete(sources::remove_source).fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("接口不存在").into_response()
}
