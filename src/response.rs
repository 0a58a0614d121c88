use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vocab_review_algo::SchedulerError;

use crate::services::source::SourceError;
use crate::services::trainer::TrainerError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl SuccessResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "internal error");
            "服务器内部错误".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<TrainerError> for AppError {
    fn from(err: TrainerError) -> Self {
        match err {
            TrainerError::Source(SourceError::Unreadable { name, reason }) => json_error(
                StatusCode::NOT_FOUND,
                "SOURCE_UNREADABLE",
                format!("无法读取词汇文件 {name}: {reason}"),
            ),
            TrainerError::Source(err @ SourceError::Io { .. }) => AppError::internal(err.to_string()),
            TrainerError::Progress(err) => AppError::internal(err.to_string()),
            TrainerError::Scheduler(SchedulerError::InvalidConfiguration { .. }) => {
                AppError::validation("参数值无效，必须在 1-100 之间")
            }
            TrainerError::Scheduler(SchedulerError::NothingToUndo) => json_error(
                StatusCode::CONFLICT,
                "NOTHING_TO_UNDO",
                "没有上一个单词可以撤销",
            ),
            TrainerError::NoCurrentWord => {
                json_error(StatusCode::CONFLICT, "NO_CURRENT_WORD", "没有当前单词")
            }
            TrainerError::Validation(message) => AppError::validation(message),
            TrainerError::SessionNotFound => {
                json_error(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", "训练器未初始化")
            }
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}
