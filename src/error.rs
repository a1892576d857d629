use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::pool::PoolError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server busy: {0}")]
    Busy(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("TTS generation failed: {0}")]
    TtsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted { .. } => AppError::Busy(err.to_string()),
            PoolError::NotServing { .. } | PoolError::NoWorkers { .. } => {
                AppError::Unavailable(err.to_string())
            }
            PoolError::InvalidState { .. } | PoolError::InvalidConfig(_) => {
                AppError::TtsError(err.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::VoiceNotFound(v) => (
                StatusCode::NOT_FOUND,
                "VOICE_NOT_FOUND",
                format!("Voice '{}' not found", v),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Busy(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "POOL_EXHAUSTED",
                msg.clone(),
            ),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::TtsError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TTS_ERROR",
                msg.clone(),
            ),
            AppError::IoError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                e.to_string(),
            ),
            AppError::JsonError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "JSON_ERROR",
                e.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {} - {}", code, message);
        } else {
            tracing::warn!("Request rejected: {} - {}", code, message);
        }

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}
