use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::services::{RenderError, TranslationError};
use crate::infrastructure::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Translation(TranslationError),

    #[error("ERR unknown command '{0}'")]
    BlockedCommand(String),

    #[error("CORS: origin not allowed")]
    OriginNotAllowed,

    #[error("(error) {0}")]
    StoreCommand(String),

    #[error("unexpected reply from store: {0}")]
    StoreProtocol(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("could not render reply: {0}")]
    Render(#[from] RenderError),

    #[error("429 - Too Many Requests")]
    RateLimited,

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Translation(_) => "INVALID_COMMAND",
            Self::BlockedCommand(_) => "BLOCKED_COMMAND",
            Self::OriginNotAllowed => "ORIGIN_NOT_ALLOWED",
            Self::StoreCommand(_) => "STORE_COMMAND_ERROR",
            Self::StoreProtocol(_) => "STORE_PROTOCOL_ERROR",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Render(_) => "RENDER_ERROR",
            Self::RateLimited => "RATE_LIMIT_EXCEEDED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Translation(_) | Self::StoreCommand(_) => StatusCode::BAD_REQUEST,
            Self::BlockedCommand(_) | Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::StoreProtocol(_) => StatusCode::BAD_GATEWAY,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Render(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Render(_)
            | AppError::Internal(_)
            | AppError::StoreProtocol(_)
            | AppError::StoreUnavailable(_) => {
                tracing::error!(error = ?self, code = self.error_code(), "Request failed");
            },
            _ => {
                tracing::debug!(error = ?self, code = self.error_code(), "Client error occurred");
            },
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<TranslationError> for AppError {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::Blocked(command) => AppError::BlockedCommand(command),
            other => AppError::Translation(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Command(message) => AppError::StoreCommand(message),
            StoreError::Protocol(message) => AppError::StoreProtocol(message),
            unavailable @ (StoreError::Unavailable(_) | StoreError::Timeout(_)) => {
                AppError::StoreUnavailable(unavailable.to_string())
            },
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
