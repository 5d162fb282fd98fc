use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use eventtail_log::LogError;
use eventtail_types::ErrorBody;

/// Request-level failures, rendered as a JSON `{ "error": ... }` body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Log(#[from] LogError),

    #[error("invalid offset: {0}")]
    InvalidOffset(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Log(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidOffset(_) | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
