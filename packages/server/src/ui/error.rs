//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::StoreError,
    infrastructure::dto::http::ErrorResponseDto,
    usecase::{AuthError, ConnectError},
};

/// Error returned by HTTP handlers, rendered as `{"status": .., "error": ..}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::Unauthorized(message) | ApiError::Conflict(message) => message,
            ApiError::Internal(message) => {
                tracing::error!("Internal server error: {}", message);
                "internal server error".to_string()
            }
        };

        let body = ErrorResponseDto {
            status: status.as_u16(),
            error,
        };
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::Repository(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ConnectError> for ApiError {
    fn from(e: ConnectError) -> Self {
        match e {
            ConnectError::AlreadyConnected(_) => ApiError::Conflict(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
