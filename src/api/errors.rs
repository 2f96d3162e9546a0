use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::backend::BackendError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    /// Translate a backend failure. Client errors keep the backend's message; anything the
    /// caller cannot fix becomes 503 with `context` as the detail.
    pub(crate) fn backend(err: BackendError, context: &str) -> Self {
        match &err {
            BackendError::Status { status: 404, message } => Self::NotFound(message.clone()),
            BackendError::Status { status: 400 | 422, message } => {
                Self::BadRequest(message.clone())
            }
            BackendError::Status { status: 409, message } => Self::Conflict(message.clone()),
            _ => {
                tracing::error!(error = %err, "{context}");
                Self::ServiceUnavailable(context.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        Self::BadRequest(messages.join("; "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}
