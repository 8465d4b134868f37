use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use sea_orm::DbErr;
use serde::Serialize;
use storage::StorageError;

use crate::models::envelope::{JsonResponse, encode};
use crate::repository::RepoError;

pub const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
pub const EDIT_CONFLICT_MESSAGE: &str =
    "unable to update the record due to an edit conflict, please try again";
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";
pub const RATE_LIMIT_MESSAGE: &str = "rate limit exceeded";

/// Error envelope returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    #[schema(example = "the requested resource could not be found")]
    pub error: String,
}

/// Error envelope returned when field validation fails.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ValidationErrorBody {
    /// Field name to the first validation message recorded for it.
    #[schema(example = json!({"side": "value of side must be T or CT"}))]
    pub error: BTreeMap<String, String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request: bad JSON, bad multipart, bad header.
    BadRequest(String),
    /// Field validation failed; field name to message.
    Validation(BTreeMap<String, String>),
    NotFound,
    MethodNotAllowed(Method),
    EditConflict,
    /// Rate limit exceeded. Contains seconds until retry is allowed.
    RateLimited {
        retry_after: u64,
    },
    Internal(String),
}

#[derive(Serialize)]
#[serde(untagged)]
enum ErrorPayload {
    Message(String),
    Fields(BTreeMap<String, String>),
}

impl AppError {
    fn status_and_payload(self) -> (StatusCode, ErrorPayload) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorPayload::Message(msg)),
            AppError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorPayload::Fields(fields),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorPayload::Message(NOT_FOUND_MESSAGE.into()),
            ),
            AppError::MethodNotAllowed(method) => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorPayload::Message(format!(
                    "the {method} method is not supported for this resource"
                )),
            ),
            AppError::EditConflict => (
                StatusCode::CONFLICT,
                ErrorPayload::Message(EDIT_CONFLICT_MESSAGE.into()),
            ),
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorPayload::Message(RATE_LIMIT_MESSAGE.into()),
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorPayload::Message(SERVER_ERROR_MESSAGE.into()),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = if let AppError::RateLimited { retry_after } = &self {
            Some(*retry_after)
        } else {
            None
        };

        let (status, payload) = self.status_and_payload();
        let body = encode("error", &payload).unwrap_or_else(|e| {
            tracing::error!("Failed to encode error envelope: {}", e);
            Bytes::from_static(b"{\"error\":\"internal error\"}\n")
        });

        let mut response = JsonResponse::new(status, body);
        if let Some(seconds) = retry_after {
            response = response.with_header(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response.into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound,
            RepoError::EditConflict => AppError::EditConflict,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("failed to encode response: {err}"))
    }
}
