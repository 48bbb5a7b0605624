use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use nexgen_auth::{AuthzError, JwtError, PasswordError};
use nexgen_core::DomainError;
use nexgen_infra::StoreError;

/// Handler-level error; every variant renders as `{"error", "message"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, try again later")]
    TooManyRequests,

    /// Details are logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn credentials() -> Self {
        ApiError::Unauthorized("Could not validate credentials".into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => {
                let mut res = json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg);
                res.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                res
            }
            ApiError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            ApiError::TooManyRequests => json_error(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests, try again later",
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // Duplicate email/name is a client mistake, not a state conflict.
            StoreError::Conflict(msg) => ApiError::BadRequest(msg),
            StoreError::MissingReference(msg) => ApiError::NotFound(msg),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ApiError::BadRequest(msg),
            DomainError::InvariantViolation(msg) => ApiError::Conflict(msg),
            DomainError::NotFound => ApiError::NotFound("not found".into()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InactiveUser => ApiError::BadRequest(err.to_string()),
            AuthzError::SuperadminRequired
            | AuthzError::AccessDenied { .. }
            | AuthzError::MissingModulePermission { .. } => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Encoding(msg) => ApiError::Internal(msg),
            _ => ApiError::credentials(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
