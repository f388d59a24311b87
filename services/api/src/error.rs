//! Error taxonomy for the API service
//!
//! Every client-facing failure carries a stable `code` and a human-readable
//! message; storage and other unexpected failures are logged server-side and
//! surfaced as a generic internal error.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Unknown email or password mismatch
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No session, or the session has expired
    #[error("Unauthorized - Please log in")]
    Unauthenticated,

    /// Authenticated but not the owner or an admin
    #[error("Forbidden")]
    Forbidden,

    /// The id does not resolve
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Concurrent update could not be applied
    #[error("Conflicting update, please retry")]
    Conflict,

    /// Too many authentication attempts
    #[error("Too many attempts, try again later")]
    RateLimited,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),

    /// Internal server error
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict => "conflict",
            ApiError::RateLimited => "rate_limited",
            ApiError::Database(_) | ApiError::Internal => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Never leak internal details to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                // unique_violation: surface which field collided
                Some("23505") => {
                    let field = match db_err.constraint() {
                        Some(c) if c.contains("username") => "username",
                        Some(c) if c.contains("phone") => "phone number",
                        Some(c) if c.contains("aadhar") => "aadhar number",
                        Some(c) if c.contains("email") => "email",
                        _ => "value",
                    };
                    return ApiError::Validation(format!("{} already in use", field));
                }
                // serialization_failure / deadlock_detected
                Some("40001") | Some("40P01") => return ApiError::Conflict,
                _ => {}
            }
        }

        ApiError::Database(common::error::DatabaseError::Query(err))
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON extractor whose rejection is a 400 validation error instead of
/// axum's default 422, keeping the error body shape uniform.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}
