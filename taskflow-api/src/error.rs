/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which converts to the right
/// status code and a `{"error": "..."}` body.
///
/// # Example
///
/// ```
/// use taskflow_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Task not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use taskflow_shared::auth::jwt::JwtError;
use taskflow_shared::auth::password::PasswordError;
use taskflow_shared::models::UserStoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned for every internal failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Input failed validation (400), message lists the offending fields
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Login on an account whose email is not verified yet (403)
    #[error("Email not verified: {email}")]
    EmailNotVerified { email: String },

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request body did not arrive within `READ_TIMEOUT` (408)
    #[error("Request timeout")]
    RequestTimeout,

    /// Conflict (409) - e.g., verified email already registered
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many requests (429)
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        retry_after: u64,
        message: String,
    },

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Service unavailable (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Present only when login is refused for an unverified email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::EmailNotVerified { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Handle rate limit separately to add Retry-After header
        if let ApiError::RateLimitExceeded { retry_after, message } = self {
            let body = Json(ErrorResponse {
                error: message,
                email: None,
            });

            let mut response = (status, body).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.max(1)));
            return response;
        }

        let (message, email) = match self {
            ApiError::EmailNotVerified { email } => (
                "Email not verified".to_string(),
                Some(email),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                (INTERNAL_ERROR_MESSAGE.to_string(), None)
            }
            ApiError::RequestTimeout => ("Request timeout".to_string(), None),
            ApiError::BadRequest(msg)
            | ApiError::Validation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::RateLimitExceeded { message: msg, .. }
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        (status, Json(ErrorResponse { error: message, email })).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::InternalError(format!("Database error: {}", err))
    }
}

/// Convert user store errors to API errors
impl From<UserStoreError> for ApiError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::AlreadyExists => ApiError::Conflict("Email already registered".to_string()),
            UserStoreError::Database(e) => e.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Token issuance is the only JWT path that reaches a handler
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken => ApiError::Unauthorized("Unauthorized".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(format!("Token creation failed: {}", msg)),
        }
    }
}

/// Convert template errors to API errors
impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        ApiError::InternalError(format!("Template rendering failed: {}", err))
    }
}

/// Convert validator errors into a single deterministic message
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                (field.to_string(), message)
            })
            .collect();
        fields.sort();

        let message = fields
            .into_iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::Validation(message)
    }
}

/// Blocking pool failures (hashing runs there)
impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::InternalError(format!("Background task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[tokio::test]
    async fn test_body_is_single_error_field() {
        let response = ApiError::NotFound("Task not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, serde_json::json!({ "error": "Task not found" }));
    }

    #[tokio::test]
    async fn test_email_not_verified_carries_email() {
        let response = ApiError::EmailNotVerified {
            email: "ada@example.com".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["email"], "ada@example.com");
        assert!(body["error"].as_str().unwrap().contains("not verified"));
    }

    #[tokio::test]
    async fn test_internal_error_is_hidden() {
        let response = ApiError::InternalError("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let response = ApiError::RateLimitExceeded {
            retry_after: 1,
            message: "Too many requests. Please slow down.".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[test]
    fn test_user_store_conflict() {
        let err: ApiError = UserStoreError::AlreadyExists.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 6, message = "too short"))]
        password: String,
        #[validate(email(message = "not an email"))]
        email: String,
    }

    #[test]
    fn test_validation_message_is_sorted_by_field() {
        let errors = Sample {
            password: "abc".to_string(),
            email: "nope".to_string(),
        }
        .validate()
        .unwrap_err();

        let err: ApiError = errors.into();
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "email: not an email; password: too short"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
