/// Route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, email verification, logout
/// - `tasks`: Task CRUD for the authenticated user
/// - `pages`: Server-rendered HTML pages
///
/// It also holds the extractors shared by the JSON handlers.

pub mod auth;
pub mod health;
pub mod pages;
pub mod tasks;

use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::error::Error;
use tower_http::timeout::TimeoutError;
use validator::Validate;

/// JSON body that has been deserialized and validated
///
/// Malformed JSON is a 400 `Invalid request body`; a body that parses but
/// breaks a field rule is a 400 naming the fields. A body that stalls past
/// `READ_TIMEOUT` is a 408. In every case the handler never runs.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            if is_body_timeout(&rejection) {
                tracing::info!("Request body timed out");
                return ApiError::RequestTimeout;
            }
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            ApiError::BadRequest("Invalid request body".to_string())
        })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Whether the body read was cut off by the request body timeout
fn is_body_timeout(rejection: &JsonRejection) -> bool {
    let mut source: Option<&(dyn Error + 'static)> = Some(rejection);
    while let Some(err) = source {
        if err.is::<TimeoutError>() {
            return true;
        }
        source = err.source();
    }
    false
}

/// Numeric task ID taken from the `:id` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for TaskId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| invalid_task_id())?;

        parse_task_id(&raw).map(TaskId)
    }
}

fn invalid_task_id() -> ApiError {
    ApiError::BadRequest("Invalid task ID format".to_string())
}

/// Accepts positive decimal integers only
pub fn parse_task_id(raw: &str) -> Result<i64, ApiError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid_task_id());
    }

    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(invalid_task_id()),
    }
}
