//! Error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use todo_core::store::http::ErrorBody;
use todo_core::{StoreError, TodoError, TodoId};

/// Errors returned by handlers, rendered as `{ "code", "message" }`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Sign in required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    #[error("{0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Rejected { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            StoreError::Unauthorized => ApiError::Unauthenticated,
            StoreError::Forbidden(message) => ApiError::Forbidden(message),
            other => ApiError::Store(other),
        }
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::Store(e) => e.into(),
            TodoError::Unauthenticated => ApiError::Unauthenticated,
            TodoError::Forbidden(message) => ApiError::Forbidden(message),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("request failed: {}", self);
        }

        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_core::ValidationError;

    #[test]
    fn store_errors_map_to_status_codes() {
        let not_found: ApiError = StoreError::NotFound(TodoId::from("x")).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let offline: ApiError = StoreError::Unavailable("down".into()).into();
        assert_eq!(offline.status(), StatusCode::SERVICE_UNAVAILABLE);

        let forbidden: ApiError = TodoError::Forbidden("no".into()).into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err: ApiError = TodoError::Validation(ValidationError::EmptyText).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Validation error: Enter a task description");
    }
}
