use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::inference::InferenceError;

/// Request-level failures. Rendered as the JSON envelope
/// `{ "error": ..., "success": false }` by the API handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Database or inference failure. `message` is what the caller sees,
    /// `source` is only logged.
    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Replaces the public message of an upstream failure. Client errors
    /// keep their own message.
    pub fn upstream_message(self, message: &str) -> Self {
        match self {
            AppError::Upstream { source, .. } => {
                AppError::Upstream { message: message.to_string(), source }
            },
            other => other,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Upstream { message: "A database error occurred".to_string(), source: err.into() }
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        Self::Upstream { message: "The recommendation service failed".to_string(), source: err.into() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Upstream { message: "An internal error occurred".to_string(), source: err }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Upstream { message, source } = &self {
            tracing::error!(error = ?source, "{message}");
        }
        let body = Json(json!({ "error": self.to_string(), "success": false }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Attaches a route-specific public message to upstream failures.
pub trait UpstreamContext<T> {
    fn upstream(self, message: &str) -> AppResult<T>;
}

impl<T, E: Into<AppError>> UpstreamContext<T> for Result<T, E> {
    fn upstream(self, message: &str) -> AppResult<T> {
        self.map_err(|err| err.into().upstream_message(message))
    }
}

/// Failure inside a server-rendered page: same taxonomy, HTML body.
#[derive(Debug)]
pub struct PageError(AppError);

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for PageError {}

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<sea_orm::DbErr> for PageError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self(err.into())
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if let AppError::Upstream { message, source } = &self.0 {
            tracing::error!(error = ?source, "{message}");
        }
        let body = crate::templates::error_page(self.0.to_string());
        (status, Html(body)).into_response()
    }
}

pub type PageResult<T> = Result<T, PageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_only_rewrites_upstream_failures() {
        let err = AppError::from(anyhow::anyhow!("disk on fire")).upstream_message("Failed to fetch movies");
        assert_eq!(err.to_string(), "Failed to fetch movies");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::not_found("User not found").upstream_message("Failed to fetch movies");
        assert_eq!(err.to_string(), "User not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
