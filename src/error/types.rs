use std::fmt;
use axum::{extract::rejection::QueryRejection, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::database::StoreError;
use crate::services::{IngestError, QueryError};
use crate::utils::Interrupted;

#[derive(Debug, Clone)]
pub enum AppError {
    DatabaseError(String),
    ConfigError(String),
    ValidationError(String),
    NotFound(String),
    RateLimitError(String),
    UpstreamError(String),
    PersistenceError(String),
    Canceled,
    DeadlineExceeded,
    InternalError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitError(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Canceled => StatusCode::REQUEST_TIMEOUT,
            AppError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::PersistenceError(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::RateLimitError(msg) => write!(f, "Rate limit error: {}", msg),
            AppError::UpstreamError(msg) => write!(f, "Upstream error: {}", msg),
            AppError::PersistenceError(msg) => write!(f, "Persistence error: {}", msg),
            AppError::Canceled => write!(f, "Request canceled"),
            AppError::DeadlineExceeded => write!(f, "Deadline exceeded"),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::InternalError(format!("Prometheus metrics error: {}", err))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<Interrupted> for AppError {
    fn from(err: Interrupted) -> Self {
        match err {
            Interrupted::Canceled => AppError::Canceled,
            Interrupted::DeadlineExceeded => AppError::DeadlineExceeded,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPoint(msg) => AppError::ValidationError(msg),
            StoreError::Database(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::RateLimited { .. } => AppError::RateLimitError(err.to_string()),
            IngestError::UpstreamUnavailable { .. } => AppError::UpstreamError(err.to_string()),
            IngestError::PersistFailure { .. } => AppError::PersistenceError(err.to_string()),
            IngestError::Canceled => AppError::Canceled,
            IngestError::DeadlineExceeded => AppError::DeadlineExceeded,
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound { .. } => AppError::NotFound(err.to_string()),
            QueryError::Invalid(msg) => AppError::ValidationError(msg),
            QueryError::Store(e) => e.into(),
            QueryError::Canceled => AppError::Canceled,
            QueryError::DeadlineExceeded => AppError::DeadlineExceeded,
        }
    }
}
