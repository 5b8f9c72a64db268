//! Error types for salesweb-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use salesweb_core::{CoreError, ErrorCode, ErrorSeverity};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_record_level() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Core(e) => match e.code() {
                ErrorCode::InvalidFilter => StatusCode::BAD_REQUEST,
                ErrorCode::SourceError => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Log level for the response
    pub fn log_level(&self) -> log::Level {
        match self {
            ApiError::NotFound { .. } | ApiError::BadRequest { .. } => log::Level::Warn,
            ApiError::Core(e) => match e.severity() {
                ErrorSeverity::Warning => log::Level::Warn,
                ErrorSeverity::Error | ErrorSeverity::Critical => log::Level::Error,
            },
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::NotFound { .. } => json!({ "code": "NOT_FOUND", "message": self.to_string() }),
            ApiError::BadRequest { .. } => json!({ "code": "BAD_REQUEST", "message": self.to_string() }),
            ApiError::Core(e) => serde_json::to_value(e.to_details())
                .unwrap_or_else(|_| json!({ "code": e.code(), "message": e.to_string() })),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        log::log!(target: "salesweb::api", self.log_level(), "{} {}", status, self);

        (status, Json(self.body())).into_response()
    }
}

/// Helper type for API results
pub type ApiResult<T> = Result<T, ApiError>;
