/// Error taxonomy and the JSON failure envelope
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required environment variable: {0}")]
    MissingConfiguration(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidConfiguration { key: String, value: String },

    #[error("Failed to authenticate with TDX API (status {status}): {body}")]
    Authentication { status: u16, body: String },

    #[error("Failed to fetch data (status {status}): {body}")]
    DataFetch { status: u16, body: String },

    #[error("External API error: {0}")]
    ExternalApi(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error("Cache format error: {0}")]
    CacheFormat(#[from] csv::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// Stable machine-readable code used in the JSON envelope
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingConfiguration(_) => "MISSING_CONFIGURATION",
            ApiError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            ApiError::Authentication { .. } => "AUTHENTICATION_FAILED",
            ApiError::DataFetch { status, .. } => match status {
                403 => "UPSTREAM_403",
                404 => "UPSTREAM_404",
                429 => "UPSTREAM_429",
                500..=599 => "UPSTREAM_5XX",
                _ => "UPSTREAM_ERROR",
            },
            ApiError::ExternalApi(_) => "UPSTREAM_UNREACHABLE",
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::CacheIo(_) | ApiError::CacheFormat(_) => "CACHE_ERROR",
            ApiError::Notification(_) => "NOTIFICATION_ERROR",
            ApiError::Task(_) => "INTERNAL_ERROR",
        }
    }

    fn upstream_status(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { status, .. } | ApiError::DataFetch { status, .. } => {
                Some(*status)
            }
            ApiError::ExternalApi(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<lettre::error::Error> for ApiError {
    fn from(err: lettre::error::Error) -> Self {
        ApiError::Notification(err.to_string())
    }
}

impl From<lettre::address::AddressError> for ApiError {
    fn from(err: lettre::address::AddressError) -> Self {
        ApiError::Notification(format!("invalid mailbox: {}", err))
    }
}

impl From<lettre::transport::smtp::Error> for ApiError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        ApiError::Notification(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                status: self.upstream_status(),
            },
        };

        // Dashboards render the envelope, so failures still answer 200
        (StatusCode::OK, Json(error_response)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
