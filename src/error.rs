use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::forms::FormErrors;
use crate::settings::SettingsError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-field messages of a rejected form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FormErrors>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            fields: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(error)
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Core not found: {0}")]
    CoreNotFound(String),

    #[error("Missing or invalid admin key")]
    Unauthorized,

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Form validation failed")]
    Validation(FormErrors),

    #[error("Search engine error: {0:#}")]
    SearchEngine(anyhow::Error),

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error("Failed to render fragment: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::CoreNotFound(name) => {
                tracing::warn!(core = %name, "Core not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Core not found", format!("Core: {}", name)),
                )
            }
            ApiError::Unauthorized => {
                tracing::warn!("Unauthorized admin request - invalid or missing admin key");
                (StatusCode::UNAUTHORIZED, ErrorResponse::new("Unauthorized"))
            }
            ApiError::Settings(err) => {
                tracing::warn!(field = %err.field, error = %err, "Rejected settings update");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Invalid settings", err.to_string()),
                )
            }
            ApiError::Validation(fields) => {
                tracing::debug!(fields = ?fields.keys().collect::<Vec<_>>(), "Form validation failed");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse {
                        fields: Some(fields.clone()),
                        ..ErrorResponse::new("Validation failed")
                    },
                )
            }
            ApiError::SearchEngine(err) => {
                tracing::error!(error = %format!("{:#}", err), "Search engine request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_details("Search engine error", format!("{:#}", err)),
                )
            }
            ApiError::Storage(err) => {
                tracing::error!(error = %format!("{:#}", err), "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Internal server error", format!("{:#}", err)),
                )
            }
            ApiError::Render(err) => {
                tracing::error!(error = %err, "Fragment rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Internal server error", err.to_string()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
