use crate::converter::ConversionError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid or incomplete request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Request body exceeds the configured upload limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Conversion capacity exhausted
    #[error("{message}")]
    TooManyRequests { message: String },

    /// The external converter failed, timed out, or could not be started
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Conversion(_) | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Full description of a server-side failure, including converter stderr where available
    pub fn details(&self) -> String {
        match self {
            Error::Conversion(e) => e.details(),
            _ => format!("Error: {self}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Conversion(_) | Error::Internal { .. } => {
                tracing::error!("Error converting markdown: {:#}", self);
            }
            Error::TooManyRequests { .. } => {
                tracing::warn!("Conversion throttled: {}", self);
            }
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        // Server failures carry the conversion failure envelope; client errors only a message
        let body = if status.is_server_error() {
            json!({
                "success": false,
                "error": self.to_string(),
                "details": self.details(),
            })
        } else {
            json!({ "error": self.to_string() })
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
