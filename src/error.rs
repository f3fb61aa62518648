//! Error types and handling for `TrafficLens`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the `TrafficLens` service
#[derive(Error, Debug)]
pub enum TrafficLensError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The inbound request could not be understood
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// An Azure Maps call failed, returned a non-2xx status or unreadable JSON
    #[error("Upstream error from {endpoint}: {message}")]
    Upstream {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    /// The request body was larger than the configured limit
    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    /// The whole request ran past the server's request timeout
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TrafficLensError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a new upstream error
    pub fn upstream<E: Into<String>, S: Into<String>>(
        endpoint: E,
        status: Option<u16>,
        message: S,
    ) -> Self {
        Self::Upstream {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Short machine-readable classification used in error bodies
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TrafficLensError::Config { .. } => "config",
            TrafficLensError::InvalidRequest { .. } => "invalid_request",
            TrafficLensError::Upstream { .. } => "upstream",
            TrafficLensError::PayloadTooLarge { .. } => "payload_too_large",
            TrafficLensError::Timeout { .. } => "timeout",
            TrafficLensError::Io { .. } => "io",
        }
    }

    /// HTTP status reported to the caller
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrafficLensError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            TrafficLensError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            TrafficLensError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            TrafficLensError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            TrafficLensError::Config { .. } | TrafficLensError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TrafficLensError::Config { .. } => {
                "Service is misconfigured. Please contact the operator.".to_string()
            }
            TrafficLensError::InvalidRequest { message } => format!("Invalid request: {message}"),
            TrafficLensError::Upstream {
                endpoint,
                status: Some(status),
                message,
            } => format!("Azure Maps {endpoint} failed with status {status}: {message}"),
            TrafficLensError::Upstream {
                endpoint, message, ..
            } => format!("Azure Maps {endpoint} failed: {message}"),
            TrafficLensError::PayloadTooLarge { message } => {
                format!("Request body too large: {message}")
            }
            TrafficLensError::Timeout { seconds } => {
                format!("Azure Maps did not answer within {seconds} seconds. Please retry later.")
            }
            TrafficLensError::Io { .. } => "Internal I/O failure.".to_string(),
        }
    }
}

/// JSON error envelope: `{"error": {...}}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorBody {
    pub fn new<S: Into<String>>(kind: &'static str, message: S) -> Self {
        Self {
            error: ErrorDetail {
                kind,
                message: message.into(),
                endpoint: None,
                status: None,
            },
        }
    }
}

impl From<&TrafficLensError> for ErrorBody {
    fn from(err: &TrafficLensError) -> Self {
        let mut body = ErrorBody::new(err.kind(), err.user_message());
        if let TrafficLensError::Upstream {
            endpoint, status, ..
        } = err
        {
            body.error.endpoint = Some(endpoint.clone());
            body.error.status = *status;
        }
        body
    }
}

impl IntoResponse for TrafficLensError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {self}");
        } else {
            tracing::warn!(kind = self.kind(), "request rejected: {self}");
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}
