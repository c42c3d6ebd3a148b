//! Structured API error handling for the GitSecureOps API.
//!
//! Every error carries the request's correlation id. The id is echoed in the
//! `X-Correlation-ID` header and in the JSON body so a caller can quote it
//! when reporting a problem. Internal details never reach the body: anything
//! that is not the caller's fault goes through
//! [`gitsecureops_common::error_sanitizer`].
//!
//! # Usage
//!
//! ```rust
//! use gitsecureops_api::{ApiError, ApiResult};
//! use gitsecureops_common::CorrelationId;
//!
//! fn require_query(query: &str) -> ApiResult<()> {
//!     if query.trim().is_empty() {
//!         return Err(ApiError::invalid_request(
//!             "Query parameter 'q' is required",
//!             CorrelationId::new(),
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gitsecureops_common::CorrelationId;
use gitsecureops_common::error_sanitizer::sanitize_with_message;
use gitsecureops_search::SearchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Header carrying the correlation id in both directions
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// API error types with correlation ids for request tracking
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is malformed or misses a required field.
    #[error("{message}")]
    InvalidRequest {
        message: String,
        correlation_id: CorrelationId,
    },

    /// No usable `Authorization` header was supplied.
    #[error("A GitHub token is required in the Authorization header")]
    MissingCredentials { correlation_id: CorrelationId },

    /// GitHub rejected the forwarded token on the first call.
    #[error("GitHub rejected the supplied credentials")]
    UpstreamUnauthorized { correlation_id: CorrelationId },

    /// The search did not finish within the configured request timeout.
    #[error("Search did not finish within {}s", timeout_duration.as_secs())]
    SearchTimeout {
        timeout_duration: Duration,
        correlation_id: CorrelationId,
    },

    /// The search stopped before producing a result.
    #[error("Search was interrupted before completion")]
    SearchInterrupted { correlation_id: CorrelationId },

    /// Unexpected failure; `message` is already sanitized.
    #[error("{message}")]
    InternalServerError {
        message: String,
        correlation_id: CorrelationId,
    },
}

/// Error body sent to API clients
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Machine readable error code
    pub error: String,
    /// Human readable message
    pub message: String,
    /// Correlation id for support requests
    #[schema(value_type = String)]
    pub correlation_id: CorrelationId,
    /// Seconds to wait before retrying, for transient errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            correlation_id,
        }
    }

    /// Map a failed search onto the HTTP error the caller sees
    pub fn from_search_error(error: SearchError, correlation_id: CorrelationId) -> Self {
        match error {
            SearchError::InvalidRequest { message } => Self::InvalidRequest {
                message,
                correlation_id,
            },
            SearchError::UpstreamFatal { .. } => Self::UpstreamUnauthorized { correlation_id },
            SearchError::Cancelled => Self::SearchInterrupted { correlation_id },
            other => Self::InternalServerError {
                message: sanitize_with_message(&other, "search", "Search failed"),
                correlation_id,
            },
        }
    }

    pub const fn correlation_id(&self) -> &CorrelationId {
        match self {
            Self::InvalidRequest { correlation_id, .. }
            | Self::MissingCredentials { correlation_id }
            | Self::UpstreamUnauthorized { correlation_id }
            | Self::SearchTimeout { correlation_id, .. }
            | Self::SearchInterrupted { correlation_id }
            | Self::InternalServerError { correlation_id, .. } => correlation_id,
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::MissingCredentials { .. } | Self::UpstreamUnauthorized { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::SearchTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::SearchInterrupted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::MissingCredentials { .. } => "MISSING_CREDENTIALS",
            Self::UpstreamUnauthorized { .. } => "UPSTREAM_UNAUTHORIZED",
            Self::SearchTimeout { .. } => "SEARCH_TIMEOUT",
            Self::SearchInterrupted { .. } => "SEARCH_INTERRUPTED",
            Self::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::SearchTimeout { .. } => Some(60),
            Self::SearchInterrupted { .. } => Some(5),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let correlation_id = self.correlation_id().clone();

        if status.is_server_error() {
            error!(correlation_id = %correlation_id, error = %self, "Request failed");
        } else {
            warn!(correlation_id = %correlation_id, error = %self, "Request rejected");
        }

        let body = ApiErrorResponse {
            success: false,
            error: self.error_code().to_string(),
            message: self.to_string(),
            correlation_id: correlation_id.clone(),
            retry_after: self.retry_after(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Ok(header_value) = correlation_id.to_string().parse() {
            response
                .headers_mut()
                .insert(CORRELATION_ID_HEADER, header_value);
        }
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
