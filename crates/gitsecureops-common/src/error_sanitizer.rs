//! Error sanitization utilities for security
//!
//! Upstream failures can echo request URLs, organization names or token
//! fragments. Everything that reaches an HTTP client goes through here: the
//! detail is logged with a correlation reference and the caller gets a
//! generic message carrying only that reference.

use tracing::error;

/// Sanitize an error message for external consumption
///
/// Logs the detailed error internally and returns a generic message
pub fn sanitize_error<E: std::fmt::Display>(error: E, context: &str) -> String {
    let correlation_id = uuid::Uuid::new_v4();
    error!(
        correlation_id = %correlation_id,
        error = %error,
        context = %context,
        "Internal error occurred"
    );

    format!("Operation failed (ref: {correlation_id})")
}

/// Sanitize an error with a user-friendly message
///
/// Logs the detailed error internally and returns a safe user message
pub fn sanitize_with_message<E: std::fmt::Display>(
    error: E,
    context: &str,
    user_message: &str,
) -> String {
    let correlation_id = uuid::Uuid::new_v4();
    error!(
        correlation_id = %correlation_id,
        error = %error,
        context = %context,
        "Internal error occurred"
    );

    format!("{user_message} (ref: {correlation_id})")
}
