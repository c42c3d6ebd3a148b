//! Error types for upstream GitHub calls

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for GitHub operations
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Errors that can occur while talking to the GitHub API
///
/// Every variant carries the endpoint path (without query string) so callers
/// can log which call failed without leaking the token-bearing request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitHubError {
    /// Credentials were rejected (HTTP 401)
    #[error("GitHub rejected the credentials for {endpoint}")]
    Unauthorized { endpoint: String },

    /// Primary or secondary rate limit exhausted
    #[error("GitHub rate limit exceeded for {endpoint}")]
    RateLimited {
        endpoint: String,
        reset_at: Option<DateTime<Utc>>,
    },

    /// Any other non-2xx response
    #[error("GitHub returned HTTP {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    /// Per-call timeout elapsed
    #[error("GitHub request timed out: {endpoint}")]
    Timeout { endpoint: String },

    /// Connection, TLS or protocol failure
    #[error("GitHub transport error for {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// Response body did not match the expected shape
    #[error("Malformed GitHub response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// HTTP client could not be constructed
    #[error("GitHub client configuration error: {0}")]
    Client(String),
}

impl GitHubError {
    /// Whether the upstream rejected the caller's credentials
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Endpoint the failing call targeted, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { endpoint }
            | Self::RateLimited { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Timeout { endpoint }
            | Self::Transport { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(endpoint),
            Self::Client(_) => None,
        }
    }

    pub(crate) fn from_reqwest(error: &reqwest::Error, endpoint: &str) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if error.is_decode() {
            Self::Decode {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        } else {
            Self::Transport {
                endpoint: endpoint.to_string(),
                // Strip the URL: it may carry query text typed by the caller
                message: redact_url(error),
            }
        }
    }
}

fn redact_url(error: &reqwest::Error) -> String {
    let message = error.to_string();
    match error.url() {
        Some(url) => message.replace(url.as_str(), "<url>"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unauthorized_is_an_auth_failure() {
        let unauthorized = GitHubError::Unauthorized {
            endpoint: "/user/repos".into(),
        };
        let forbidden = GitHubError::Status {
            status: 403,
            endpoint: "/user/repos".into(),
        };

        assert!(unauthorized.is_auth_failure());
        assert!(!forbidden.is_auth_failure());
        assert_eq!(forbidden.endpoint(), Some("/user/repos"));
    }
}
