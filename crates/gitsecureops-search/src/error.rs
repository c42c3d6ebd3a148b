use gitsecureops_github::GitHubError;
use thiserror::Error;

/// Search-specific error types
///
/// Only `InvalidRequest`, `UpstreamFatal` and `Cancelled` ever fail a whole
/// search. The per-unit variants are logged and degraded at the unit boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid search request: {message}")]
    InvalidRequest { message: String },

    #[error("GitHub rejected the supplied credentials")]
    UpstreamFatal {
        #[source]
        source: GitHubError,
    },

    #[error("Failed to list repositories for organization '{organization}'")]
    ScopeResolution {
        organization: String,
        #[source]
        source: GitHubError,
    },

    #[error("Code search failed for repository '{repository}'")]
    RepositorySearch {
        repository: String,
        #[source]
        source: GitHubError,
    },

    #[error("Content unavailable for '{path}' in '{repository}'")]
    FileContentUnavailable {
        repository: String,
        path: String,
        #[source]
        source: GitHubError,
    },

    #[error("Illegal search phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Search cancelled")]
    Cancelled,
}

impl SearchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether this error is the caller's fault (bad query, bad scope)
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}
