//! Upstream call accounting for one search request

use crate::error::SearchError;
use gitsecureops_github::GitHubError;

/// Counts upstream calls so the first one can be told apart
///
/// A credential rejection on the very first call fails the request; later
/// rejections degrade like any other unit failure.
#[derive(Debug, Default)]
pub struct CallLedger {
    calls: usize,
}

impl CallLedger {
    pub const fn new() -> Self {
        Self { calls: 0 }
    }

    /// Record a call; returns `true` if it was the first of the request
    pub const fn record(&mut self) -> bool {
        let first = self.calls == 0;
        self.calls = self.calls.saturating_add(1);
        first
    }

    pub const fn calls(&self) -> usize {
        self.calls
    }

    /// Promote a first-call credential rejection to `UpstreamFatal`
    pub(crate) fn fatal(first_call: bool, error: &GitHubError) -> Option<SearchError> {
        (first_call && error.is_auth_failure()).then(|| SearchError::UpstreamFatal {
            source: error.clone(),
        })
    }
}
