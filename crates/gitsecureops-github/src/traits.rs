//! Upstream API abstraction
//!
//! The aggregator only ever talks to GitHub through this trait, so tests can
//! swap in an in-memory implementation.

use crate::GitHubResult;
use crate::models::{CodeSearchResponse, RateLimitStatus, Repository};
use async_trait::async_trait;

/// Calls the aggregator makes against GitHub
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `GET /user/repos` for the authenticated user, most recently updated first
    ///
    /// `page` is 1-based.
    async fn list_user_repos(&self, page: u32, per_page: usize) -> GitHubResult<Vec<Repository>>;

    /// `GET /orgs/{org}/repos` including private repositories visible to the caller
    async fn list_org_repos(
        &self,
        org: &str,
        page: u32,
        per_page: usize,
    ) -> GitHubResult<Vec<Repository>>;

    /// `GET /search/code` with an already qualified query
    async fn search_code(&self, query: &str, per_page: usize) -> GitHubResult<CodeSearchResponse>;

    /// Raw file content at a branch, tag or commit; the default branch when `None`
    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GitHubResult<String>;

    /// Rate-limit headers from the most recent code search response, if any
    fn rate_limit(&self) -> Option<RateLimitStatus>;
}
