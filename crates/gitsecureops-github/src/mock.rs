//! In-memory [`GitHubApi`] for tests
//!
//! Holds a frozen dataset (user repositories, organization repositories,
//! search hits per repository, file contents), records every call, and can be
//! configured to fail specific calls.

use crate::models::{CodeSearchItem, CodeSearchResponse, Owner, RateLimitStatus, Repository};
use crate::{GitHubApi, GitHubError, GitHubResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One recorded upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListUserRepos {
        page: u32,
        per_page: usize,
    },
    ListOrgRepos {
        org: String,
        page: u32,
        per_page: usize,
    },
    SearchCode {
        query: String,
        per_page: usize,
    },
    GetFileContent {
        full_name: String,
        path: String,
        git_ref: Option<String>,
    },
}

type CallLog = Arc<Mutex<Vec<MockCall>>>;

/// Mock GitHub backend
#[derive(Clone, Default)]
pub struct MockGitHub {
    user_repos: Vec<Repository>,
    org_repos: HashMap<String, Vec<Repository>>,
    search_items: HashMap<String, Vec<CodeSearchItem>>,
    files: HashMap<(String, String), String>,
    org_failures: HashMap<String, GitHubError>,
    org_page_failures: HashSet<(String, u32)>,
    search_failures: HashMap<String, GitHubError>,
    content_failures: HashSet<(String, String)>,
    unauthorized: bool,
    rate_limit: Option<RateLimitStatus>,
    calls: CallLog,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repositories returned by `list_user_repos`, in order
    #[must_use]
    pub fn with_user_repos(mut self, repos: Vec<Repository>) -> Self {
        self.user_repos = repos;
        self
    }

    /// Repositories returned by `list_org_repos` for `org`, in order
    #[must_use]
    pub fn with_org_repos(mut self, org: &str, repos: Vec<Repository>) -> Self {
        self.org_repos.insert(org.to_string(), repos);
        self
    }

    /// Code search items returned for queries pinned to `full_name`
    #[must_use]
    pub fn with_search_items(mut self, full_name: &str, items: Vec<CodeSearchItem>) -> Self {
        self.search_items.insert(full_name.to_string(), items);
        self
    }

    /// Raw content served for `full_name` / `path` at any ref
    #[must_use]
    pub fn with_file(mut self, full_name: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((full_name.to_string(), path.to_string()), content.to_string());
        self
    }

    /// Every listing page for `org` fails with HTTP 404
    #[must_use]
    pub fn with_org_failure(mut self, org: &str) -> Self {
        self.org_failures.insert(
            org.to_string(),
            GitHubError::Status {
                status: 404,
                endpoint: format!("/orgs/{org}/repos"),
            },
        );
        self
    }

    /// Only listing page `page` for `org` fails (HTTP 502)
    #[must_use]
    pub fn with_org_page_failure(mut self, org: &str, page: u32) -> Self {
        self.org_page_failures.insert((org.to_string(), page));
        self
    }

    /// Searches pinned to `full_name` fail with a transport error
    #[must_use]
    pub fn with_search_failure(self, full_name: &str) -> Self {
        let error = GitHubError::Transport {
            endpoint: "/search/code".to_string(),
            message: "connection reset by peer".to_string(),
        };
        self.with_search_error(full_name, error)
    }

    /// Searches pinned to `full_name` fail with `error`
    #[must_use]
    pub fn with_search_error(mut self, full_name: &str, error: GitHubError) -> Self {
        self.search_failures.insert(full_name.to_string(), error);
        self
    }

    /// Content fetches for `full_name` / `path` fail
    #[must_use]
    pub fn with_content_failure(mut self, full_name: &str, path: &str) -> Self {
        self.content_failures
            .insert((full_name.to_string(), path.to_string()));
        self
    }

    /// Every call is rejected with HTTP 401
    #[must_use]
    pub const fn with_unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    /// Rate-limit status reported by `rate_limit()`
    #[must_use]
    pub const fn with_rate_limit(mut self, status: RateLimitStatus) -> Self {
        self.rate_limit = Some(status);
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of code search calls made so far
    pub fn search_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::SearchCode { .. }))
            .count()
    }

    /// Number of repository listing calls (user or org) made so far
    pub fn listing_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    MockCall::ListUserRepos { .. } | MockCall::ListOrgRepos { .. }
                )
            })
            .count()
    }

    fn record(&self, call: MockCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_auth(&self, endpoint: &str) -> GitHubResult<()> {
        if self.unauthorized {
            Err(GitHubError::Unauthorized {
                endpoint: endpoint.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Return 1-based page `page` of `items`
fn page_of(items: &[Repository], page: u32, per_page: usize) -> Vec<Repository> {
    let index = usize::try_from(page.saturating_sub(1)).unwrap_or(usize::MAX);
    items
        .chunks(per_page.max(1))
        .nth(index)
        .map(<[Repository]>::to_vec)
        .unwrap_or_default()
}

/// Extract the `repo:` qualifier from a qualified search query
fn pinned_repository(query: &str) -> Option<&str> {
    query
        .split_whitespace()
        .find_map(|token| token.strip_prefix("repo:"))
}

#[async_trait]
impl GitHubApi for MockGitHub {
    async fn list_user_repos(&self, page: u32, per_page: usize) -> GitHubResult<Vec<Repository>> {
        self.record(MockCall::ListUserRepos { page, per_page });
        self.check_auth("/user/repos")?;
        Ok(page_of(&self.user_repos, page, per_page))
    }

    async fn list_org_repos(
        &self,
        org: &str,
        page: u32,
        per_page: usize,
    ) -> GitHubResult<Vec<Repository>> {
        self.record(MockCall::ListOrgRepos {
            org: org.to_string(),
            page,
            per_page,
        });
        let endpoint = format!("/orgs/{org}/repos");
        self.check_auth(&endpoint)?;

        if let Some(error) = self.org_failures.get(org) {
            return Err(error.clone());
        }
        if self.org_page_failures.contains(&(org.to_string(), page)) {
            return Err(GitHubError::Status {
                status: 502,
                endpoint,
            });
        }

        let repos = self.org_repos.get(org).ok_or(GitHubError::Status {
            status: 404,
            endpoint,
        })?;
        Ok(page_of(repos, page, per_page))
    }

    async fn search_code(&self, query: &str, per_page: usize) -> GitHubResult<CodeSearchResponse> {
        self.record(MockCall::SearchCode {
            query: query.to_string(),
            per_page,
        });
        self.check_auth("/search/code")?;

        let pinned = pinned_repository(query).unwrap_or_default();
        if let Some(error) = self.search_failures.get(pinned) {
            return Err(error.clone());
        }

        let items = self.search_items.get(pinned).cloned().unwrap_or_default();
        Ok(CodeSearchResponse {
            total_count: u64::try_from(items.len()).unwrap_or(u64::MAX),
            incomplete_results: false,
            items: items.into_iter().take(per_page).collect(),
        })
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GitHubResult<String> {
        let full_name = format!("{owner}/{repo}");
        self.record(MockCall::GetFileContent {
            full_name: full_name.clone(),
            path: path.to_string(),
            git_ref: git_ref.map(str::to_string),
        });
        let endpoint = format!("/repos/{full_name}/contents/{path}");
        self.check_auth(&endpoint)?;

        // Contents only resolve branches, tags and commits
        if git_ref.is_some_and(|git_ref| git_ref != FIXTURE_COMMIT) {
            return Err(GitHubError::Status {
                status: 404,
                endpoint,
            });
        }

        let key = (full_name, path.to_string());
        if self.content_failures.contains(&key) {
            return Err(GitHubError::Timeout { endpoint });
        }

        self.files.get(&key).cloned().ok_or(GitHubError::Status {
            status: 404,
            endpoint,
        })
    }

    fn rate_limit(&self) -> Option<RateLimitStatus> {
        self.rate_limit
    }
}

/// Commit every fixture search item points at
pub const FIXTURE_COMMIT: &str = "8c3d1f0e5b7a92c4d6e1f3a5b7c9d0e2f4a6b8c1";

/// Minimal repository fixture
pub fn repository(owner: &str, name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        full_name: format!("{owner}/{name}"),
        owner: Owner {
            login: owner.to_string(),
        },
        language: None,
        updated_at: None,
        private: false,
    }
}

/// `count` repositories named `{prefix}-0001`.. owned by `owner`
pub fn repositories(owner: &str, prefix: &str, count: usize) -> Vec<Repository> {
    (1..=count)
        .map(|index| repository(owner, &format!("{prefix}-{index:04}")))
        .collect()
}

/// Code search item fixture
pub fn code_item(full_name: &str, path: &str, sha: &str, score: Option<f64>) -> CodeSearchItem {
    let (owner, name) = full_name.split_once('/').unwrap_or((full_name, ""));
    CodeSearchItem {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        sha: sha.to_string(),
        url: format!(
            "https://api.github.com/repos/{full_name}/contents/{path}?ref={FIXTURE_COMMIT}"
        ),
        html_url: format!("https://github.com/{full_name}/blob/{FIXTURE_COMMIT}/{path}"),
        repository: repository(owner, name),
        score,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pages_are_sliced_in_order() {
        let mock = MockGitHub::new().with_org_repos("acme", repositories("acme", "svc", 5));

        let second = mock.list_org_repos("acme", 2, 2).await.unwrap();
        let past_end = mock.list_org_repos("acme", 4, 2).await.unwrap();

        assert_eq!(second.len(), 2);
        assert_eq!(second[0].full_name, "acme/svc-0003");
        assert!(past_end.is_empty());
        assert_eq!(mock.listing_call_count(), 2);
    }

    #[tokio::test]
    async fn search_is_routed_by_repo_qualifier() {
        let mock = MockGitHub::new()
            .with_search_items("acme/api", vec![code_item("acme/api", "a.rs", "s1", None)])
            .with_search_failure("acme/web");

        let hits = mock.search_code("TODO repo:acme/api", 10).await.unwrap();
        let failed = mock.search_code("TODO repo:acme/web", 10).await;

        assert_eq!(hits.items.len(), 1);
        assert!(failed.is_err());
        assert_eq!(mock.search_call_count(), 2);
    }

    #[tokio::test]
    async fn content_resolves_only_at_a_commit() {
        let mock = MockGitHub::new().with_file("acme/api", "a.rs", "// TODO\n");
        let item = code_item("acme/api", "a.rs", "blob1", None);

        let at_commit = mock
            .get_file_content("acme", "api", "a.rs", item.content_ref().as_deref())
            .await;
        let at_blob = mock
            .get_file_content("acme", "api", "a.rs", Some(&item.sha))
            .await;

        assert_eq!(at_commit.unwrap(), "// TODO\n");
        assert!(matches!(at_blob, Err(GitHubError::Status { status: 404, .. })));
    }
}
