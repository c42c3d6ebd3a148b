//! Shared test utilities for all GitSecureOps integration tests
//!
//! Provides a persistent Tokio runtime shared across integration tests in all
//! crates, plus [`FakeGitHub`]: a `wiremock` server that answers the GitHub
//! endpoints the aggregator calls.
//!
//! ## Usage
//!
//! In your test crate's `Cargo.toml`:
//! ```toml
//! [dev-dependencies]
//! gitsecureops-test-utils = { path = "../gitsecureops-test-utils" }
//! ```
//!
//! In your tests:
//! ```no_run
//! #[test]
//! fn my_integration_test() {
//!     gitsecureops_test_utils::get_test_runtime().block_on(async {
//!         let github = gitsecureops_test_utils::FakeGitHub::start().await;
//!         github.mount_org_repos("acme", 3).await;
//!         // ... point a client at github.config() ...
//!     })
//! }
//! ```

use gitsecureops_config::GitHubConfig;
use serde_json::{Value, json};
use std::sync::OnceLock;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Shared Tokio runtime for integration tests across all crates
///
/// Keeps spawned tasks (SSE producers, wiremock servers) alive past the end of
/// the test body that started them.
static TEST_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Get the shared test runtime (creates on first call, reuses thereafter)
///
/// Workers default to the CPU count; override with `TEST_RUNTIME_WORKERS`.
///
/// # Panics
/// Panics if the runtime cannot be created
#[allow(clippy::expect_used)] // Test infrastructure - panic on init failure is acceptable
pub fn get_test_runtime() -> &'static tokio::runtime::Runtime {
    TEST_RUNTIME.get_or_init(|| {
        let workers = std::env::var("TEST_RUNTIME_WORKERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(std::num::NonZero::get)
                    .unwrap_or(4)
            });

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("test-runtime")
            .worker_threads(workers)
            .build()
            .expect("Failed to create test runtime")
    })
}

/// Page size the fake serves; matches the resolver default
pub const FAKE_PAGE_SIZE: usize = 100;

/// Repository JSON as returned by the listing endpoints
pub fn repo_json(owner: &str, name: &str) -> Value {
    json!({
        "id": 1,
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "owner": { "login": owner, "id": 1, "type": "Organization" },
        "private": false,
        "language": "Rust",
        "updated_at": "2024-05-01T12:00:00Z",
        "html_url": format!("https://github.com/{owner}/{name}")
    })
}

/// Commit every fixture search item points at
pub const FIXTURE_COMMIT: &str = "8c3d1f0e5b7a92c4d6e1f3a5b7c9d0e2f4a6b8c1";

/// Code search item JSON
pub fn code_item_json(full_name: &str, file_path: &str, sha: &str, score: Option<f64>) -> Value {
    let (owner, name) = full_name.split_once('/').unwrap_or((full_name, ""));
    let mut item = json!({
        "name": file_path.rsplit('/').next().unwrap_or(file_path),
        "path": file_path,
        "sha": sha,
        "url": format!(
            "https://api.github.com/repos/{full_name}/contents/{file_path}?ref={FIXTURE_COMMIT}"
        ),
        "html_url": format!("https://github.com/{full_name}/blob/{FIXTURE_COMMIT}/{file_path}"),
        "repository": {
            "id": 1,
            "name": name,
            "full_name": full_name,
            "owner": { "login": owner, "id": 1 },
            "private": false
        }
    });
    if let (Some(score), Some(object)) = (score, item.as_object_mut()) {
        object.insert("score".to_string(), json!(score));
    }
    item
}

/// Matches when query parameter `key` contains `fragment`
struct QueryParamContains {
    key: &'static str,
    fragment: String,
}

impl Match for QueryParamContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(key, value)| key == self.key && value.contains(&self.fragment))
    }
}

/// Headers GitHub sends on every response
fn rate_limit_headers(template: ResponseTemplate, remaining: u32, reset: i64) -> ResponseTemplate {
    template
        .insert_header("x-ratelimit-limit", "30")
        .insert_header("x-ratelimit-remaining", remaining.to_string().as_str())
        .insert_header("x-ratelimit-reset", reset.to_string().as_str())
}

/// `wiremock` server answering as GitHub
pub struct FakeGitHub {
    server: MockServer,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Client configuration pointing at this server
    pub fn config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.uri(),
            list_timeout_seconds: 5,
            search_timeout_seconds: 5,
            content_timeout_seconds: 5,
            connect_timeout_seconds: 5,
            ..GitHubConfig::default()
        }
    }

    /// Requests received so far
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Received requests whose path equals `request_path`
    pub async fn requests_to(&self, request_path: &str) -> Vec<Request> {
        self.received_requests()
            .await
            .into_iter()
            .filter(|request| request.url.path() == request_path)
            .collect()
    }

    /// Serve `total` repositories for `org` in pages of [`FAKE_PAGE_SIZE`]
    pub async fn mount_org_repos(&self, org: &str, total: usize) {
        let repos: Vec<Value> = (1..=total)
            .map(|index| repo_json(org, &format!("repo-{index:04}")))
            .collect();
        self.mount_pages(&format!("/orgs/{org}/repos"), &repos).await;
    }

    /// Serve `total` repositories for the authenticated user
    pub async fn mount_user_repos(&self, owner: &str, total: usize) {
        let repos: Vec<Value> = (1..=total)
            .map(|index| repo_json(owner, &format!("project-{index:04}")))
            .collect();
        self.mount_pages("/user/repos", &repos).await;
    }

    async fn mount_pages(&self, listing_path: &str, repos: &[Value]) {
        let pages: Vec<&[Value]> = repos.chunks(FAKE_PAGE_SIZE).collect();
        let page_count = pages.len();

        for (index, page) in pages.into_iter().enumerate() {
            Mock::given(method("GET"))
                .and(path(listing_path))
                .and(query_param("page", (index + 1).to_string().as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(page.to_vec()))
                .mount(&self.server)
                .await;
        }

        // Anything past the last page is empty
        Mock::given(method("GET"))
            .and(path(listing_path))
            .and(query_param("page", (page_count + 1).to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Value>::new()))
            .mount(&self.server)
            .await;
    }

    /// Listing for `org` fails with `status`
    pub async fn mount_org_failure(&self, org: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/orgs/{org}/repos")))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "message": "Not Found" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Code search pinned to `full_name` returns `items`
    pub async fn mount_search(&self, full_name: &str, items: Vec<Value>) {
        self.mount_search_with_rate_limit(full_name, items, 29, 0).await;
    }

    /// Same as [`Self::mount_search`] with explicit rate-limit headers
    pub async fn mount_search_with_rate_limit(
        &self,
        full_name: &str,
        items: Vec<Value>,
        remaining: u32,
        reset: i64,
    ) {
        let body = json!({
            "total_count": items.len(),
            "incomplete_results": false,
            "items": items
        });

        Mock::given(method("GET"))
            .and(path("/search/code"))
            .and(QueryParamContains {
                key: "q",
                fragment: format!("repo:{full_name}"),
            })
            .respond_with(rate_limit_headers(
                ResponseTemplate::new(200).set_body_json(body),
                remaining,
                reset,
            ))
            .mount(&self.server)
            .await;
    }

    /// Any code search without a more specific mock finds nothing
    pub async fn mount_empty_search(&self) {
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .respond_with(rate_limit_headers(
                ResponseTemplate::new(200).set_body_json(json!({
                    "total_count": 0,
                    "incomplete_results": false,
                    "items": []
                })),
                29,
                0,
            ))
            .with_priority(10)
            .mount(&self.server)
            .await;
    }

    /// Code search pinned to `full_name` fails with `status`
    pub async fn mount_search_failure(&self, full_name: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .and(QueryParamContains {
                key: "q",
                fragment: format!("repo:{full_name}"),
            })
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "message": "Server Error" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Raw content for `full_name` / `file_path` at [`FIXTURE_COMMIT`]
    pub async fn mount_file(&self, full_name: &str, file_path: &str, content: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{full_name}/contents/{file_path}")))
            .and(query_param("ref", FIXTURE_COMMIT))
            .respond_with(ResponseTemplate::new(200).set_body_string(content))
            .mount(&self.server)
            .await;
    }

    /// Content for `full_name` / `file_path` fails with `status`
    pub async fn mount_file_failure(&self, full_name: &str, file_path: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{full_name}/contents/{file_path}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Every request is rejected with 401
    pub async fn mount_unauthorized(&self) {
        Mock::given(wiremock::matchers::any())
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
            )
            .mount(&self.server)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_is_reusable() {
        let rt1 = get_test_runtime();
        let rt2 = get_test_runtime();

        assert!(std::ptr::eq(rt1, rt2));
    }

    #[test]
    fn code_item_score_is_optional() {
        let with_score = code_item_json("acme/api", "src/lib.rs", "abc", Some(4.5));
        let without = code_item_json("acme/api", "src/lib.rs", "abc", None);

        assert_eq!(with_score["score"], json!(4.5));
        assert!(without.get("score").is_none());
        assert_eq!(without["name"], json!("lib.rs"));
    }
}
