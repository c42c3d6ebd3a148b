//! `reqwest` implementation of [`GitHubApi`]

use crate::models::{CodeSearchResponse, RateLimitStatus, Repository};
use crate::{GitHubApi, GitHubError, GitHubResult};
use async_trait::async_trait;
use chrono::DateTime;
use gitsecureops_config::GitHubConfig;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const API_VERSION: &str = "2022-11-28";
const SEARCH_ENDPOINT: &str = "/search/code";

/// Build the shared HTTP client
///
/// Only the connect timeout is set here; each call applies the timeout for
/// its endpoint class.
///
/// # Errors
/// Returns `GitHubError::Client` if the TLS backend or headers are rejected
pub fn build_http_client(config: &GitHubConfig) -> GitHubResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
    headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .build()
        .map_err(|e| GitHubError::Client(e.to_string()))
}

/// GitHub client bound to one caller's token
///
/// Cheap to construct: the connection pool lives in the shared
/// `reqwest::Client`, so the API layer creates one per request.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    list_timeout: Duration,
    search_timeout: Duration,
    content_timeout: Duration,
    search_rate_limit: Arc<Mutex<Option<RateLimitStatus>>>,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, config: &GitHubConfig, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            list_timeout: config.list_timeout(),
            search_timeout: config.search_timeout(),
            content_timeout: config.content_timeout(),
            search_rate_limit: Arc::new(Mutex::new(None)),
        }
    }

    async fn get(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        timeout: Duration,
        accept: &'static str,
    ) -> GitHubResult<reqwest::Response> {
        let url = format!("{}{endpoint}", self.base_url);

        tracing::trace!(endpoint, "GitHub request");

        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| GitHubError::from_reqwest(&e, endpoint))?;

        let rate_limit = parse_rate_limit(response.headers());
        if endpoint == SEARCH_ENDPOINT
            && rate_limit.is_some()
            && let Ok(mut slot) = self.search_rate_limit.lock()
        {
            *slot = rate_limit;
        }

        check_status(response.status(), rate_limit.as_ref(), endpoint)?;
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> GitHubResult<T> {
        let response = self.get(endpoint, query, timeout, JSON_MEDIA_TYPE).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GitHubError::from_reqwest(&e, endpoint))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_user_repos(&self, page: u32, per_page: usize) -> GitHubResult<Vec<Repository>> {
        self.get_json(
            "/user/repos",
            &[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("sort", "updated".to_string()),
            ],
            self.list_timeout,
        )
        .await
    }

    async fn list_org_repos(
        &self,
        org: &str,
        page: u32,
        per_page: usize,
    ) -> GitHubResult<Vec<Repository>> {
        let endpoint = format!("/orgs/{}/repos", urlencoding::encode(org));
        self.get_json(
            &endpoint,
            &[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("type", "all".to_string()),
            ],
            self.list_timeout,
        )
        .await
    }

    async fn search_code(&self, query: &str, per_page: usize) -> GitHubResult<CodeSearchResponse> {
        self.get_json(
            SEARCH_ENDPOINT,
            &[("q", query.to_string()), ("per_page", per_page.to_string())],
            self.search_timeout,
        )
        .await
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GitHubResult<String> {
        let endpoint = format!(
            "/repos/{}/{}/contents/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            encode_path(path)
        );
        let query: Vec<(&str, String)> = git_ref
            .map(|git_ref| ("ref", git_ref.to_string()))
            .into_iter()
            .collect();
        let response = self
            .get(
                &endpoint,
                &query,
                self.content_timeout,
                RAW_MEDIA_TYPE,
            )
            .await?;

        response
            .text()
            .await
            .map_err(|e| GitHubError::from_reqwest(&e, &endpoint))
    }

    fn rate_limit(&self) -> Option<RateLimitStatus> {
        self.search_rate_limit
            .lock()
            .ok()
            .and_then(|slot| *slot)
    }
}

/// Percent-encode each path segment, keeping the separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map a response status to an error
fn check_status(
    status: StatusCode,
    rate_limit: Option<&RateLimitStatus>,
    endpoint: &str,
) -> GitHubResult<()> {
    if status.is_success() {
        return Ok(());
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(GitHubError::Unauthorized {
            endpoint: endpoint.to_string(),
        });
    }

    let exhausted = rate_limit.is_some_and(|limit| limit.remaining == 0);
    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted) {
        return Err(GitHubError::RateLimited {
            endpoint: endpoint.to_string(),
            reset_at: rate_limit.map(|limit| limit.reset_at),
        });
    }

    Err(GitHubError::Status {
        status: status.as_u16(),
        endpoint: endpoint.to_string(),
    })
}

/// Read `x-ratelimit-remaining` / `x-ratelimit-reset` (and `-limit` when present)
pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitStatus> {
    let number = |name: &str| -> Option<i64> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    };

    let remaining = u32::try_from(number("x-ratelimit-remaining")?).ok()?;
    let reset_at = DateTime::from_timestamp(number("x-ratelimit-reset")?, 0)?;
    let limit = number("x-ratelimit-limit").and_then(|value| u32::try_from(value).ok());

    Some(RateLimitStatus {
        limit,
        remaining,
        reset_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn parses_rate_limit_headers() {
        let parsed = parse_rate_limit(&headers(&[
            ("x-ratelimit-limit", "30"),
            ("x-ratelimit-remaining", "4"),
            ("x-ratelimit-reset", "1700000000"),
        ]))
        .unwrap();

        assert_eq!(parsed.limit, Some(30));
        assert_eq!(parsed.remaining, 4);
        assert_eq!(parsed.reset_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn missing_headers_yield_none() {
        assert!(parse_rate_limit(&headers(&[("x-ratelimit-remaining", "4")])).is_none());
        assert!(parse_rate_limit(&HeaderMap::new()).is_none());
    }

    #[test]
    fn forbidden_with_exhausted_budget_is_rate_limited() {
        let exhausted = RateLimitStatus {
            limit: Some(30),
            remaining: 0,
            reset_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };

        let result = check_status(StatusCode::FORBIDDEN, Some(&exhausted), "/search/code");
        assert!(matches!(result, Err(GitHubError::RateLimited { .. })));

        let result = check_status(StatusCode::FORBIDDEN, None, "/search/code");
        assert_eq!(
            result,
            Err(GitHubError::Status {
                status: 403,
                endpoint: "/search/code".into()
            })
        );
    }

    #[test]
    fn file_paths_keep_separators() {
        assert_eq!(encode_path("src/my file.rs"), "src/my%20file.rs");
    }
}
