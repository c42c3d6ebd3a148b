//! Wire types for the subset of the GitHub REST API the aggregator uses
//!
//! Only the fields we read are declared; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account that owns a repository (user or organization)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Repository as returned by the listing endpoints and embedded in search items
///
/// Code search embeds a reduced repository object without `language` or
/// `updated_at`, so both are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub private: bool,
}

/// `GET /search/code` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<CodeSearchItem>,
}

/// One file matched by code search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSearchItem {
    pub name: String,
    pub path: String,
    /// Blob sha of the matched file, not a commit
    pub sha: String,
    /// API contents URL; its `ref` query parameter names the commit
    #[serde(default)]
    pub url: String,
    pub html_url: String,
    pub repository: Repository,
    /// Relevance score; absent on some GitHub Enterprise versions
    #[serde(default)]
    pub score: Option<f64>,
}

impl CodeSearchItem {
    /// Commit the match was found at, from the `ref` parameter of `url`
    pub fn content_ref(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.url).ok()?;
        url.query_pairs()
            .find(|(key, value)| key == "ref" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    }
}

/// Last rate-limit state observed in response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: Option<u32>,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn code_search_item_tolerates_missing_score_and_metadata() {
        let body = serde_json::json!({
            "total_count": 1,
            "incomplete_results": false,
            "items": [{
                "name": "main.rs",
                "path": "src/main.rs",
                "sha": "abc123",
                "url": "https://api.github.com/repositories/1/contents/src/main.rs",
                "html_url": "https://github.com/acme/widgets/blob/abc123/src/main.rs",
                "repository": {
                    "id": 1,
                    "name": "widgets",
                    "full_name": "acme/widgets",
                    "owner": { "login": "acme", "id": 7 },
                    "private": true
                }
            }]
        });

        let parsed: CodeSearchResponse = serde_json::from_value(body).unwrap();
        let item = &parsed.items[0];
        assert_eq!(item.score, None);
        assert_eq!(item.repository.language, None);
        assert!(item.repository.private);
        assert_eq!(item.content_ref(), None);
    }

    #[test]
    fn content_ref_is_the_commit_from_the_contents_url() {
        let item: CodeSearchItem = serde_json::from_value(serde_json::json!({
            "name": "main.rs",
            "path": "src/main.rs",
            "sha": "blob5ha",
            "url": "https://api.github.com/repositories/1/contents/src/main.rs?ref=9f2c1e7d",
            "html_url": "https://github.com/acme/widgets/blob/9f2c1e7d/src/main.rs",
            "repository": {
                "name": "widgets",
                "full_name": "acme/widgets",
                "owner": { "login": "acme" }
            }
        }))
        .unwrap();

        assert_eq!(item.content_ref().as_deref(), Some("9f2c1e7d"));
        assert_ne!(item.content_ref().as_deref(), Some(item.sha.as_str()));
    }
}
