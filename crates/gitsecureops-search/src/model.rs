//! Request, scope and result types
//!
//! Everything here lives for one search request only.

use crate::error::SearchError;
use chrono::{DateTime, Utc};
use gitsecureops_github::Repository;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Score given to upstream hits that carry none
pub const DEFAULT_SCORE: f64 = 1.0;

/// A repository the search runs against
///
/// Identity is `full_name`; the remaining fields are metadata carried into
/// results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub language: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub private: bool,
}

impl RepoRef {
    pub fn new(owner: &str, name: &str) -> Self {
        let owner = owner.trim().to_string();
        let name = name.trim().to_string();
        Self {
            full_name: format!("{owner}/{name}"),
            owner,
            name,
            language: None,
            updated_at: None,
            private: false,
        }
    }

    /// Parse `owner/name`
    ///
    /// # Errors
    /// Returns `SearchError::InvalidRequest` unless there is exactly one `/`
    /// with non-empty text on both sides
    pub fn parse(full_name: &str) -> Result<Self, SearchError> {
        match full_name.trim().split_once('/') {
            Some((owner, name))
                if !owner.trim().is_empty() && !name.trim().is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(SearchError::invalid(format!(
                "repository '{full_name}' must look like owner/name"
            ))),
        }
    }
}

impl PartialEq for RepoRef {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

impl Eq for RepoRef {}

impl Hash for RepoRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name.hash(state);
    }
}

impl From<&Repository> for RepoRef {
    fn from(repository: &Repository) -> Self {
        Self {
            owner: repository.owner.login.clone(),
            name: repository.name.clone(),
            full_name: repository.full_name.clone(),
            language: repository.language.clone(),
            updated_at: repository.updated_at,
            private: repository.private,
        }
    }
}

/// The set of repositories a search covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchScope {
    /// Every repository the authenticated user can see
    User,
    Org { org: String },
    Orgs { orgs: Vec<String> },
    Repos { repos: Vec<RepoRef> },
}

impl SearchScope {
    /// # Errors
    /// Returns `SearchError::InvalidRequest` for a blank organization name
    pub fn org(org: &str) -> Result<Self, SearchError> {
        let org = org.trim();
        if org.is_empty() {
            return Err(SearchError::invalid("organization name is empty"));
        }
        Ok(Self::Org {
            org: org.to_string(),
        })
    }

    /// Trimmed, blank-free, deduplicated list; first occurrence wins
    ///
    /// # Errors
    /// Returns `SearchError::InvalidRequest` when no organization remains
    pub fn orgs<I, S>(orgs: I) -> Result<Self, SearchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let orgs: Vec<String> = orgs
            .into_iter()
            .map(|org| org.as_ref().trim().to_string())
            .filter(|org| !org.is_empty() && seen.insert(org.clone()))
            .collect();

        if orgs.is_empty() {
            return Err(SearchError::invalid("organization list is empty"));
        }
        Ok(Self::Orgs { orgs })
    }

    /// Deduplicated by `full_name`; first occurrence wins
    ///
    /// # Errors
    /// Returns `SearchError::InvalidRequest` for an empty list
    pub fn repos(repos: Vec<RepoRef>) -> Result<Self, SearchError> {
        let repos = dedup_repositories(repos);
        if repos.is_empty() {
            return Err(SearchError::invalid("repository list is empty"));
        }
        Ok(Self::Repos { repos })
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Org { .. } => "org",
            Self::Orgs { .. } => "orgs",
            Self::Repos { .. } => "repos",
        }
    }

    /// Organization scopes request more results per repository
    pub const fn is_organization(&self) -> bool {
        matches!(self, Self::Org { .. } | Self::Orgs { .. })
    }

    /// Organizations named by the scope, in caller order
    pub fn organizations(&self) -> Vec<String> {
        match self {
            Self::Org { org } => vec![org.clone()],
            Self::Orgs { orgs } => orgs.clone(),
            Self::User | Self::Repos { .. } => Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), SearchError> {
        match self {
            Self::User => Ok(()),
            Self::Org { org } if org.trim().is_empty() => {
                Err(SearchError::invalid("organization name is empty"))
            }
            Self::Orgs { orgs } if orgs.is_empty() => {
                Err(SearchError::invalid("organization list is empty"))
            }
            Self::Repos { repos } if repos.is_empty() => {
                Err(SearchError::invalid("repository list is empty"))
            }
            Self::Org { .. } | Self::Orgs { .. } | Self::Repos { .. } => Ok(()),
        }
    }
}

/// Keep the first occurrence of each `full_name`, preserving order
pub fn dedup_repositories(repos: Vec<RepoRef>) -> Vec<RepoRef> {
    let mut seen = HashSet::new();
    repos
        .into_iter()
        .filter(|repo| seen.insert(repo.full_name.clone()))
        .collect()
}

/// Qualifiers appended to the upstream query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub language: Option<String>,
    pub extension: Option<String>,
}

/// Context around one matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    /// 1-based line of the match; 0 for the placeholder snippet
    pub line_number: usize,
    /// Context lines joined with `\n`
    pub text: String,
    /// 0-based index of the matching line within `text`
    pub match_line_offset: usize,
    pub context_start_line: usize,
    pub context_end_line: usize,
}

/// One matching file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub repository: RepoRef,
    pub file_path: String,
    pub file_url: String,
    pub sha: String,
    pub matches: Vec<Snippet>,
    pub score: f64,
}

/// Incremental update published after a repository produced hits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub repository: String,
    /// Only the hits found in `repository`
    pub new_hits: Vec<SearchHit>,
    pub total_hits_so_far: usize,
    pub current: usize,
    pub total: usize,
    pub percent: usize,
}

impl ProgressEvent {
    pub fn new(
        repository: &str,
        new_hits: Vec<SearchHit>,
        total_hits_so_far: usize,
        current: usize,
        total: usize,
    ) -> Self {
        Self {
            repository: repository.to_string(),
            new_hits,
            total_hits_so_far,
            current,
            total,
            percent: percent(current, total),
        }
    }
}

/// Rounded-down completion percentage, 100 for an empty total
pub fn percent(current: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    current.saturating_mul(100).checked_div(total).unwrap_or(100).min(100)
}

/// Terminal aggregate of one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub scope: SearchScope,
    /// Hits found before truncation
    pub total_results: usize,
    /// Repositories attempted, including ones whose search failed
    pub repositories_searched: usize,
    /// Sorted by descending score, truncated to the requested maximum
    pub hits: Vec<SearchHit>,
    pub failed_repositories: Vec<String>,
    pub failed_organizations: Vec<String>,
}

impl SearchResult {
    /// Some repository or organization could not be searched
    pub fn is_partial(&self) -> bool {
        !self.failed_repositories.is_empty() || !self.failed_organizations.is_empty()
    }
}

/// One search invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub scope: SearchScope,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, scope: SearchScope) -> Self {
        Self {
            query: query.into(),
            scope,
            filters: SearchFilters::default(),
            max_results: None,
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Reject requests that must not reach GitHub
    ///
    /// # Errors
    /// Returns `SearchError::InvalidRequest` for a blank query, a zero result
    /// cap or an empty scope
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.query.trim().is_empty() {
            return Err(SearchError::invalid("query is required"));
        }
        if self.max_results == Some(0) {
            return Err(SearchError::invalid("max_results must be at least 1"));
        }
        self.scope.validate()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_identity_is_full_name() {
        let mut a = RepoRef::new("acme", "api");
        let b = RepoRef::new("acme", "api");
        a.language = Some("Rust".into());
        assert_eq!(a, b);
    }

    #[test]
    fn repo_ref_parse_rejects_malformed_names() {
        assert_eq!(RepoRef::parse(" acme/api ").unwrap().full_name, "acme/api");
        assert!(RepoRef::parse("acme").is_err());
        assert!(RepoRef::parse("/api").is_err());
        assert!(RepoRef::parse("acme/api/extra").is_err());
    }

    #[test]
    fn orgs_scope_is_deduplicated_in_caller_order() {
        let scope = SearchScope::orgs(["beta", "acme", " beta ", "", "acme"]).unwrap();
        assert_eq!(scope.organizations(), vec!["beta", "acme"]);
        assert!(SearchScope::orgs(["  "]).is_err());
    }

    #[test]
    fn repos_scope_is_deduplicated() {
        let scope = SearchScope::repos(vec![
            RepoRef::new("acme", "api"),
            RepoRef::new("acme", "web"),
            RepoRef::new("acme", "api"),
        ])
        .unwrap();
        match scope {
            SearchScope::Repos { repos } => assert_eq!(repos.len(), 2),
            other => panic!("unexpected scope {other:?}"),
        }
    }

    #[test]
    fn scope_serializes_with_kind_tag() {
        let json = serde_json::to_value(SearchScope::org("acme").unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "org", "org": "acme" }));

        let json = serde_json::to_value(SearchScope::User).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "user" }));
    }

    #[test]
    fn blank_query_is_rejected() {
        let request = SearchRequest::new("   ", SearchScope::User);
        assert!(matches!(
            request.validate(),
            Err(SearchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn zero_result_cap_is_rejected() {
        let request = SearchRequest::new("TODO", SearchScope::User).with_max_results(0);
        assert!(matches!(
            request.validate(),
            Err(SearchError::InvalidRequest { .. })
        ));
        assert!(request.with_max_results(1).validate().is_ok());
    }

    #[test]
    fn percent_is_bounded() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
    }
}
