//! One scoped code search per repository

use super::query::build_scoped_query;
use super::snippets::{extract_snippets, unavailable_snippet};
use crate::error::SearchError;
use crate::ledger::CallLedger;
use crate::model::{DEFAULT_SCORE, RepoRef, SearchFilters, SearchHit, Snippet};
use gitsecureops_config::SearchConfig;
use gitsecureops_github::{CodeSearchItem, GitHubApi};
use std::sync::Arc;

/// Runs the search for a single repository and enriches hits with snippets
pub struct Executor {
    github: Arc<dyn GitHubApi>,
    config: SearchConfig,
}

impl Executor {
    pub fn new(github: Arc<dyn GitHubApi>, config: SearchConfig) -> Self {
        Self { github, config }
    }

    /// Search `repo` for `query`
    ///
    /// Content failures never fail the repository: the hit is kept with a
    /// placeholder snippet.
    ///
    /// # Errors
    /// - `SearchError::UpstreamFatal` if this is the request's first upstream
    ///   call and the credentials were rejected
    /// - `SearchError::RepositorySearch` for any other search failure
    #[tracing::instrument(skip(self, repo, query, filters, ledger), fields(repository = %repo.full_name))]
    pub async fn search_one(
        &self,
        repo: &RepoRef,
        query: &str,
        filters: &SearchFilters,
        per_repo_limit: usize,
        ledger: &mut CallLedger,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let scoped_query = build_scoped_query(query, filters, &repo.full_name);

        let first_call = ledger.record();
        let response = match self.github.search_code(&scoped_query, per_repo_limit).await {
            Ok(response) => response,
            Err(source) => {
                return Err(CallLedger::fatal(first_call, &source).unwrap_or_else(|| {
                    SearchError::RepositorySearch {
                        repository: repo.full_name.clone(),
                        source,
                    }
                }));
            }
        };

        let mut hits = Vec::with_capacity(response.items.len());
        for item in response.items.into_iter().take(per_repo_limit) {
            let matches = match self.fetch_snippets(repo, &item, query, ledger).await {
                Ok(snippets) => snippets,
                Err(error) => {
                    tracing::debug!(error = %error, "Using placeholder snippet");
                    vec![unavailable_snippet()]
                }
            };

            hits.push(SearchHit {
                repository: repo.clone(),
                file_path: item.path,
                file_url: item.html_url,
                sha: item.sha,
                matches,
                score: item
                    .score
                    .filter(|score| score.is_finite())
                    .unwrap_or(DEFAULT_SCORE),
            });
        }

        tracing::debug!(hits = hits.len(), "Repository searched");
        Ok(hits)
    }

    async fn fetch_snippets(
        &self,
        repo: &RepoRef,
        item: &CodeSearchItem,
        query: &str,
        ledger: &mut CallLedger,
    ) -> Result<Vec<Snippet>, SearchError> {
        // `item.sha` is the blob; the contents endpoint wants the commit
        let git_ref = item.content_ref();
        ledger.record();
        let content = self
            .github
            .get_file_content(&repo.owner, &repo.name, &item.path, git_ref.as_deref())
            .await
            .map_err(|source| SearchError::FileContentUnavailable {
                repository: repo.full_name.clone(),
                path: item.path.clone(),
                source,
            })?;

        Ok(extract_snippets(
            &content,
            query,
            self.config.context_lines,
            self.config.max_snippets_per_hit,
        ))
    }
}
