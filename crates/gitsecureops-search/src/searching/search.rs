//! Search service implementation

use super::events::SearchEvent;
use super::phase::SearchPhase;
use super::service::SearchService;
use crate::aggregating::SearchAccumulator;
use crate::error::SearchError;
use crate::executing::{Executor, Throttle};
use crate::ledger::CallLedger;
use crate::model::{ProgressEvent, SearchRequest, SearchResult};
use crate::resolving::Resolver;
use async_trait::async_trait;
use gitsecureops_common::CorrelationId;
use gitsecureops_config::{ResolverConfig, SearchConfig};
use gitsecureops_github::GitHubApi;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Search over one caller's view of GitHub
///
/// Construct one per credential; all per-request state lives inside `run`.
#[derive(Clone)]
pub struct Search {
    github: Arc<dyn GitHubApi>,
    resolver_config: ResolverConfig,
    search_config: SearchConfig,
}

impl Search {
    pub fn new(
        github: Arc<dyn GitHubApi>,
        resolver_config: ResolverConfig,
        search_config: SearchConfig,
    ) -> Self {
        Self {
            github,
            resolver_config,
            search_config,
        }
    }

    /// Drive one request through the phase machine
    ///
    /// With `events` set, progress is published after every repository that
    /// produced hits. The terminal event is the caller's job.
    async fn run(
        &self,
        request: SearchRequest,
        events: Option<&mpsc::Sender<SearchEvent>>,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, SearchError> {
        let mut phase = SearchPhase::Idle.transition(SearchPhase::Resolving)?;
        let outcome = self.execute(&request, events, cancel, &mut phase).await;

        if outcome.is_err() && !phase.is_terminal() {
            phase = phase.transition(SearchPhase::Failed)?;
        }
        tracing::debug!(%phase, "Search finished");
        outcome
    }

    async fn execute(
        &self,
        request: &SearchRequest,
        events: Option<&mpsc::Sender<SearchEvent>>,
        cancel: &CancellationToken,
        phase: &mut SearchPhase,
    ) -> Result<SearchResult, SearchError> {
        let max_results = self
            .search_config
            .effective_max_results(request.max_results);
        let mut ledger = CallLedger::new();

        let resolver = Resolver::new(Arc::clone(&self.github), self.resolver_config.clone());
        let resolution = resolver.resolve(&request.scope, &mut ledger, cancel).await?;
        let repositories = resolution.repositories;
        let total = repositories.len();

        let mut result = SearchResult {
            query: request.query.clone(),
            scope: request.scope.clone(),
            total_results: 0,
            repositories_searched: 0,
            hits: Vec::new(),
            failed_repositories: Vec::new(),
            failed_organizations: resolution.failed_organizations,
        };

        if repositories.is_empty() {
            *phase = phase.transition(SearchPhase::Complete)?;
            tracing::info!("No repositories in scope");
            return Ok(result);
        }

        *phase = phase.transition(SearchPhase::Searching { current: 0, total })?;
        tracing::info!(repositories = total, "Searching repositories");

        let per_repo_limit = if request.scope.is_organization() {
            self.search_config.org_results_per_repository
        } else {
            self.search_config.results_per_repository
        };
        let executor = Executor::new(Arc::clone(&self.github), self.search_config.clone());
        let mut throttle = Throttle::from_config(&self.search_config);
        let mut accumulator = SearchAccumulator::new();

        for (index, repo) in repositories.iter().enumerate() {
            if cancel.is_cancelled() || events.is_some_and(mpsc::Sender::is_closed) {
                tracing::info!(
                    searched = accumulator.repositories_searched(),
                    "Search cancelled"
                );
                return Err(SearchError::Cancelled);
            }

            tokio::select! {
                () = throttle.wait(self.github.rate_limit()) => {}
                () = cancel.cancelled() => return Err(SearchError::Cancelled),
            }

            let current = index.saturating_add(1);
            match executor
                .search_one(
                    repo,
                    &request.query,
                    &request.filters,
                    per_repo_limit,
                    &mut ledger,
                )
                .await
            {
                Ok(hits) => {
                    metrics::counter!("gitsecureops_repositories_searched_total").increment(1);
                    metrics::counter!("gitsecureops_hits_found_total")
                        .increment(u64::try_from(hits.len()).unwrap_or(u64::MAX));

                    let new_hits = (events.is_some() && !hits.is_empty()).then(|| hits.clone());
                    let total_hits_so_far = accumulator.record_success(hits);

                    if let (Some(sender), Some(new_hits)) = (events, new_hits) {
                        let event = ProgressEvent::new(
                            &repo.full_name,
                            new_hits,
                            total_hits_so_far,
                            current,
                            total,
                        );
                        if sender.send(SearchEvent::Progress(event)).await.is_err() {
                            tracing::debug!("Progress receiver dropped");
                        }
                    }
                }
                Err(error @ SearchError::UpstreamFatal { .. }) => return Err(error),
                Err(error) => {
                    metrics::counter!("gitsecureops_repositories_failed_total").increment(1);
                    tracing::warn!(repository = %repo.full_name, error = %error, "Repository search failed; continuing");
                    accumulator.record_failure(&repo.full_name);
                }
            }

            *phase = phase.transition(SearchPhase::Searching { current, total })?;
        }

        *phase = phase.transition(SearchPhase::Aggregating)?;
        let finished = accumulator.finish(max_results);
        result.total_results = finished.total_results;
        result.repositories_searched = finished.repositories_searched;
        result.hits = finished.hits;
        result.failed_repositories = finished.failed_repositories;
        *phase = phase.transition(SearchPhase::Complete)?;

        tracing::info!(
            total_results = result.total_results,
            returned = result.hits.len(),
            failed_repositories = result.failed_repositories.len(),
            "Search complete"
        );

        Ok(result)
    }
}

#[async_trait]
impl SearchService for Search {
    #[tracing::instrument(skip(self, request), fields(correlation_id, scope = request.scope.kind()))]
    async fn search(
        &self,
        request: SearchRequest,
        correlation_id: &CorrelationId,
    ) -> Result<SearchResult, SearchError> {
        tracing::Span::current().record("correlation_id", correlation_id.to_string());
        request.validate()?;

        let outcome = self.run(request, None, &CancellationToken::new()).await;
        if let Err(error) = &outcome {
            tracing::warn!(error = %error, "Search failed");
        }
        outcome
    }

    #[tracing::instrument(skip(self, request, cancel), fields(correlation_id, scope = request.scope.kind()))]
    async fn search_stream(
        &self,
        request: SearchRequest,
        cancel: CancellationToken,
        correlation_id: &CorrelationId,
    ) -> Result<mpsc::Receiver<SearchEvent>, SearchError> {
        tracing::Span::current().record("correlation_id", correlation_id.to_string());
        request.validate()?;

        let (sender, receiver) = mpsc::channel(self.search_config.stream_channel_capacity.max(1));
        let search = self.clone();

        tokio::spawn(
            async move {
                let terminal = match search.run(request, Some(&sender), &cancel).await {
                    Ok(result) => SearchEvent::Complete(result),
                    Err(error) => {
                        tracing::warn!(error = %error, "Streaming search failed");
                        SearchEvent::Failed {
                            message: error.to_string(),
                        }
                    }
                };
                if sender.send(terminal).await.is_err() {
                    tracing::debug!("Terminal event dropped; receiver gone");
                }
            }
            .instrument(tracing::Span::current()),
        );

        Ok(receiver)
    }
}
