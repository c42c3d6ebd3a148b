//! Subcommand implementations

use crate::cli::{ReposArgs, SearchArgs, build_scope};
use crate::format::{OutputFormat, render_progress, render_repositories, render_result};
use anyhow::{Context, bail};
use gitsecureops_common::CorrelationId;
use gitsecureops_config::ApplicationConfig;
use gitsecureops_github::GitHubApi;
use gitsecureops_search::{
    CallLedger, Resolver, Search, SearchError, SearchEvent, SearchRequest, SearchResult,
    SearchService,
};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run a search and print it
///
/// Cancelling `cancel` stops the search before its next repository.
///
/// # Errors
/// Fails on invalid arguments, rejected credentials, cancellation, or a
/// broken stdout
pub async fn search<W: Write>(
    github: Arc<dyn GitHubApi>,
    config: &ApplicationConfig,
    args: &SearchArgs,
    cancel: CancellationToken,
    out: &mut W,
) -> anyhow::Result<SearchResult> {
    let request = args.to_request()?;
    let correlation_id = CorrelationId::new();
    let service = Search::new(github, config.resolver.clone(), config.search.clone());

    info!(
        correlation_id = %correlation_id,
        scope = request.scope.kind(),
        stream = args.stream,
        "Starting search"
    );

    let result = if args.stream {
        stream(&service, request, cancel, &correlation_id, args.format, out).await?
    } else {
        tokio::select! {
            outcome = service.search(request, &correlation_id) => outcome?,
            () = cancel.cancelled() => return Err(SearchError::Cancelled.into()),
        }
    };

    if result.is_partial() {
        warn!(
            failed_repositories = result.failed_repositories.len(),
            failed_organizations = result.failed_organizations.len(),
            "Search finished with partial results"
        );
    }
    render_result(out, &result, args.format).context("Failed to write results")?;
    Ok(result)
}

async fn stream<W: Write>(
    service: &Search,
    request: SearchRequest,
    cancel: CancellationToken,
    correlation_id: &CorrelationId,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<SearchResult> {
    let mut events = service
        .search_stream(request, cancel, correlation_id)
        .await?;

    while let Some(event) = events.recv().await {
        match event {
            SearchEvent::Progress(progress) => {
                render_progress(out, &progress, format).context("Failed to write progress")?;
                out.flush().context("Failed to write progress")?;
            }
            SearchEvent::Complete(result) => return Ok(result),
            SearchEvent::Failed { message } => bail!(message),
        }
    }
    bail!("Search ended without a result")
}

/// Resolve a scope and print its repositories
///
/// Cancelling `cancel` stops the listing before its next organization.
///
/// # Errors
/// Fails on blank organizations, rejected credentials, cancellation, or a
/// broken stdout
pub async fn repos<W: Write>(
    github: Arc<dyn GitHubApi>,
    config: &ApplicationConfig,
    args: &ReposArgs,
    cancel: &CancellationToken,
    out: &mut W,
) -> anyhow::Result<()> {
    let scope = build_scope(&args.orgs, &[])?;
    let resolver = Resolver::new(github, config.resolver.clone());
    let mut ledger = CallLedger::new();

    let resolution = resolver.resolve(&scope, &mut ledger, cancel).await?;
    info!(
        repositories = resolution.repositories.len(),
        upstream_calls = ledger.calls(),
        "Scope resolved"
    );

    render_repositories(
        out,
        &resolution.repositories,
        &resolution.failed_organizations,
        args.format,
    )
    .context("Failed to write repositories")
}
