//! Cross-repository code search endpoint.
//!
//! `GET /search-code` takes its parameters from the query string (lists are
//! comma separated); `POST /search-code` takes the same fields as a JSON body.
//! The caller's GitHub token is forwarded upstream, so every request runs
//! against that caller's own view of GitHub.
//!
//! ```json
//! POST /search-code
//! Authorization: Bearer ghp_...
//! {
//!   "q": "AWS_SECRET_ACCESS_KEY",
//!   "organizations": ["acme", "acme-labs"],
//!   "extension": "env",
//!   "stream": true
//! }
//! ```
//!
//! Scope precedence is `repositories`, then `organizations`, then `org`, and
//! the caller's own repositories when none is given.
//!
//! With `stream` set the response is `text/event-stream`: one `data:` frame
//! per [`SearchEvent`] (`progress`, then `complete` or `error`) and a final
//! `data: [DONE]` frame.

use crate::middleware::RequestContext;
use crate::state::AppState;
use crate::{ApiError, ApiResult};
use axum::{
    Json, Router,
    extract::{Extension, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::{HeaderMap, header::AUTHORIZATION},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::get,
};
use futures_util::stream::{self, StreamExt};
use gitsecureops_common::CorrelationId;
use gitsecureops_search::{
    RepoRef, SearchError, SearchEvent, SearchFilters, SearchHit, SearchRequest, SearchResult,
    SearchScope, SearchService,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

/// Terminal frame of a streamed response
pub const DONE_MARKER: &str = "[DONE]";

const FALLBACK_ERROR_FRAME: &str = r#"{"type":"error","message":"Failed to encode event"}"#;

/// A repository named either as `"owner/name"` or `{owner, name}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RepositoryParam {
    FullName(String),
    Parts { owner: String, name: String },
}

impl RepositoryParam {
    fn to_repo_ref(&self, correlation_id: &CorrelationId) -> ApiResult<RepoRef> {
        let parsed = match self {
            Self::FullName(full_name) => RepoRef::parse(full_name),
            Self::Parts { owner, name } => RepoRef::parse(&format!("{owner}/{name}")),
        };
        parsed.map_err(|error| ApiError::from_search_error(error, correlation_id.clone()))
    }
}

/// JSON body of `POST /search-code`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SearchCodeBody {
    /// Search term
    pub q: Option<String>,
    /// Alias of `q`
    pub query: Option<String>,
    /// Single organization scope
    pub org: Option<String>,
    /// Several organizations; wins over `org`
    pub organizations: Option<Vec<String>>,
    /// Appended as `language:<value>`
    pub language: Option<String>,
    /// Appended as `extension:<value>`
    pub extension: Option<String>,
    /// Explicit repositories; wins over every other scope
    pub repositories: Option<Vec<RepositoryParam>>,
    /// Stream progress as server-sent events
    pub stream: Option<bool>,
    /// Maximum number of hits returned
    pub max_results: Option<usize>,
}

/// Query string of `GET /search-code`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchCodeParams {
    /// Search term
    pub q: Option<String>,
    /// Alias of `q`
    pub query: Option<String>,
    /// Single organization scope
    pub org: Option<String>,
    /// Comma separated organizations
    pub organizations: Option<String>,
    pub language: Option<String>,
    pub extension: Option<String>,
    /// Comma separated `owner/name` list
    pub repositories: Option<String>,
    pub stream: Option<bool>,
    pub max_results: Option<usize>,
}

fn split_list(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
}

impl From<SearchCodeParams> for SearchCodeBody {
    fn from(params: SearchCodeParams) -> Self {
        Self {
            q: params.q,
            query: params.query,
            org: params.org,
            organizations: split_list(params.organizations),
            language: params.language,
            extension: params.extension,
            repositories: split_list(params.repositories)
                .map(|names| names.into_iter().map(RepositoryParam::FullName).collect()),
            stream: params.stream,
            max_results: params.max_results,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl SearchCodeBody {
    /// Validate and turn the raw fields into a search request
    fn into_request(self, correlation_id: &CorrelationId) -> ApiResult<SearchRequest> {
        let query = non_blank(self.q.as_deref())
            .or_else(|| non_blank(self.query.as_deref()))
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::invalid_request(
                    "Query parameter 'q' is required",
                    correlation_id.clone(),
                )
            })?;

        let scope = self.scope(correlation_id)?;
        let mut request = SearchRequest::new(query, scope).with_filters(SearchFilters {
            language: self.language,
            extension: self.extension,
        });
        request.max_results = self.max_results;
        request
            .validate()
            .map_err(|error| ApiError::from_search_error(error, correlation_id.clone()))?;
        Ok(request)
    }

    fn scope(&self, correlation_id: &CorrelationId) -> ApiResult<SearchScope> {
        let invalid =
            |error: SearchError| ApiError::from_search_error(error, correlation_id.clone());

        if let Some(repositories) = self.repositories.as_ref().filter(|list| !list.is_empty()) {
            let repos = repositories
                .iter()
                .map(|repository| repository.to_repo_ref(correlation_id))
                .collect::<ApiResult<Vec<_>>>()?;
            return SearchScope::repos(repos).map_err(invalid);
        }

        if let Some(organizations) = self
            .organizations
            .as_ref()
            .filter(|list| list.iter().any(|org| !org.trim().is_empty()))
        {
            return SearchScope::orgs(organizations).map_err(invalid);
        }

        match self.org.as_deref().map(str::trim) {
            Some(org) if !org.is_empty() => SearchScope::org(org).map_err(invalid),
            _ => Ok(SearchScope::User),
        }
    }
}

/// Non-streaming response body
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchCodeResponse {
    /// `true` whenever the search ran, even if some repositories failed
    pub success: bool,
    pub query: String,
    /// Organizations named by the scope
    pub organizations: Vec<String>,
    /// Hits found before truncation
    pub total_results: usize,
    /// Repositories attempted, failed ones included
    pub repositories_searched: usize,
    /// Hits sorted by descending score
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<SearchHit>,
    pub metadata: SearchMetadata,
}

/// Search metadata
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchMetadata {
    /// `user`, `org`, `orgs` or `repos`
    pub scope: String,
    #[schema(value_type = Object)]
    pub filters: SearchFilters,
    /// Effective result cap after clamping
    pub max_results: usize,
    pub failed_repositories: Vec<String>,
    pub failed_organizations: Vec<String>,
    /// Some repository or organization could not be searched
    pub partial: bool,
    pub duration_ms: u64,
    pub correlation_id: String,
}

impl SearchCodeResponse {
    fn new(
        result: SearchResult,
        filters: SearchFilters,
        max_results: usize,
        duration_ms: u64,
        correlation_id: &CorrelationId,
    ) -> Self {
        let partial = result.is_partial();
        Self {
            success: true,
            organizations: result.scope.organizations(),
            total_results: result.total_results,
            repositories_searched: result.repositories_searched,
            metadata: SearchMetadata {
                scope: result.scope.kind().to_string(),
                filters,
                max_results,
                failed_repositories: result.failed_repositories,
                failed_organizations: result.failed_organizations,
                partial,
                duration_ms,
                correlation_id: correlation_id.to_string(),
            },
            query: result.query,
            results: result.hits,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/search-code", get(search_code_get).post(search_code_post))
}

/// Search code with parameters in the query string.
#[utoipa::path(
    get,
    path = "/search-code",
    tag = "search",
    params(SearchCodeParams),
    responses(
        (status = 200, description = "Aggregated results, or an event stream when `stream=true`", body = SearchCodeResponse),
        (status = 400, description = "Missing query or malformed scope", body = crate::ApiErrorResponse),
        (status = 401, description = "Missing or rejected GitHub token", body = crate::ApiErrorResponse),
        (status = 504, description = "Search timed out", body = crate::ApiErrorResponse)
    )
)]
#[instrument(skip_all, fields(correlation_id))]
pub async fn search_code_get(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
    headers: HeaderMap,
    params: Result<Query<SearchCodeParams>, QueryRejection>,
) -> ApiResult<Response> {
    let correlation_id = correlation_id_from(context.as_ref());
    let Query(params) = params.map_err(|rejection| {
        ApiError::invalid_request(rejection.body_text(), correlation_id.clone())
    })?;
    handle(&state, &headers, params.into(), correlation_id).await
}

/// Search code with parameters in a JSON body.
#[utoipa::path(
    post,
    path = "/search-code",
    tag = "search",
    request_body = SearchCodeBody,
    responses(
        (status = 200, description = "Aggregated results, or an event stream when `stream` is true", body = SearchCodeResponse),
        (status = 400, description = "Missing query or malformed scope", body = crate::ApiErrorResponse),
        (status = 401, description = "Missing or rejected GitHub token", body = crate::ApiErrorResponse),
        (status = 504, description = "Search timed out", body = crate::ApiErrorResponse)
    )
)]
#[instrument(skip_all, fields(correlation_id))]
pub async fn search_code_post(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
    headers: HeaderMap,
    body: Result<Json<SearchCodeBody>, JsonRejection>,
) -> ApiResult<Response> {
    let correlation_id = correlation_id_from(context.as_ref());
    let Json(body) = body.map_err(|rejection| {
        ApiError::invalid_request(rejection.body_text(), correlation_id.clone())
    })?;
    handle(&state, &headers, body, correlation_id).await
}

fn correlation_id_from(context: Option<&Extension<RequestContext>>) -> CorrelationId {
    let correlation_id =
        context.map_or_else(CorrelationId::new, |ctx| ctx.correlation_id.clone());
    tracing::Span::current().record("correlation_id", correlation_id.to_string());
    correlation_id
}

/// Token from `Authorization: Bearer <t>` or `Authorization: token <t>`
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    let accepted =
        scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token");
    (accepted && !token.is_empty()).then(|| token.to_string())
}

async fn handle(
    state: &AppState,
    headers: &HeaderMap,
    body: SearchCodeBody,
    correlation_id: CorrelationId,
) -> ApiResult<Response> {
    let stream = body.stream.unwrap_or(false);
    let request = body.into_request(&correlation_id)?;
    let token = bearer_token(headers).ok_or_else(|| ApiError::MissingCredentials {
        correlation_id: correlation_id.clone(),
    })?;

    info!(
        correlation_id = %correlation_id,
        query = %request.query,
        scope = request.scope.kind(),
        stream,
        "Processing search request"
    );
    metrics::counter!(
        "gitsecureops_search_requests_total",
        "mode" => if stream { "stream" } else { "json" }
    )
    .increment(1);

    let service = state.search_factory.service_for(&token);
    if stream {
        return stream_search(service.as_ref(), request, correlation_id).await;
    }

    let start = Instant::now();
    let filters = request.filters.clone();
    let max_results = state
        .config
        .search
        .effective_max_results(request.max_results);
    let timeout = state.config.api.timeout();

    let result = match tokio::time::timeout(timeout, service.search(request, &correlation_id)).await
    {
        Ok(Ok(result)) => result,
        Ok(Err(error)) => return Err(ApiError::from_search_error(error, correlation_id)),
        Err(_elapsed) => {
            warn!(
                correlation_id = %correlation_id,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Search timed out"
            );
            return Err(ApiError::SearchTimeout {
                timeout_duration: timeout,
                correlation_id,
            });
        }
    };

    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        correlation_id = %correlation_id,
        total_results = result.total_results,
        returned = result.hits.len(),
        partial = result.is_partial(),
        duration_ms,
        "Search request completed"
    );

    let body = SearchCodeResponse::new(result, filters, max_results, duration_ms, &correlation_id);
    Ok(Json(body).into_response())
}

/// Start the search and frame its events as SSE
///
/// The cancellation token is tied to the response stream: when the client
/// goes away the stream is dropped and the search stops.
async fn stream_search(
    service: &dyn SearchService,
    request: SearchRequest,
    correlation_id: CorrelationId,
) -> ApiResult<Response> {
    let cancel = CancellationToken::new();
    let receiver = service
        .search_stream(request, cancel.clone(), &correlation_id)
        .await
        .map_err(|error| ApiError::from_search_error(error, correlation_id))?;

    let events = stream::unfold(
        (receiver, cancel.drop_guard()),
        |(mut receiver, guard)| async move {
            let event = receiver.recv().await?;
            Some((sse_frame(&event), (receiver, guard)))
        },
    );
    let done = stream::once(async { Ok::<_, Infallible>(Event::default().data(DONE_MARKER)) });

    Ok(Sse::new(events.chain(done)).into_response())
}

fn sse_frame(event: &SearchEvent) -> Result<Event, Infallible> {
    Ok(Event::default().json_data(event).unwrap_or_else(|error| {
        warn!(error = %error, "Failed to encode search event");
        Event::default().data(FALLBACK_ERROR_FRAME)
    }))
}
