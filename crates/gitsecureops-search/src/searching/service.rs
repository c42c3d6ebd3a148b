//! Search service trait

use super::events::SearchEvent;
use crate::error::SearchError;
use crate::model::{SearchRequest, SearchResult};
use async_trait::async_trait;
use gitsecureops_common::CorrelationId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Cross-repository search with correlation ID support
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run a search to completion and return the aggregate
    ///
    /// # Errors
    /// `InvalidRequest` before any upstream call, `UpstreamFatal` when the
    /// first upstream call is rejected
    async fn search(
        &self,
        request: SearchRequest,
        correlation_id: &CorrelationId,
    ) -> Result<SearchResult, SearchError>;

    /// Start a search and stream its events
    ///
    /// The receiver yields progress events followed by exactly one terminal
    /// event. Dropping the receiver or cancelling `cancel` stops the search
    /// before the next repository.
    ///
    /// # Errors
    /// `InvalidRequest` if the request is rejected before the search starts
    async fn search_stream(
        &self,
        request: SearchRequest,
        cancel: CancellationToken,
        correlation_id: &CorrelationId,
    ) -> Result<mpsc::Receiver<SearchEvent>, SearchError>;
}
