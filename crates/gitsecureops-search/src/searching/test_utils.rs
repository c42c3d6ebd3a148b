//! Test utilities for search services

use super::events::SearchEvent;
use super::service::SearchService;
use crate::error::SearchError;
use crate::model::{SearchRequest, SearchResult};
use async_trait::async_trait;
use gitsecureops_common::CorrelationId;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Mock search service replaying a fixed outcome
///
/// Streaming replays the scripted progress events followed by the terminal
/// event derived from the outcome.
#[derive(Clone)]
pub struct MockSearch {
    outcome: Result<SearchResult, SearchError>,
    progress: Vec<SearchEvent>,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl MockSearch {
    /// Create a mock that returns `result`
    pub fn with_result(result: SearchResult) -> Self {
        Self {
            outcome: Ok(result),
            progress: Vec::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that fails with `error`
    pub fn with_error(error: SearchError) -> Self {
        Self {
            outcome: Err(error),
            progress: Vec::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Progress events to replay before the terminal event when streaming
    #[must_use]
    pub fn with_progress(mut self, progress: Vec<SearchEvent>) -> Self {
        self.progress = progress;
        self
    }

    /// Requests received so far (for test assertions)
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: &SearchRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

#[async_trait]
impl SearchService for MockSearch {
    async fn search(
        &self,
        request: SearchRequest,
        correlation_id: &CorrelationId,
    ) -> Result<SearchResult, SearchError> {
        tracing::debug!(%correlation_id, "Mock search");
        request.validate()?;
        self.record(&request);
        self.outcome.clone()
    }

    async fn search_stream(
        &self,
        request: SearchRequest,
        _cancel: CancellationToken,
        correlation_id: &CorrelationId,
    ) -> Result<mpsc::Receiver<SearchEvent>, SearchError> {
        tracing::debug!(%correlation_id, "Mock streaming search");
        request.validate()?;
        self.record(&request);

        let mut events = self.progress.clone();
        events.push(match &self.outcome {
            Ok(result) => SearchEvent::Complete(result.clone()),
            Err(error) => SearchEvent::Failed {
                message: error.to_string(),
            },
        });

        let (sender, receiver) = mpsc::channel(events.len().max(1));
        for event in events {
            if sender.send(event).await.is_err() {
                break;
            }
        }
        Ok(receiver)
    }
}
