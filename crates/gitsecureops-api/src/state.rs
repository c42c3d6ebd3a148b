//! Application state for Axum handlers
//!
//! The GitHub token arrives with each request, so the state holds a factory
//! that builds a search service for that token rather than one shared service.
//! The HTTP connection pool inside the factory is shared by all requests.

use gitsecureops_config::ApplicationConfig;
use gitsecureops_github::GitHubClient;
use gitsecureops_search::{Search, SearchService};
use std::sync::Arc;

/// Builds a search service bound to one caller's credentials
pub trait SearchServiceFactory: Send + Sync {
    fn service_for(&self, token: &str) -> Arc<dyn SearchService>;
}

/// Production factory: `GitHubClient` over a shared `reqwest::Client`
pub struct GitHubSearchFactory {
    http: reqwest::Client,
    config: Arc<ApplicationConfig>,
}

impl GitHubSearchFactory {
    pub const fn new(http: reqwest::Client, config: Arc<ApplicationConfig>) -> Self {
        Self { http, config }
    }
}

impl SearchServiceFactory for GitHubSearchFactory {
    fn service_for(&self, token: &str) -> Arc<dyn SearchService> {
        let client = GitHubClient::new(self.http.clone(), &self.config.github, token);
        Arc::new(Search::new(
            Arc::new(client),
            self.config.resolver.clone(),
            self.config.search.clone(),
        ))
    }
}

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub search_factory: Arc<dyn SearchServiceFactory>,
    pub config: Arc<ApplicationConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(search_factory: Arc<dyn SearchServiceFactory>, config: Arc<ApplicationConfig>) -> Self {
        Self {
            search_factory,
            config,
        }
    }
}
