//! HTTP surface of the GitSecureOps code search aggregator
//!
//! `axum` router exposing `/search-code` (JSON or server-sent events),
//! `/health` and the `OpenAPI` document.

pub mod bootstrap;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::{RequestContext, correlation_id_middleware};
pub use routes::create_router;
pub use state::{AppState, GitHubSearchFactory, SearchServiceFactory};
