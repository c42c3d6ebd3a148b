//! GitHub API client for GitSecureOps
//!
//! Wraps the handful of REST and code search endpoints the aggregator needs
//! behind the [`GitHubApi`] trait. [`GitHubClient`] is the `reqwest`
//! implementation; `MockGitHub` (feature `test-utils`) is an in-memory one.

pub mod client;
pub mod error;
pub mod models;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use client::{GitHubClient, build_http_client, parse_rate_limit};
pub use error::{GitHubError, GitHubResult};
pub use models::{CodeSearchItem, CodeSearchResponse, Owner, RateLimitStatus, Repository};
pub use traits::GitHubApi;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockCall, MockGitHub};
