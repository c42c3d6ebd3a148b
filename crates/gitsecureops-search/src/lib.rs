//! GitSecureOps search aggregation crate
//!
//! Resolves a scope (the user's repositories, one or more organizations, or
//! an explicit list) into repositories, runs one throttled code search per
//! repository, and merges the hits into a single ranked result. Results can
//! be returned in one piece or streamed as progress events.

pub mod aggregating;
pub mod error;
pub mod executing;
pub mod ledger;
pub mod model;
pub mod resolving;
pub mod searching;

// Re-export main types
pub use aggregating::{SearchAccumulator, aggregate};
pub use error::SearchError;
pub use executing::{CONTENT_UNAVAILABLE, Executor, Throttle};
pub use ledger::CallLedger;
pub use model::{
    ProgressEvent, RepoRef, SearchFilters, SearchHit, SearchRequest, SearchResult, SearchScope,
    Snippet,
};
pub use resolving::{Resolution, Resolver};
pub use searching::{Search, SearchEvent, SearchPhase, SearchService};

// Re-export test utilities when test-utils feature is enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks {
    pub use crate::searching::test_utils::MockSearch;
}
