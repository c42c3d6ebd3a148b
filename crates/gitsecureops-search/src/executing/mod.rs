//! Per-repository search execution
pub mod executor;
pub mod query;
pub mod snippets;
pub mod throttle;

pub use executor::Executor;
pub use query::build_scoped_query;
pub use snippets::{CONTENT_UNAVAILABLE, extract_snippets};
pub use throttle::Throttle;
