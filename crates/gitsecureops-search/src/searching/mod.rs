//! Search orchestration: phase machine, events and the service
pub mod events;
pub mod phase;
pub mod search;
pub mod service;

pub use events::SearchEvent;
pub use phase::SearchPhase;
pub use search::Search;
pub use service::SearchService;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
