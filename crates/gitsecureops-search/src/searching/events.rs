use crate::model::{ProgressEvent, SearchResult};
use serde::Serialize;

/// What a streaming search publishes
///
/// Zero or more `Progress` events, then exactly one `Complete` or `Failed`,
/// after which the channel closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchEvent {
    Progress(ProgressEvent),
    Complete(SearchResult),
    #[serde(rename = "error")]
    Failed { message: String },
}

impl SearchEvent {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}
