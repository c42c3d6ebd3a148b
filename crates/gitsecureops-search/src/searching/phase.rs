//! Lifecycle of one search request

use crate::error::SearchError;
use std::fmt;

/// `Idle -> Resolving -> Searching(i/N) -> Aggregating -> Complete`
///
/// `Failed` is reachable from every phase except `Idle`. An empty resolution
/// goes from `Resolving` straight to `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Resolving,
    Searching {
        current: usize,
        total: usize,
    },
    Aggregating,
    Complete,
    Failed,
}

impl SearchPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Move to `next` if the machine allows it
    ///
    /// # Errors
    /// Returns `SearchError::InvalidTransition` for any other move
    pub fn transition(self, next: Self) -> Result<Self, SearchError> {
        let allowed = match (self, next) {
            (Self::Idle, Self::Resolving)
            | (Self::Resolving, Self::Complete)
            | (Self::Aggregating, Self::Complete) => true,
            (Self::Resolving, Self::Searching { current, total }) => current == 0 && total > 0,
            (
                Self::Searching { current, total },
                Self::Searching {
                    current: next_current,
                    total: next_total,
                },
            ) => total == next_total && next_current == current.saturating_add(1) && next_current <= total,
            (Self::Searching { .. }, Self::Aggregating) => true,
            (from, Self::Failed) => !matches!(from, Self::Idle) && !from.is_terminal(),
            _ => false,
        };

        if allowed {
            Ok(next)
        } else {
            Err(SearchError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Searching { current, total } => write!(f, "searching({current}/{total})"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
