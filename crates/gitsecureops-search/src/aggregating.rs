//! Result accumulation and ranking

use crate::model::SearchHit;

/// Flatten per-repository hits, rank by descending score, keep `max_results`
///
/// The sort is stable, so equal scores keep resolution order. Returns the
/// pre-truncation total alongside the ranked hits.
pub fn aggregate(per_repository: Vec<Vec<SearchHit>>, max_results: usize) -> (usize, Vec<SearchHit>) {
    let mut hits: Vec<SearchHit> = per_repository.into_iter().flatten().collect();
    let total = hits.len();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(max_results);

    (total, hits)
}

/// Running state of one search request
///
/// Owned by the executor loop of a single request; never shared.
#[derive(Debug, Default)]
pub struct SearchAccumulator {
    per_repository: Vec<Vec<SearchHit>>,
    total_hits: usize,
    repositories_searched: usize,
    failed_repositories: Vec<String>,
}

impl SearchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the hits of one repository; returns the running total
    pub fn record_success(&mut self, hits: Vec<SearchHit>) -> usize {
        self.repositories_searched = self.repositories_searched.saturating_add(1);
        self.total_hits = self.total_hits.saturating_add(hits.len());
        self.per_repository.push(hits);
        self.total_hits
    }

    /// Count an attempted repository that contributed nothing
    pub fn record_failure(&mut self, full_name: &str) {
        self.repositories_searched = self.repositories_searched.saturating_add(1);
        self.failed_repositories.push(full_name.to_string());
    }

    pub const fn total_hits(&self) -> usize {
        self.total_hits
    }

    pub const fn repositories_searched(&self) -> usize {
        self.repositories_searched
    }

    pub fn failed_repositories(&self) -> &[String] {
        &self.failed_repositories
    }

    /// Rank and truncate; consumes the accumulator
    pub fn finish(self, max_results: usize) -> FinishedSearch {
        let (total_results, hits) = aggregate(self.per_repository, max_results);
        FinishedSearch {
            total_results,
            repositories_searched: self.repositories_searched,
            hits,
            failed_repositories: self.failed_repositories,
        }
    }
}

/// Output of [`SearchAccumulator::finish`]
#[derive(Debug)]
pub struct FinishedSearch {
    pub total_results: usize,
    pub repositories_searched: usize,
    pub hits: Vec<SearchHit>,
    pub failed_repositories: Vec<String>,
}
