//! Pacing for per-repository search calls
//!
//! Two rules, whichever asks for the longer wait:
//! - consecutive calls are at least `min_interval` apart
//! - once the observed search budget drops to `reserve`, wait for the reset
//!   instant, never longer than `max_wait`

use chrono::{DateTime, Utc};
use gitsecureops_config::SearchConfig;
use gitsecureops_github::RateLimitStatus;
use std::time::Duration;
use tokio::time::Instant;

/// Per-request throttle state
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    reserve: u32,
    max_wait: Duration,
    last_call: Option<Instant>,
}

impl Throttle {
    pub const fn new(min_interval: Duration, reserve: u32, max_wait: Duration) -> Self {
        Self {
            min_interval,
            reserve,
            max_wait,
            last_call: None,
        }
    }

    pub const fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.inter_repository_delay(),
            config.rate_limit_reserve,
            config.max_rate_limit_wait(),
        )
    }

    /// Delay before the next call given the current clocks
    pub fn next_delay(
        &self,
        now: Instant,
        wall_clock: DateTime<Utc>,
        rate_limit: Option<&RateLimitStatus>,
    ) -> Duration {
        let since_last = self
            .last_call
            .map(|last| now.saturating_duration_since(last));
        compute_delay(
            since_last,
            self.min_interval,
            rate_limit,
            self.reserve,
            self.max_wait,
            wall_clock,
        )
    }

    /// Sleep as long as the rules require, then mark a call as started
    pub async fn wait(&mut self, rate_limit: Option<RateLimitStatus>) {
        let delay = self.next_delay(Instant::now(), Utc::now(), rate_limit.as_ref());
        if !delay.is_zero() {
            tracing::trace!(delay_ms = delay.as_millis(), "Throttling search call");
            tokio::time::sleep(delay).await;
        }
        self.last_call = Some(Instant::now());
    }
}

/// Pure delay computation behind [`Throttle::next_delay`]
pub fn compute_delay(
    since_last: Option<Duration>,
    min_interval: Duration,
    rate_limit: Option<&RateLimitStatus>,
    reserve: u32,
    max_wait: Duration,
    now: DateTime<Utc>,
) -> Duration {
    let interval_wait =
        since_last.map_or(Duration::ZERO, |elapsed| min_interval.saturating_sub(elapsed));

    let budget_wait = rate_limit
        .filter(|status| status.remaining <= reserve)
        .map_or(Duration::ZERO, |status| {
            (status.reset_at - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(max_wait)
        });

    interval_wait.max(budget_wait)
}
