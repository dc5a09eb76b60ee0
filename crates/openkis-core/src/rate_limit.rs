//! Shared per-environment call budget.
//!
//! One [`RateGate`] instance guards all calls into a single environment.
//! The quota refills continuously (one cell every `window / capacity`)
//! instead of resetting at window boundaries, so sustained bursts keep a
//! lower bound on the interval between consecutive admissions.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::environment::{Environment, RateBudget};
use crate::error::ApiError;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default bound on how long one call may wait for budget.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct RateGate {
    environment: Environment,
    limiter: Arc<DirectRateLimiter>,
    max_wait: Duration,
}

impl RateGate {
    /// Gate sized to the environment's fixed upstream budget.
    pub fn new(environment: Environment) -> Self {
        Self::with_budget(environment, environment.rate_budget(), DEFAULT_MAX_WAIT)
    }

    pub fn with_budget(environment: Environment, budget: RateBudget, max_wait: Duration) -> Self {
        Self {
            environment,
            limiter: Arc::new(RateLimiter::direct(quota_from_budget(budget))),
            max_wait,
        }
    }

    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Wait for one budget cell, or fail with a rate-limit error once the
    /// bounded wait elapses. Dropping the returned future before it
    /// completes consumes nothing.
    pub async fn acquire(&self) -> Result<(), ApiError> {
        match tokio::time::timeout(self.max_wait, self.limiter.until_ready()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(ApiError::rate_limited(format!(
                "{} call budget still exhausted after {:.1}s",
                self.environment,
                self.max_wait.as_secs_f64()
            ))),
        }
    }

    /// Non-blocking probe; used by tests asserting admission counts.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

/// Allow the full capacity as burst, refilled one cell per
/// `window / capacity`.
fn quota_from_budget(budget: RateBudget) -> Quota {
    let capacity = budget.capacity.max(1);
    let burst = NonZeroU32::new(capacity).expect("capacity clamped to non-zero");
    let period = budget.cell_period().max(Duration::from_millis(1));

    Quota::with_period(period)
        .expect("cell period is non-zero")
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst_budget(capacity: u32) -> RateBudget {
        RateBudget {
            capacity,
            window: Duration::from_secs(60),
        }
    }

    #[test]
    fn admits_exactly_capacity_in_a_burst() {
        let gate = RateGate::with_budget(
            Environment::Paper,
            burst_budget(3),
            Duration::from_millis(10),
        );

        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire(), "fourth admission must be denied");
    }

    #[test]
    fn environments_never_share_budget() {
        let live = RateGate::with_budget(
            Environment::Live,
            burst_budget(2),
            Duration::from_millis(10),
        );
        let paper = RateGate::with_budget(
            Environment::Paper,
            burst_budget(2),
            Duration::from_millis(10),
        );

        assert!(live.try_acquire());
        assert!(live.try_acquire());
        assert!(!live.try_acquire());

        // Draining the live gate leaves the paper budget untouched.
        assert!(paper.try_acquire());
        assert!(paper.try_acquire());
    }

    #[tokio::test]
    async fn exhausted_gate_times_out_with_rate_limit_error() {
        let gate = RateGate::with_budget(
            Environment::Paper,
            burst_budget(1),
            Duration::from_millis(20),
        );

        gate.acquire().await.expect("first admission");
        let error = gate.acquire().await.expect_err("second must time out");
        assert_eq!(error.kind(), crate::error::ErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn budget_refills_continuously() {
        let gate = RateGate::with_budget(
            Environment::Paper,
            RateBudget {
                capacity: 1,
                window: Duration::from_millis(30),
            },
            Duration::from_secs(1),
        );

        gate.acquire().await.expect("first");
        // Second admission waits out roughly one cell period, well inside
        // the bounded wait.
        gate.acquire().await.expect("second after refill");
    }
}
