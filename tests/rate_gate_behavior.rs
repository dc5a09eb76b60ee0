//! Behavior tests for the per-environment rate gate.

use std::time::{Duration, Instant};

use openkis_core::{Environment, ErrorKind, RateBudget, RateGate};

#[test]
fn paper_budget_admits_two_per_second_burst() {
    // Given: the fixed paper-trading budget
    let gate = RateGate::new(Environment::Paper);

    // Then: exactly two immediate admissions
    assert!(gate.try_acquire());
    assert!(gate.try_acquire());
    assert!(!gate.try_acquire(), "third paper call must wait");
}

#[test]
fn live_budget_admits_twenty_per_second_burst() {
    let gate = RateGate::new(Environment::Live);

    for i in 0..20 {
        assert!(gate.try_acquire(), "admission {i} within capacity");
    }
    assert!(!gate.try_acquire(), "twenty-first live call must wait");
}

#[test]
fn live_and_paper_gates_never_share_budget() {
    // Given: one gate per environment
    let live = RateGate::new(Environment::Live);
    let paper = RateGate::new(Environment::Paper);

    // When: the paper budget is fully drained
    assert!(paper.try_acquire());
    assert!(paper.try_acquire());
    assert!(!paper.try_acquire());

    // Then: the live budget is untouched
    assert!(live.try_acquire());
}

#[tokio::test]
async fn sustained_calls_are_paced_by_the_refill_rate() {
    // Given: two calls per 100ms, refilled one cell per 50ms
    let gate = RateGate::with_budget(
        Environment::Paper,
        RateBudget {
            capacity: 2,
            window: Duration::from_millis(100),
        },
        Duration::from_secs(5),
    );

    // When: four calls run back to back
    let started = Instant::now();
    for _ in 0..4 {
        gate.acquire().await.expect("admission");
    }
    let elapsed = started.elapsed();

    // Then: the two beyond the burst waited for refills
    assert!(
        elapsed >= Duration::from_millis(80),
        "four calls finished in {elapsed:?}, faster than the refill rate allows"
    );
}

#[tokio::test]
async fn exhausted_budget_fails_after_the_bounded_wait() {
    // Given: a single-cell budget that refills far slower than the wait bound
    let gate = RateGate::with_budget(
        Environment::Paper,
        RateBudget {
            capacity: 1,
            window: Duration::from_secs(60),
        },
        Duration::from_millis(30),
    );
    gate.acquire().await.expect("first admission");

    // When: a second call waits out the bound
    let error = gate.acquire().await.expect_err("must time out");

    // Then: it fails as rate-limited instead of hanging
    assert_eq!(error.kind(), ErrorKind::RateLimited);
}
