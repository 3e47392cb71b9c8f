//! Layer 2: at-most-one-running claim race.
//!
//! Two concurrent `try_claim_running` calls for the same scout → the
//! database's partial unique index must let exactly one through.
//!
//! **Requires:** Docker (for Postgres via testcontainers).
//!
//! Run with: cargo test -p scout-store --test claim_test --features test-utils

use scout_common::{Frequency, Location, ScrapeOptions};
use scout_store::{ClaimOutcome, ExecutionStore, ScoutStore};
use uuid::Uuid;

fn test_scout(user_id: Uuid) -> scout_common::Scout {
    scout_common::Scout {
        id: Uuid::new_v4(),
        user_id,
        title: "Test Scout".to_string(),
        goal: "find things".to_string(),
        description: String::new(),
        queries: vec!["test query".to_string()],
        location: Location::any(),
        frequency: Frequency::Daily,
        scrape_options: ScrapeOptions::default(),
        is_active: true,
        last_run_at: None,
        consecutive_failures: 0,
    }
}

#[tokio::test]
async fn only_one_concurrent_claim_succeeds() {
    let (_container, pool) = scout_store::testutil::postgres_container().await;

    let scouts = ScoutStore::new(pool.clone());
    let executions = ExecutionStore::new(pool);

    let scout = test_scout(Uuid::new_v4());
    scouts.create(&scout).await.expect("failed to create scout");

    let (first, second) = tokio::join!(
        executions.try_claim_running(scout.id),
        executions.try_claim_running(scout.id)
    );
    let first = first.expect("first claim attempt errored");
    let second = second.expect("second claim attempt errored");

    let claimed_count = [&first, &second]
        .iter()
        .filter(|outcome| matches!(outcome, ClaimOutcome::Claimed(_)))
        .count();
    let already_running_count = [&first, &second]
        .iter()
        .filter(|outcome| matches!(outcome, ClaimOutcome::AlreadyRunning(_)))
        .count();

    assert_eq!(claimed_count, 1, "exactly one concurrent claim must succeed");
    assert_eq!(
        already_running_count, 1,
        "the other concurrent claim must observe the run already in progress"
    );
}
