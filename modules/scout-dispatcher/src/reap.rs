//! Fails executions stuck in `running` past the maximum wall-clock budget
//! (spec.md §4.D). Guards against an executor process dying mid-run and
//! leaving the partial-unique-running-index slot permanently occupied.

use chrono::{Duration, Utc};
use scout_store::ExecutionStore;
use tracing::{info, warn};

pub async fn reap_stale_executions(executions: &ExecutionStore, max_runtime: Duration) {
    match executions.reap_stale_running(Utc::now(), max_runtime).await {
        Ok(reaped) if !reaped.is_empty() => {
            info!(count = reaped.len(), ids = ?reaped, "reaped stale running executions");
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "failed to reap stale executions");
        }
    }
}
