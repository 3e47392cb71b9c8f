//! Finds due scouts and fires one `/execute` request per scout at the
//! executor (spec.md §4.D). Grounded in the teacher's
//! `rest/scout::start_scout_interval` loop shape, split here into a
//! fan-out of individually-spawned HTTP calls instead of one sequential
//! in-process run, since each scout's execution now lives behind an HTTP
//! boundary rather than a function call.

use chrono::Utc;
use scout_store::ScoutStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lists every due scout and spawns one detached POST per scout. Does not
/// wait for any of them to finish — the executor claims its own run and
/// this loop just needs to have offered the scout a chance to run this
/// tick.
pub async fn dispatch_due_scouts(scouts: &ScoutStore, http: &reqwest::Client, executor_base_url: &str) {
    let now = Utc::now();
    let due = match scouts.list_due(now).await {
        Ok(due) => due,
        Err(e) => {
            warn!(error = %e, "failed to list due scouts");
            return;
        }
    };

    if due.is_empty() {
        debug!("no scouts due this tick");
        return;
    }

    info!(count = due.len(), "dispatching due scouts");
    for scout in due {
        let http = http.clone();
        let url = format!("{executor_base_url}/execute");
        tokio::spawn(async move {
            post_execute(&http, &url, scout.id).await;
        });
    }
}

async fn post_execute(http: &reqwest::Client, url: &str, scout_id: Uuid) {
    let response = http
        .post(url)
        .json(&serde_json::json!({ "scoutId": scout_id }))
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().as_u16() == 409 => {
            debug!(%scout_id, "executor reports a run already in progress, skipping");
        }
        Ok(resp) if !resp.status().is_success() => {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(%scout_id, status, body, "executor rejected dispatch");
        }
        Ok(_) => {
            debug!(%scout_id, "dispatched");
        }
        Err(e) => {
            warn!(%scout_id, error = %e, "failed to reach executor");
        }
    }
}
