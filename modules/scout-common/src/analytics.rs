//! Fire-and-forget analytics: events are pushed onto an unbounded channel
//! and drained independently by a background task. A full/slow/offline
//! analytics backend never blocks a run (Design Notes §9).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    RunStarted {
        scout_id: Uuid,
        execution_id: Uuid,
        at: DateTime<Utc>,
    },
    RunCompleted {
        scout_id: Uuid,
        execution_id: Uuid,
        duplicate: bool,
        at: DateTime<Utc>,
    },
    RunFailed {
        scout_id: Uuid,
        execution_id: Uuid,
        reason: String,
        at: DateTime<Utc>,
    },
    ScoutDeactivated {
        scout_id: Uuid,
        user_id: Uuid,
        reason: String,
        at: DateTime<Utc>,
    },
    CredentialInvalidated {
        user_id: Uuid,
        reason: String,
        at: DateTime<Utc>,
    },
    NotificationFailed {
        scout_id: Uuid,
        execution_id: Uuid,
        reason: String,
        at: DateTime<Utc>,
    },
}

/// Cheap, cloneable handle for emitting analytics events. Send is
/// best-effort: a dropped receiver (shutdown in progress) just drops the
/// event.
#[derive(Clone)]
pub struct AnalyticsSink {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl AnalyticsSink {
    pub fn emit(&self, event: AnalyticsEvent) {
        let _ = self.tx.send(event);
    }
}

/// Construct a sink plus the receiver end for the draining task. The caller
/// (a binary's `main`) owns spawning the drain loop.
pub fn channel() -> (AnalyticsSink, mpsc::UnboundedReceiver<AnalyticsEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AnalyticsSink { tx }, rx)
}

/// Drains events from the channel and POSTs them one at a time to the
/// configured ingestion endpoint. Errors are logged and otherwise
/// swallowed — analytics delivery never affects run status.
pub async fn drain(
    mut rx: mpsc::UnboundedReceiver<AnalyticsEvent>,
    endpoint: Option<String>,
    api_key: Option<String>,
) {
    let Some(endpoint) = endpoint else {
        // No analytics backend configured: drain and discard so the
        // channel never backs up.
        while rx.recv().await.is_some() {}
        return;
    };
    let client = reqwest::Client::new();
    while let Some(event) = rx.recv().await {
        let mut req = client.post(&endpoint).json(&event);
        if let Some(ref key) = api_key {
            req = req.bearer_auth(key);
        }
        if let Err(e) = req.send().await {
            tracing::warn!(error = %e, "analytics event delivery failed");
        }
    }
}
