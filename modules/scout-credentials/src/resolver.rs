use chrono::Utc;
use scout_common::{AnalyticsEvent, AnalyticsSink};
use scout_common::CredentialStatus;
use scout_store::{CredentialStore, ScoutStore, StoreError};
use scout_webtool::error::CredentialSignal;
use uuid::Uuid;

use crate::error::{CredentialError, Result};

/// Resolves and maintains the per-user webtool API key (spec.md §4.B).
/// Intentionally has no notion of a shared/fallback key and never retries
/// a 401/402 on the caller's behalf — a stale or exhausted key fails the
/// run it's used in, it is not silently worked around.
pub struct CredentialResolver {
    credentials: CredentialStore,
    scouts: ScoutStore,
    analytics: AnalyticsSink,
}

impl CredentialResolver {
    pub fn new(credentials: CredentialStore, scouts: ScoutStore, analytics: AnalyticsSink) -> Self {
        Self {
            credentials,
            scouts,
            analytics,
        }
    }

    /// Returns the active key for `user_id`, or an error if none is
    /// configured or the stored key is already marked invalid.
    pub async fn resolve(&self, user_id: Uuid) -> Result<String> {
        let record = match self.credentials.get(user_id).await {
            Ok(record) => record,
            Err(StoreError::CredentialNotFound(_)) => {
                return Err(CredentialError::Unavailable(user_id))
            }
            Err(e) => return Err(e.into()),
        };

        if record.status != CredentialStatus::Active {
            return Err(CredentialError::Unavailable(user_id));
        }

        Ok(record.key)
    }

    /// Reacts to a webtool call's 401/402 signal. Unauthorized only
    /// invalidates the key; billing exhaustion also disables every scout
    /// the user owns, since further runs would just repeat the failure
    /// (spec.md §4.B/§7).
    pub async fn handle_signal(&self, user_id: Uuid, signal: CredentialSignal) -> Result<()> {
        let reason = match signal {
            CredentialSignal::Unauthorized => "webtool key rejected (401)",
            CredentialSignal::BillingExhausted => "webtool billing exhausted (402)",
        };

        self.credentials.mark_invalid(user_id, reason).await?;
        self.analytics.emit(AnalyticsEvent::CredentialInvalidated {
            user_id,
            reason: reason.to_string(),
            at: Utc::now(),
        });

        if matches!(signal, CredentialSignal::BillingExhausted) {
            self.scouts.disable_all_for_user(user_id).await?;
        }

        Ok(())
    }
}
