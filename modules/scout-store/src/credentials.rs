use chrono::{DateTime, Utc};
use scout_common::{CredentialRecord, CredentialStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    webtool_key: Option<String>,
    webtool_key_status: CredentialStatus,
    last_invalid_reason: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for CredentialRecord {
    type Error = StoreError;

    fn try_from(row: CredentialRow) -> Result<Self> {
        let key = row
            .webtool_key
            .ok_or(StoreError::CredentialNotFound(row.user_id))?;
        Ok(CredentialRecord {
            user_id: row.user_id,
            key,
            status: row.webtool_key_status,
            last_invalid_reason: row.last_invalid_reason,
            updated_at: row.updated_at,
        })
    }
}

/// Backs the per-user webtool key the credential resolver consumes
/// (spec.md §4.B). No shared fallback key lives here by design — a user
/// with no configured key is a hard `CredentialNotFound`, not a default.
#[derive(Clone)]
pub struct CredentialStore {
    pool: PgPool,
}

impl CredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<CredentialRecord> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"SELECT user_id, webtool_key, webtool_key_status, last_invalid_reason, updated_at
               FROM user_preferences WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::CredentialNotFound(user_id))?;

        row.try_into()
    }

    /// Recipient address for the notifier (spec.md §4.G). `user_preferences`
    /// is the one table that already tracks per-user settings, so the
    /// notify address lives there rather than in a separate users table.
    pub async fn get_notify_email(&self, user_id: Uuid) -> Result<String> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT notify_email FROM user_preferences WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(email,)| email)
            .ok_or(StoreError::CredentialNotFound(user_id))
    }

    /// 401 path (spec.md §4.B/§7): the key itself is bad, mark it invalid
    /// but leave the user's scouts active — a replaced key should resume
    /// them automatically.
    pub async fn mark_invalid(&self, user_id: Uuid, reason: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE user_preferences
               SET webtool_key_status = 'invalid', last_invalid_reason = $2, updated_at = now()
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Test/seed helper for configuring a user's webtool key and notify
    /// address directly.
    pub async fn upsert_active(&self, user_id: Uuid, key: &str, notify_email: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO user_preferences (user_id, notify_email, webtool_key, webtool_key_status, updated_at)
               VALUES ($1, $2, $3, 'active', now())
               ON CONFLICT (user_id)
               DO UPDATE SET notify_email = $2, webtool_key = $3, webtool_key_status = 'active',
                             last_invalid_reason = NULL, updated_at = now()"#,
        )
        .bind(user_id)
        .bind(notify_email)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
