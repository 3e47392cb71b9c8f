use chrono::{DateTime, Duration, Utc};
use scout_common::{Embedding, Execution, ExecutionStatus, RecentFinding};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct ExecutionRow {
    id: Uuid,
    scout_id: Uuid,
    status: ExecutionStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    results_summary: Option<serde_json::Value>,
    summary_text: Option<String>,
    summary_embedding: Option<pgvector::Vector>,
    duplicate: bool,
}

impl TryFrom<ExecutionRow> for Execution {
    type Error = StoreError;

    fn try_from(row: ExecutionRow) -> Result<Self> {
        let summary_embedding = match row.summary_embedding {
            Some(v) => Some(
                Embedding::new(v.to_vec())
                    .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
            ),
            None => None,
        };
        Ok(Execution {
            id: row.id,
            scout_id: row.scout_id,
            status: row.status,
            created_at: row.created_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            results_summary: row.results_summary,
            summary_text: row.summary_text,
            summary_embedding,
            duplicate: row.duplicate,
        })
    }
}

/// Result of attempting to start a new run for a scout. The database's
/// partial unique index (`idx_scout_executions_one_running`) is the sole
/// arbiter of the at-most-one-running invariant; this type just names the
/// two outcomes of racing it.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Uuid),
    AlreadyRunning(Execution),
}

/// Everything `finishExecution` (spec.md §4.C) needs to close out a run,
/// whatever the outcome.
#[derive(Debug, Clone)]
pub struct FinishExecutionInput {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub results_summary: Option<serde_json::Value>,
    pub summary_text: Option<String>,
    pub summary_embedding: Option<Embedding>,
    pub duplicate: bool,
}

#[derive(Clone)]
pub struct ExecutionStore {
    pool: PgPool,
}

impl ExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new `running` execution for `scout_id`. If one is already
    /// running, the unique index rejects the insert and we fetch it back
    /// instead of erroring — the dispatcher treats this as "skip, not fail".
    pub async fn try_claim_running(&self, scout_id: Uuid) -> Result<ClaimOutcome> {
        // The competing execution can finish between our skipped INSERT and
        // the fallback SELECT below, so the SELECT coming up empty doesn't
        // mean an error — it means the slot just opened up. Re-attempt the
        // claim rather than surfacing a bogus "not found" in that case.
        const MAX_ATTEMPTS: u32 = 4;

        for attempt in 0..MAX_ATTEMPTS {
            let claimed: Option<(Uuid,)> = sqlx::query_as(
                r#"INSERT INTO scout_executions (scout_id, status)
                   VALUES ($1, 'running')
                   ON CONFLICT (scout_id) WHERE status = 'running' DO NOTHING
                   RETURNING id"#,
            )
            .bind(scout_id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some((id,)) = claimed {
                return Ok(ClaimOutcome::Claimed(id));
            }

            let row = sqlx::query_as::<_, ExecutionRow>(
                r#"SELECT id, scout_id, status, created_at, completed_at, error_message,
                          results_summary, summary_text, summary_embedding, duplicate
                   FROM scout_executions
                   WHERE scout_id = $1 AND status = 'running'
                   ORDER BY created_at DESC
                   LIMIT 1"#,
            )
            .bind(scout_id)
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => return Ok(ClaimOutcome::AlreadyRunning(row.try_into()?)),
                None if attempt + 1 < MAX_ATTEMPTS => continue,
                None => return Err(StoreError::Database(sqlx::Error::RowNotFound)),
            }
        }

        unreachable!("loop always returns by its last iteration")
    }

    pub async fn finish(&self, now: DateTime<Utc>, input: FinishExecutionInput) -> Result<()> {
        let embedding = input
            .summary_embedding
            .map(|e| pgvector::Vector::from(e.into_vec()));

        sqlx::query(
            r#"UPDATE scout_executions
               SET status = $2,
                   completed_at = $3,
                   error_message = $4,
                   results_summary = $5,
                   summary_text = $6,
                   summary_embedding = $7,
                   duplicate = $8
               WHERE id = $1"#,
        )
        .bind(input.execution_id)
        .bind(input.status)
        .bind(now)
        .bind(input.error_message)
        .bind(input.results_summary)
        .bind(input.summary_text)
        .bind(embedding)
        .bind(input.duplicate)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Findings used as dedup context for the next run of this scout
    /// (spec.md §4.C). Only completed executions with a summary carry an
    /// embedding worth comparing against; a past finding that was itself
    /// flagged as a duplicate still stays in the comparison window, since
    /// it represents the same real-world finding a future run must also
    /// recognize as already seen.
    pub async fn list_recent_completed_with_embedding(
        &self,
        scout_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentFinding>> {
        let rows = sqlx::query_as::<_, ExecutionRow>(
            r#"SELECT id, scout_id, status, created_at, completed_at, error_message,
                      results_summary, summary_text, summary_embedding, duplicate
               FROM scout_executions
               WHERE scout_id = $1
                 AND status = 'completed'
                 AND summary_text IS NOT NULL
                 AND summary_embedding IS NOT NULL
               ORDER BY completed_at DESC
               LIMIT $2"#,
        )
        .bind(scout_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut findings = Vec::with_capacity(rows.len());
        for row in rows {
            let completed_at = row
                .completed_at
                .ok_or_else(|| StoreError::Database(sqlx::Error::RowNotFound))?;
            let summary_text = row.summary_text.clone().unwrap_or_default();
            let execution: Execution = row.try_into()?;
            // The query's `summary_embedding IS NOT NULL` filter guarantees
            // this; `try_into` above would already have failed on a
            // malformed (wrong-dimension) vector rather than yielding `None`.
            let embedding = execution
                .summary_embedding
                .expect("query filters out rows with a null summary_embedding");
            findings.push(RecentFinding {
                scout_id: execution.scout_id,
                execution_id: execution.id,
                summary_text,
                embedding,
                completed_at,
            });
        }
        Ok(findings)
    }

    /// Marks executions stuck in `running` past the reap window as failed
    /// (spec.md §4.D reaper). Does not touch the owning scout's
    /// `consecutive_failures` — a stuck execution reflects infrastructure
    /// trouble, not the scout's own reliability.
    pub async fn reap_stale_running(
        &self,
        now: DateTime<Utc>,
        max_runtime: Duration,
    ) -> Result<Vec<Uuid>> {
        let cutoff = now - max_runtime;
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"UPDATE scout_executions
               SET status = 'failed',
                   completed_at = $2,
                   error_message = COALESCE(error_message, 'reaped: exceeded maximum run time')
               WHERE status = 'running' AND created_at < $1
               RETURNING id"#,
        )
        .bind(cutoff)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
