use std::str::FromStr;

use chrono::{DateTime, Utc};
use scout_common::{Frequency, Location, Scout, ScrapeOptions};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct ScoutRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    goal: String,
    description: String,
    queries: Json<Vec<String>>,
    location: Json<Location>,
    frequency: String,
    scrape_options: Json<ScrapeOptions>,
    is_active: bool,
    last_run_at: Option<DateTime<Utc>>,
    consecutive_failures: i32,
}

impl TryFrom<ScoutRow> for Scout {
    type Error = StoreError;

    fn try_from(row: ScoutRow) -> Result<Self> {
        let frequency = Frequency::from_str(&row.frequency)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(Scout {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            goal: row.goal,
            description: row.description,
            queries: row.queries.0,
            location: row.location.0,
            frequency,
            scrape_options: row.scrape_options.0,
            is_active: row.is_active,
            last_run_at: row.last_run_at,
            consecutive_failures: row.consecutive_failures.max(0) as u32,
        })
    }
}

/// Fields the executor updates on a scout after a run finishes (spec.md
/// §4.C `updateScoutPostRun`).
#[derive(Debug, Clone, Copy)]
pub enum ScoutPostRunUpdate {
    Success,
    Failure,
}

#[derive(Clone)]
pub struct ScoutStore {
    pool: PgPool,
}

impl ScoutStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, scout_id: Uuid) -> Result<Scout> {
        let row = sqlx::query_as::<_, ScoutRow>(
            r#"SELECT id, user_id, title, goal, description, queries, location,
                      frequency, scrape_options, is_active, last_run_at, consecutive_failures
               FROM scouts WHERE id = $1"#,
        )
        .bind(scout_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ScoutNotFound(scout_id))?;

        row.try_into()
    }

    /// Every scout where `is_active ∧ due(frequency, last_run_at, now)`
    /// (spec.md §4.D). Configuration-completeness is re-checked in Rust
    /// (`Scout::is_due`) rather than encoded in SQL, so the eligibility
    /// predicate has exactly one implementation.
    pub async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Scout>> {
        let rows = sqlx::query_as::<_, ScoutRow>(
            r#"SELECT id, user_id, title, goal, description, queries, location,
                      frequency, scrape_options, is_active, last_run_at, consecutive_failures
               FROM scouts WHERE is_active"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut due = Vec::new();
        for row in rows {
            let scout: Scout = row.try_into()?;
            if scout.is_due(now) {
                due.push(scout);
            }
        }
        Ok(due)
    }

    pub async fn update_post_run(
        &self,
        scout_id: Uuid,
        now: DateTime<Utc>,
        outcome: ScoutPostRunUpdate,
        deactivate_threshold: u32,
    ) -> Result<()> {
        match outcome {
            ScoutPostRunUpdate::Success => {
                sqlx::query(
                    r#"UPDATE scouts SET last_run_at = $2, consecutive_failures = 0, updated_at = now()
                       WHERE id = $1"#,
                )
                .bind(scout_id)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
            ScoutPostRunUpdate::Failure => {
                sqlx::query(
                    r#"UPDATE scouts
                       SET last_run_at = $2,
                           consecutive_failures = consecutive_failures + 1,
                           is_active = CASE WHEN consecutive_failures + 1 >= $3 THEN FALSE ELSE is_active END,
                           updated_at = now()
                       WHERE id = $1"#,
                )
                .bind(scout_id)
                .bind(now)
                .bind(deactivate_threshold as i32)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Disables every scout owned by `user_id` (spec.md §4.B, 402 path).
    pub async fn disable_all_for_user(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE scouts SET is_active = FALSE, updated_at = now() WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Test/seed helper — the conversational configuration UI (out of
    /// scope) is the real producer of scout rows in production.
    pub async fn create(&self, scout: &Scout) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO scouts
                (id, user_id, title, goal, description, queries, location, frequency,
                 scrape_options, is_active, last_run_at, consecutive_failures)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(scout.id)
        .bind(scout.user_id)
        .bind(&scout.title)
        .bind(&scout.goal)
        .bind(&scout.description)
        .bind(Json(&scout.queries))
        .bind(Json(&scout.location))
        .bind(scout.frequency.to_string())
        .bind(Json(&scout.scrape_options))
        .bind(scout.is_active)
        .bind(scout.last_run_at)
        .bind(scout.consecutive_failures as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
