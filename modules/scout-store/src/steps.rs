use scout_common::{ExecutionStatus, Step, StepType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, sqlx::FromRow)]
struct StepRow {
    execution_id: Uuid,
    step_number: i32,
    step_type: StepType,
    description: String,
    input_data: Option<serde_json::Value>,
    output_data: Option<serde_json::Value>,
    error_message: Option<String>,
    status: ExecutionStatus,
}

impl From<StepRow> for Step {
    fn from(row: StepRow) -> Self {
        Step {
            execution_id: row.execution_id,
            step_number: row.step_number.max(0) as u32,
            step_type: row.step_type,
            description: row.description,
            input_data: row.input_data,
            output_data: row.output_data,
            error_message: row.error_message,
            status: row.status,
        }
    }
}

#[derive(Clone)]
pub struct StepStore {
    pool: PgPool,
}

impl StepStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends the next step in an execution's transcript (spec.md §4.E).
    /// Steps are immutable once the loop moves past them, so this is a
    /// plain insert, never an upsert.
    pub async fn append(&self, step: &Step) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO scout_execution_steps
                (execution_id, step_number, step_type, description, input_data,
                 output_data, error_message, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(step.execution_id)
        .bind(step.step_number as i32)
        .bind(step.step_type)
        .bind(&step.description)
        .bind(&step.input_data)
        .bind(&step.output_data)
        .bind(&step.error_message)
        .bind(step.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fills in a step's outcome once the tool call it records completes.
    /// Used when a step is written optimistically before the tool returns.
    pub async fn update_outcome(
        &self,
        execution_id: Uuid,
        step_number: u32,
        output_data: Option<serde_json::Value>,
        error_message: Option<String>,
        status: ExecutionStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE scout_execution_steps
               SET output_data = $3, error_message = $4, status = $5
               WHERE execution_id = $1 AND step_number = $2"#,
        )
        .bind(execution_id)
        .bind(step_number as i32)
        .bind(output_data)
        .bind(error_message)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_execution(&self, execution_id: Uuid) -> Result<Vec<Step>> {
        let rows = sqlx::query_as::<_, StepRow>(
            r#"SELECT execution_id, step_number, step_type, description, input_data,
                      output_data, error_message, status
               FROM scout_execution_steps
               WHERE execution_id = $1
               ORDER BY step_number ASC"#,
        )
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Step::from).collect())
    }
}
