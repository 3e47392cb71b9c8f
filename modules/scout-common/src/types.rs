use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CommonError;

/// Embedding dimension every LLM provider in this workspace is expected to
/// return. Treated as a type-level constant per Design Notes §9: rows whose
/// stored vector has any other length are rejected, not coerced.
pub const EMBEDDING_DIM: usize = 1536;

/// A validated, fixed-dimension embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self, CommonError> {
        if values.len() != EMBEDDING_DIM {
            return Err(CommonError::Validation(format!(
                "embedding must have {EMBEDDING_DIM} dimensions, got {}",
                values.len()
            )));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Hourly,
    Daily,
    EveryThreeDays,
    Weekly,
}

impl Frequency {
    /// The elapsed-time threshold a scout must clear since `last_run_at`
    /// before it becomes due again.
    pub fn period(&self) -> ChronoDuration {
        match self {
            Frequency::Hourly => ChronoDuration::hours(1),
            Frequency::Daily => ChronoDuration::hours(24),
            Frequency::EveryThreeDays => ChronoDuration::hours(72),
            Frequency::Weekly => ChronoDuration::days(7),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Hourly => write!(f, "hourly"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::EveryThreeDays => write!(f, "every_3_days"),
            Frequency::Weekly => write!(f, "weekly"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = CommonError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "every_3_days" => Ok(Self::EveryThreeDays),
            "weekly" => Ok(Self::Weekly),
            other => Err(CommonError::Validation(format!(
                "unknown frequency: {other}"
            ))),
        }
    }
}

/// Optional geo bias for a scout's searches. The sentinel `{city: "any", lat:
/// 0, lon: 0}` means "no geo bias" — constructed via `Location::any()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    /// Free-text country/region hint, carried alongside the sentinel rules
    /// above (supplements the distilled spec — used only to pick the
    /// search provider's default ISO country code when `city` contains no
    /// comma, per spec.md §4.A).
    pub country_hint: Option<String>,
}

impl Location {
    pub fn any() -> Self {
        Self {
            city: "any".to_string(),
            lat: 0.0,
            lon: 0.0,
            country_hint: None,
        }
    }

    pub fn is_geo_biased(&self) -> bool {
        self.city != "any"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum WaitFor {
    Ms(u64),
    Selector(String),
}

/// Per-scout scrape options. Carried as an opaque struct from scout through
/// the agent loop to the adapter; never spliced into a prompt string
/// (Design Notes §9).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeOptions {
    pub cookies: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub wait_for: Option<WaitFor>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub goal: String,
    pub description: String,
    pub queries: Vec<String>,
    pub location: Location,
    pub frequency: Frequency,
    pub scrape_options: ScrapeOptions,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl Scout {
    /// A scout's configuration is complete iff it has between 1 and 5
    /// queries (spec.md §3) and a non-empty title/goal.
    pub fn is_configuration_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.goal.trim().is_empty()
            && !self.queries.is_empty()
            && self.queries.len() <= 5
            && self.queries.iter().all(|q| !q.trim().is_empty())
    }

    /// Due iff active, complete, and either never run or the elapsed time
    /// since `last_run_at` has reached the frequency's period.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active || !self.is_configuration_complete() {
            return false;
        }
        match self.last_run_at {
            None => true,
            Some(last) => now - last >= self.frequency.period(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub scout_id: Uuid,
    pub status: ExecutionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub results_summary: Option<serde_json::Value>,
    pub summary_text: Option<String>,
    pub summary_embedding: Option<Embedding>,
    /// Open Question resolution (§9): an explicit column rather than
    /// relying solely on the response-text annotation.
    pub duplicate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    ToolCall,
    Search,
    Scrape,
    Summarize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub execution_id: Uuid,
    pub step_number: u32,
    pub step_type: StepType,
    pub description: String,
    pub input_data: Option<serde_json::Value>,
    pub output_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFinding {
    pub scout_id: Uuid,
    pub execution_id: Uuid,
    pub summary_text: String,
    pub embedding: Embedding,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Active,
    Invalid,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub key: String,
    pub status: CredentialStatus,
    pub last_invalid_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("user_id", &self.user_id)
            .field("key", &"<redacted>")
            .field("status", &self.status)
            .field("last_invalid_reason", &self.last_invalid_reason)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl std::fmt::Debug for Scout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scout")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("title", &self.title)
            .field("is_active", &self.is_active)
            .field("last_run_at", &self.last_run_at)
            .field("consecutive_failures", &self.consecutive_failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scout() -> Scout {
        Scout {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "AI News".to_string(),
            goal: "Track AI news".to_string(),
            description: String::new(),
            queries: vec!["AI news".to_string(), "artificial intelligence news".to_string()],
            location: Location::any(),
            frequency: Frequency::Daily,
            scrape_options: ScrapeOptions::default(),
            is_active: true,
            last_run_at: None,
            consecutive_failures: 0,
        }
    }

    #[test]
    fn first_run_scout_is_immediately_due() {
        let scout = sample_scout();
        assert!(scout.is_due(Utc::now()));
    }

    #[test]
    fn scout_not_due_before_period_elapses() {
        let mut scout = sample_scout();
        scout.last_run_at = Some(Utc::now());
        assert!(!scout.is_due(Utc::now()));
    }

    #[test]
    fn scout_due_after_period_elapses() {
        let mut scout = sample_scout();
        scout.last_run_at = Some(Utc::now() - ChronoDuration::hours(25));
        assert!(scout.is_due(Utc::now()));
    }

    #[test]
    fn inactive_scout_never_due() {
        let mut scout = sample_scout();
        scout.is_active = false;
        assert!(!scout.is_due(Utc::now()));
    }

    #[test]
    fn incomplete_scout_never_due() {
        let mut scout = sample_scout();
        scout.queries.clear();
        assert!(!scout.is_configuration_complete());
        assert!(!scout.is_due(Utc::now()));
    }

    #[test]
    fn too_many_queries_is_incomplete() {
        let mut scout = sample_scout();
        scout.queries = (0..6).map(|i| format!("q{i}")).collect();
        assert!(!scout.is_configuration_complete());
    }

    #[test]
    fn frequency_round_trips_through_display_and_from_str() {
        for f in [
            Frequency::Hourly,
            Frequency::Daily,
            Frequency::EveryThreeDays,
            Frequency::Weekly,
        ] {
            let s = f.to_string();
            let parsed: Frequency = s.parse().unwrap();
            assert_eq!(parsed, f);
        }
    }

    #[test]
    fn unknown_frequency_rejected() {
        assert!("monthly".parse::<Frequency>().is_err());
    }

    #[test]
    fn embedding_rejects_wrong_dimension() {
        assert!(Embedding::new(vec![0.0; 10]).is_err());
        assert!(Embedding::new(vec![0.0; EMBEDDING_DIM]).is_ok());
    }
}
