//! Wires credential resolution, the agent loop, dedup, and notification
//! into one scout execution (spec.md §4.C/§4.E end to end).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scout_agent::{
    run, AgentOutcome, CredentialSignalHandler, RunConfig, RunContext, RunError, StepRecorder,
};
use scout_agent::tools::{ScrapeWebsiteTool, WebSearchTool};
use scout_common::{AnalyticsEvent, Execution, ExecutionStatus, Scout, Step};
use scout_llm::tool::{DynTool, ToolWrapper};
use scout_store::{ClaimOutcome, FinishExecutionInput, ScoutPostRunUpdate};
use scout_webtool::error::CredentialSignal;
use scout_webtool::WebtoolClient;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::state::AppState;

struct StoreStepRecorder {
    steps: scout_store::StepStore,
}

#[async_trait]
impl StepRecorder for StoreStepRecorder {
    async fn started(&self, step: Step) {
        if let Err(e) = self.steps.append(&step).await {
            warn!(error = %e, execution_id = %step.execution_id, step_number = step.step_number, "failed to persist step start");
        }
    }

    async fn finished(
        &self,
        execution_id: Uuid,
        step_number: u32,
        output_data: Option<serde_json::Value>,
        error_message: Option<String>,
        status: ExecutionStatus,
    ) {
        if let Err(e) = self
            .steps
            .update_outcome(execution_id, step_number, output_data, error_message, status)
            .await
        {
            warn!(error = %e, %execution_id, step_number, "failed to persist step outcome");
        }
    }
}

struct ResolverCredentialHandler {
    user_id: Uuid,
    resolver: Arc<scout_credentials::CredentialResolver>,
}

#[async_trait]
impl CredentialSignalHandler for ResolverCredentialHandler {
    async fn handle(&self, signal: CredentialSignal) {
        if let Err(e) = self.resolver.handle_signal(self.user_id, signal).await {
            error!(error = %e, user_id = %self.user_id, "failed to record credential signal");
        }
    }
}

/// Runs one execution of `scout_id` start to finish, claiming the
/// at-most-one-running slot, dispatching the agent loop, and recording the
/// outcome. Returns the claimed execution id and the scout title for the
/// HTTP success response (spec.md §6).
pub async fn execute_scout(state: &AppState, scout_id: Uuid) -> Result<(Uuid, String), ExecutorError> {
    let scout = state.scouts.get(scout_id).await.map_err(|e| match e {
        scout_store::StoreError::ScoutNotFound(id) => ExecutorError::ScoutNotFound(id),
        other => ExecutorError::Store(other),
    })?;

    let execution_id = match state.executions.try_claim_running(scout_id).await? {
        ClaimOutcome::Claimed(id) => id,
        ClaimOutcome::AlreadyRunning(running) => {
            return Err(ExecutorError::AlreadyRunning(running.id))
        }
    };

    let title = scout.title.clone();
    tokio::spawn(run_and_finish(AppStateHandle::from(state), scout, execution_id));

    Ok((execution_id, title))
}

/// Cloneable handles into `AppState` cheap enough to move into the
/// detached task that actually runs the agent loop after the HTTP
/// response for "accepted" has already gone out.
#[derive(Clone)]
struct AppStateHandle {
    config: Arc<scout_common::AppConfig>,
    scouts: scout_store::ScoutStore,
    executions: scout_store::ExecutionStore,
    steps: scout_store::StepStore,
    credentials: Arc<scout_credentials::CredentialResolver>,
    credential_store: scout_store::CredentialStore,
    email: Arc<dyn scout_email::EmailSender>,
    analytics: scout_common::AnalyticsSink,
}

impl From<&AppState> for AppStateHandle {
    fn from(state: &AppState) -> Self {
        Self {
            config: state.config.clone(),
            scouts: state.scouts.clone(),
            executions: state.executions.clone(),
            steps: state.steps.clone(),
            credentials: state.credentials.clone(),
            credential_store: state.credential_store.clone(),
            email: state.email.clone(),
            analytics: state.analytics.clone(),
        }
    }
}

/// `LlmClient` carries no `Clone` impl, so a fresh one is built per
/// detached task from `AppConfig` rather than cloned off `AppState`.
async fn run_and_finish(handle_template: AppStateHandle, scout: Scout, execution_id: Uuid) {
    let endpoint = scout_llm::client::LlmEndpoint::from_config(&handle_template.config);
    let llm = scout_llm::LlmClient::new(
        handle_template.config.llm_api_key.clone(),
        endpoint,
        handle_template.config.http_timeout,
    );

    let outcome = run_one_execution(&handle_template, &llm, &scout, execution_id).await;
    finalize_execution(&handle_template, &scout, execution_id, outcome).await;
}

async fn run_one_execution(
    handle: &AppStateHandle,
    llm: &dyn scout_llm::LlmProvider,
    scout: &Scout,
    execution_id: Uuid,
) -> Result<AgentOutcome, RunError> {
    handle.analytics.emit(AnalyticsEvent::RunStarted {
        scout_id: scout.id,
        execution_id,
        at: Utc::now(),
    });

    let api_key = handle
        .credentials
        .resolve(scout.user_id)
        .await
        .map_err(|_| RunError::CredentialInvalid)?;

    let webtool = Arc::new(WebtoolClient::new(
        handle.config.webtool_base_url.clone(),
        api_key,
        handle.config.http_timeout,
    ));

    let recent = handle
        .executions
        .list_recent_completed_with_embedding(scout.id, handle.config.recent_findings_limit as i64)
        .await
        .unwrap_or_default();

    let max_age_secs = scout.frequency.period().num_seconds().max(0) as u64;

    let search_tool: Arc<dyn DynTool> = Arc::new(ToolWrapper(WebSearchTool {
        webtool: webtool.clone(),
        location: Some(scout.location.clone()),
        scrape_options: scout.scrape_options.clone(),
        max_age_secs,
    }));
    let scrape_tool: Arc<dyn DynTool> = Arc::new(ToolWrapper(ScrapeWebsiteTool {
        webtool: webtool.clone(),
        scrape_options: scout.scrape_options.clone(),
        max_age_secs,
    }));
    let tools = vec![search_tool, scrape_tool];

    let steps = StoreStepRecorder {
        steps: handle.steps.clone(),
    };
    let credential_handler = ResolverCredentialHandler {
        user_id: scout.user_id,
        resolver: handle.credentials.clone(),
    };
    let config = RunConfig {
        max_loops: handle.config.max_agent_loops,
        max_consecutive_tool_errors: handle.config.max_consecutive_tool_errors,
        embedding_model: handle.config.embedding_model.clone(),
        dedup_similarity_threshold: handle.config.dedup_similarity_threshold,
    };

    run(RunContext {
        execution_id,
        scout,
        recent_findings: &recent,
        now: Utc::now(),
        llm,
        tools: &tools,
        steps: &steps,
        credentials: &credential_handler,
        config: &config,
    })
    .await
}

async fn finalize_execution(
    handle: &AppStateHandle,
    scout: &Scout,
    execution_id: Uuid,
    outcome: Result<AgentOutcome, RunError>,
) {
    let now = Utc::now();

    match outcome {
        Ok(agent_outcome) => {
            let results_summary = Some(serde_json::json!({
                "taskCompleted": agent_outcome.task_completed,
                "taskStatus": agent_outcome.task_status,
                "response": agent_outcome.response,
            }));

            if let Err(e) = handle
                .executions
                .finish(
                    now,
                    FinishExecutionInput {
                        execution_id,
                        status: ExecutionStatus::Completed,
                        error_message: None,
                        results_summary,
                        summary_text: agent_outcome.summary_text.clone(),
                        summary_embedding: agent_outcome.summary_embedding,
                        duplicate: agent_outcome.duplicate,
                    },
                )
                .await
            {
                error!(error = %e, %execution_id, "failed to finish execution");
            }

            if let Err(e) = handle
                .scouts
                .update_post_run(scout.id, now, ScoutPostRunUpdate::Success, 0)
                .await
            {
                error!(error = %e, scout_id = %scout.id, "failed to update scout after run");
            }

            handle.analytics.emit(AnalyticsEvent::RunCompleted {
                scout_id: scout.id,
                execution_id,
                duplicate: agent_outcome.duplicate,
                at: now,
            });

            if should_notify(&agent_outcome) {
                notify_if_configured(handle, scout, execution_id, &agent_outcome).await;
            }
        }
        Err(run_error) => {
            if let Err(e) = handle
                .executions
                .finish(
                    now,
                    FinishExecutionInput {
                        execution_id,
                        status: ExecutionStatus::Failed,
                        error_message: Some(run_error.to_string()),
                        results_summary: None,
                        summary_text: None,
                        summary_embedding: None,
                        duplicate: false,
                    },
                )
                .await
            {
                error!(error = %e, %execution_id, "failed to finish failed execution");
            }

            if let Err(e) = handle
                .scouts
                .update_post_run(
                    scout.id,
                    now,
                    ScoutPostRunUpdate::Failure,
                    handle.config.consecutive_failures_to_deactivate,
                )
                .await
            {
                error!(error = %e, scout_id = %scout.id, "failed to update scout after failed run");
            }

            handle.analytics.emit(AnalyticsEvent::RunFailed {
                scout_id: scout.id,
                execution_id,
                reason: run_error.to_string(),
                at: now,
            });
        }
    }
}

/// Only a completed, genuinely-novel run should ever reach a human inbox
/// (spec.md §4.E step 7) — a partial run has nothing worth reporting, and a
/// duplicate has already been reported by whichever earlier run found it
/// first.
fn should_notify(agent_outcome: &AgentOutcome) -> bool {
    agent_outcome.task_completed && !agent_outcome.duplicate
}

async fn notify_if_configured(
    handle: &AppStateHandle,
    scout: &Scout,
    execution_id: Uuid,
    agent_outcome: &AgentOutcome,
) {
    let recipient = match handle.credential_store.get_notify_email(scout.user_id).await {
        Ok(email) => email,
        Err(e) => {
            warn!(error = %e, user_id = %scout.user_id, "no notify email configured, skipping notification");
            return;
        }
    };

    let execution = Execution {
        id: execution_id,
        scout_id: scout.id,
        status: ExecutionStatus::Completed,
        created_at: Utc::now(),
        completed_at: Some(Utc::now()),
        error_message: None,
        results_summary: None,
        summary_text: agent_outcome.summary_text.clone(),
        summary_embedding: agent_outcome.summary_embedding.clone(),
        duplicate: agent_outcome.duplicate,
    };

    scout_notify::send_success(
        handle.email.as_ref(),
        &handle.analytics,
        &recipient,
        scout,
        &execution,
    )
    .await;
}
