//! The bounded tool-calling loop itself (spec.md §4.E). Owns no I/O beyond
//! what it is handed: an `LlmProvider`, a set of `DynTool`s keyed by name, a
//! `StepRecorder` for persistence, and a `CredentialSignalHandler` for
//! 401/402 delegation. `scout-executor` wires the concrete implementations
//! together; this module only knows the state machine.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scout_common::{Embedding, ExecutionStatus, RecentFinding, Scout, Step, StepType};
use scout_llm::provider::LlmProvider;
use scout_llm::tool::DynTool;
use scout_llm::types::Message;
use scout_webtool::error::CredentialSignal;
use uuid::Uuid;

use crate::dedup_note::annotate_if_duplicate;
use crate::error::RunError;
use crate::parsing::{parse_structured_response, TaskStatus};
use crate::prompt::{budget_reminder, build_system_prompt};

/// Persists step rows as the loop runs. A no-op/in-memory impl is enough
/// for tests; `scout-executor` backs this with `scout_store::StepStore`.
#[async_trait]
pub trait StepRecorder: Send + Sync {
    async fn started(&self, step: Step);
    async fn finished(
        &self,
        execution_id: Uuid,
        step_number: u32,
        output_data: Option<serde_json::Value>,
        error_message: Option<String>,
        status: ExecutionStatus,
    );
}

/// Delegates a detected credential problem back up to the caller, which
/// owns the database connection `scout-agent` deliberately does not.
#[async_trait]
pub trait CredentialSignalHandler: Send + Sync {
    async fn handle(&self, signal: CredentialSignal);
}

/// The terminal result of one run, independent of how it ended. `RunError`
/// is reserved for the genuinely fatal paths (LLM transport failure, 3
/// consecutive tool errors, a dead credential) — running out of loop
/// budget is not one of them and is represented here instead, as spec.md
/// §7 distinguishes "ran out of steps" (still `completed`) from "gave up"
/// (`failed`).
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub task_completed: bool,
    pub task_status: TaskStatus,
    pub response: String,
    pub summary_text: Option<String>,
    pub summary_embedding: Option<Embedding>,
    pub duplicate: bool,
}

pub struct RunConfig {
    pub max_loops: u32,
    pub max_consecutive_tool_errors: u32,
    pub embedding_model: String,
    pub dedup_similarity_threshold: f64,
}

pub struct RunContext<'a> {
    pub execution_id: Uuid,
    pub scout: &'a Scout,
    pub recent_findings: &'a [RecentFinding],
    pub now: DateTime<Utc>,
    pub llm: &'a dyn LlmProvider,
    pub tools: &'a [Arc<dyn DynTool>],
    pub steps: &'a dyn StepRecorder,
    pub credentials: &'a dyn CredentialSignalHandler,
    pub config: &'a RunConfig,
}

/// Runs the agent loop to completion (spec.md §4.E). Every exit other than
/// a fatal `RunError` produces an `AgentOutcome`, including exhausting
/// `max_loops` without the model emitting a final structured response.
pub async fn run(ctx: RunContext<'_>) -> Result<AgentOutcome, RunError> {
    let tool_defs: Vec<_> = ctx.tools.iter().map(|t| t.definition()).collect();
    let tools_by_name: HashMap<&str, &Arc<dyn DynTool>> =
        ctx.tools.iter().map(|t| (t.name(), t)).collect();

    let mut messages = vec![
        Message::system(build_system_prompt(ctx.scout, ctx.recent_findings, ctx.now)),
        Message::user(format!(
            "Begin. Configured queries: {}",
            ctx.scout.queries.join(", ")
        )),
    ];

    let mut consecutive_tool_errors: u32 = 0;
    let mut search_queries_used: u32 = 0;
    let mut step_number: u32 = 0;

    for loop_count in 1..=ctx.config.max_loops {
        if loop_count > 1 && loop_count % 3 == 0 {
            messages.push(Message::user(budget_reminder(
                loop_count,
                ctx.config.max_loops,
                search_queries_used,
            )));
        }

        let completion = ctx.llm.chat_complete(&messages, &tool_defs).await?;
        let assistant_message = completion.message;

        let tool_calls = match &assistant_message.tool_calls {
            Some(calls) if !calls.is_empty() => calls.clone(),
            _ => {
                let raw = assistant_message.content.clone().unwrap_or_default();
                let parsed = parse_structured_response(&raw);
                return finalize(ctx, parsed.task_completed, parsed.task_status, parsed.response)
                    .await;
            }
        };
        messages.push(assistant_message);

        for call in tool_calls {
            step_number += 1;
            let step_type = match call.name.as_str() {
                "searchWeb" => {
                    search_queries_used += 1;
                    StepType::Search
                }
                "scrapeWebsite" => StepType::Scrape,
                _ => StepType::ToolCall,
            };

            ctx.steps
                .started(Step {
                    execution_id: ctx.execution_id,
                    step_number,
                    step_type,
                    description: call.name.clone(),
                    input_data: Some(call.arguments.clone()),
                    output_data: None,
                    error_message: None,
                    status: ExecutionStatus::Running,
                })
                .await;

            let Some(tool) = tools_by_name.get(call.name.as_str()) else {
                let error_message = format!("unknown tool: {}", call.name);
                ctx.steps
                    .finished(
                        ctx.execution_id,
                        step_number,
                        None,
                        Some(error_message.clone()),
                        ExecutionStatus::Failed,
                    )
                    .await;
                messages.push(Message::tool_result(call.id.clone(), error_message.as_str()));
                consecutive_tool_errors += 1;
                if consecutive_tool_errors >= ctx.config.max_consecutive_tool_errors {
                    return Err(RunError::ConsecutiveToolErrors(
                        consecutive_tool_errors,
                        error_message,
                    ));
                }
                continue;
            };

            match tool.call_json(call.arguments.clone()).await {
                Ok(output) => {
                    consecutive_tool_errors = 0;
                    ctx.steps
                        .finished(
                            ctx.execution_id,
                            step_number,
                            Some(output.clone()),
                            None,
                            ExecutionStatus::Completed,
                        )
                        .await;
                    messages.push(Message::tool_result(call.id.clone(), output.to_string()));
                }
                Err(error_message) => {
                    ctx.steps
                        .finished(
                            ctx.execution_id,
                            step_number,
                            None,
                            Some(error_message.clone()),
                            ExecutionStatus::Failed,
                        )
                        .await;
                    messages.push(Message::tool_result(call.id.clone(), error_message.as_str()));

                    if let Some(signal) = credential_signal_from_text(&error_message) {
                        ctx.credentials.handle(signal).await;
                        if signal == CredentialSignal::BillingExhausted {
                            return Err(RunError::BillingExhausted);
                        }
                        // Unauthorized: credential is now marked invalid, but this step's
                        // failure still falls through to ordinary consecutive-error counting
                        // below rather than aborting the run outright.
                    }

                    let exempt = call.name == "scrapeWebsite"
                        && call
                            .arguments
                            .get("url")
                            .and_then(|v| v.as_str())
                            .map(scout_webtool::blacklist::is_blacklisted)
                            .unwrap_or(false);

                    if !exempt {
                        consecutive_tool_errors += 1;
                        if consecutive_tool_errors >= ctx.config.max_consecutive_tool_errors {
                            return Err(RunError::ConsecutiveToolErrors(
                                consecutive_tool_errors,
                                error_message,
                            ));
                        }
                    }
                }
            }
        }
    }

    finalize(
        ctx,
        false,
        TaskStatus::Partial,
        "Stopped after reaching the step budget without a final answer.".to_string(),
    )
    .await
}

/// Re-derives `WebtoolError::credential_signal` from its rendered message,
/// since the typed signal does not survive the `DynTool::call_json` string
/// error channel. Matches the exact `"(status {code})"` fragment
/// `WebtoolError::Api`'s `Display` impl produces rather than a bare digit
/// substring, so a network error whose message happens to mention a port
/// or IP octet like "402" can't be mistaken for a billing failure.
fn credential_signal_from_text(text: &str) -> Option<CredentialSignal> {
    if text.contains("(status 402)") {
        Some(CredentialSignal::BillingExhausted)
    } else if text.contains("(status 401)") {
        Some(CredentialSignal::Unauthorized)
    } else {
        None
    }
}

async fn finalize(
    ctx: RunContext<'_>,
    task_completed: bool,
    task_status: TaskStatus,
    response: String,
) -> Result<AgentOutcome, RunError> {
    if !task_completed {
        return Ok(AgentOutcome {
            task_completed,
            task_status,
            response,
            summary_text: None,
            summary_embedding: None,
            duplicate: false,
        });
    }

    let embedding_values = ctx
        .llm
        .embed(&ctx.config.embedding_model, &response)
        .await?;
    let embedding = Embedding::new(embedding_values).map_err(|e| {
        RunError::LlmCallFailed(scout_llm::LlmError::Api {
            status: 0,
            message: e.to_string(),
        })
    })?;

    let best_match = scout_dedup::find_best_match(
        &embedding,
        ctx.recent_findings,
        ctx.config.dedup_similarity_threshold,
    );
    let duplicate = best_match.is_some();
    let summary_text = response.clone();
    let response = annotate_if_duplicate(response, best_match.as_ref());

    Ok(AgentOutcome {
        task_completed,
        task_status,
        response,
        summary_text: Some(summary_text),
        summary_embedding: Some(embedding),
        duplicate,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use scout_common::{Frequency, Location, ScrapeOptions};
    use scout_llm::tool::ToolDefinition;
    use scout_llm::types::ToolCall;
    use scout_llm::LlmError;

    use super::*;

    fn sample_scout() -> Scout {
        Scout {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Apartment watch".to_string(),
            goal: "Find new one-bedroom listings under $2000".to_string(),
            description: String::new(),
            queries: vec!["one bedroom apartment downtown".to_string()],
            location: Location::any(),
            frequency: Frequency::Daily,
            scrape_options: ScrapeOptions::default(),
            is_active: true,
            last_run_at: None,
            consecutive_failures: 0,
        }
    }

    struct NoopStepRecorder;

    #[async_trait]
    impl StepRecorder for NoopStepRecorder {
        async fn started(&self, _step: Step) {}
        async fn finished(
            &self,
            _execution_id: Uuid,
            _step_number: u32,
            _output_data: Option<serde_json::Value>,
            _error_message: Option<String>,
            _status: ExecutionStatus,
        ) {
        }
    }

    #[derive(Default)]
    struct RecordingCredentialHandler {
        signals: Mutex<Vec<CredentialSignal>>,
    }

    #[async_trait]
    impl CredentialSignalHandler for RecordingCredentialHandler {
        async fn handle(&self, signal: CredentialSignal) {
            self.signals.lock().unwrap().push(signal);
        }
    }

    /// Always answers with a final structured response on the first turn,
    /// never calling a tool.
    struct ImmediateCompletionLlm;

    #[async_trait]
    impl scout_llm::ChatProvider for ImmediateCompletionLlm {
        async fn chat_complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<scout_llm::ChatCompletion, LlmError> {
            Ok(scout_llm::ChatCompletion {
                message: Message::assistant(
                    Some(
                        r#"{"taskCompleted":true,"taskStatus":"completed","response":"Found a new listing at 12 Main St"}"#
                            .to_string(),
                    ),
                    None,
                ),
            })
        }
    }

    #[async_trait]
    impl scout_llm::EmbedProvider for ImmediateCompletionLlm {
        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![0.05; scout_common::EMBEDDING_DIM])
        }
    }

    /// Always calls `searchWeb` and never emits a final answer, forcing the
    /// loop to run out its step budget.
    struct AlwaysToolCallLlm;

    #[async_trait]
    impl scout_llm::ChatProvider for AlwaysToolCallLlm {
        async fn chat_complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<scout_llm::ChatCompletion, LlmError> {
            Ok(scout_llm::ChatCompletion {
                message: Message::assistant(
                    None,
                    Some(vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "searchWeb".to_string(),
                        arguments: serde_json::json!({"query": "one bedroom apartment"}),
                    }]),
                ),
            })
        }
    }

    #[async_trait]
    impl scout_llm::EmbedProvider for AlwaysToolCallLlm {
        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![0.0; scout_common::EMBEDDING_DIM])
        }
    }

    struct AlwaysOkTool;

    #[async_trait]
    impl DynTool for AlwaysOkTool {
        fn name(&self) -> &'static str {
            "searchWeb"
        }
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "searchWeb".to_string(),
                description: String::new(),
                parameters: serde_json::json!({}),
            }
        }
        async fn call_json(&self, _args: serde_json::Value) -> Result<serde_json::Value, String> {
            Ok(serde_json::json!({"results": []}))
        }
    }

    struct AlwaysErrTool {
        message: String,
    }

    #[async_trait]
    impl DynTool for AlwaysErrTool {
        fn name(&self) -> &'static str {
            "searchWeb"
        }
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "searchWeb".to_string(),
                description: String::new(),
                parameters: serde_json::json!({}),
            }
        }
        async fn call_json(&self, _args: serde_json::Value) -> Result<serde_json::Value, String> {
            Err(self.message.clone())
        }
    }

    /// Fails its first call (used to exercise the 401 path), succeeds on
    /// every call after that.
    struct FailOnceThenOkTool {
        calls: Mutex<u32>,
        failure_message: String,
    }

    #[async_trait]
    impl DynTool for FailOnceThenOkTool {
        fn name(&self) -> &'static str {
            "searchWeb"
        }
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "searchWeb".to_string(),
                description: String::new(),
                parameters: serde_json::json!({}),
            }
        }
        async fn call_json(&self, _args: serde_json::Value) -> Result<serde_json::Value, String> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                Err(self.failure_message.clone())
            } else {
                Ok(serde_json::json!({"results": []}))
            }
        }
    }

    fn base_config(max_loops: u32, max_consecutive_tool_errors: u32) -> RunConfig {
        RunConfig {
            max_loops,
            max_consecutive_tool_errors,
            embedding_model: "text-embedding-3-small".to_string(),
            dedup_similarity_threshold: 0.85,
        }
    }

    #[tokio::test]
    async fn terminates_on_first_structured_completion_without_any_tool_call() {
        let scout = sample_scout();
        let recent: Vec<RecentFinding> = vec![];
        let llm = ImmediateCompletionLlm;
        let tools: Vec<Arc<dyn DynTool>> = vec![];
        let steps = NoopStepRecorder;
        let credentials = RecordingCredentialHandler::default();
        let config = base_config(5, 3);

        let outcome = run(RunContext {
            execution_id: Uuid::new_v4(),
            scout: &scout,
            recent_findings: &recent,
            now: Utc::now(),
            llm: &llm,
            tools: &tools,
            steps: &steps,
            credentials: &credentials,
            config: &config,
        })
        .await
        .expect("run should complete");

        assert!(outcome.task_completed);
        assert_eq!(outcome.task_status, TaskStatus::Completed);
        assert!(!outcome.duplicate);
        assert!(outcome.summary_embedding.is_some());
    }

    #[tokio::test]
    async fn exhausting_loop_budget_yields_a_completed_partial_outcome() {
        let scout = sample_scout();
        let recent: Vec<RecentFinding> = vec![];
        let llm = AlwaysToolCallLlm;
        let tools: Vec<Arc<dyn DynTool>> = vec![Arc::new(AlwaysOkTool)];
        let steps = NoopStepRecorder;
        let credentials = RecordingCredentialHandler::default();
        let config = base_config(3, 10);

        let outcome = run(RunContext {
            execution_id: Uuid::new_v4(),
            scout: &scout,
            recent_findings: &recent,
            now: Utc::now(),
            llm: &llm,
            tools: &tools,
            steps: &steps,
            credentials: &credentials,
            config: &config,
        })
        .await
        .expect("running out of budget is not a RunError");

        assert!(!outcome.task_completed);
        assert_eq!(outcome.task_status, TaskStatus::Partial);
        assert!(outcome.summary_embedding.is_none());
    }

    #[tokio::test]
    async fn consecutive_tool_errors_abort_the_run() {
        let scout = sample_scout();
        let recent: Vec<RecentFinding> = vec![];
        let llm = AlwaysToolCallLlm;
        let tools: Vec<Arc<dyn DynTool>> = vec![Arc::new(AlwaysErrTool {
            message: "tool transport error".to_string(),
        })];
        let steps = NoopStepRecorder;
        let credentials = RecordingCredentialHandler::default();
        let config = base_config(10, 2);

        let result = run(RunContext {
            execution_id: Uuid::new_v4(),
            scout: &scout,
            recent_findings: &recent,
            now: Utc::now(),
            llm: &llm,
            tools: &tools,
            steps: &steps,
            credentials: &credentials,
            config: &config,
        })
        .await;

        match result {
            Err(RunError::ConsecutiveToolErrors(count, _)) => assert_eq!(count, 2),
            other => panic!("expected ConsecutiveToolErrors, got {other:?}"),
        }
        assert!(credentials.signals.lock().unwrap().is_empty());
    }

    /// A transient network error whose text happens to contain the digits
    /// "402" (e.g. a port number) must never be mistaken for a billing
    /// failure — only the exact "(status 402)" fragment a real API error
    /// renders should trigger `CredentialSignal::BillingExhausted`.
    #[tokio::test]
    async fn incidental_digits_in_error_text_do_not_signal_billing_exhaustion() {
        let scout = sample_scout();
        let recent: Vec<RecentFinding> = vec![];
        let llm = AlwaysToolCallLlm;
        let tools: Vec<Arc<dyn DynTool>> = vec![Arc::new(AlwaysErrTool {
            message: "network error: connection refused (127.0.0.1:8402)".to_string(),
        })];
        let steps = NoopStepRecorder;
        let credentials = RecordingCredentialHandler::default();
        let config = base_config(10, 2);

        let result = run(RunContext {
            execution_id: Uuid::new_v4(),
            scout: &scout,
            recent_findings: &recent,
            now: Utc::now(),
            llm: &llm,
            tools: &tools,
            steps: &steps,
            credentials: &credentials,
            config: &config,
        })
        .await;

        match result {
            Err(RunError::ConsecutiveToolErrors(count, _)) => assert_eq!(count, 2),
            other => panic!("expected ConsecutiveToolErrors, got {other:?}"),
        }
        assert!(credentials.signals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn billing_exhaustion_aborts_the_run_immediately() {
        let scout = sample_scout();
        let recent: Vec<RecentFinding> = vec![];
        let llm = AlwaysToolCallLlm;
        let tools: Vec<Arc<dyn DynTool>> = vec![Arc::new(AlwaysErrTool {
            message: "webtool API error (status 402): payment required".to_string(),
        })];
        let steps = NoopStepRecorder;
        let credentials = RecordingCredentialHandler::default();
        let config = base_config(10, 5);

        let result = run(RunContext {
            execution_id: Uuid::new_v4(),
            scout: &scout,
            recent_findings: &recent,
            now: Utc::now(),
            llm: &llm,
            tools: &tools,
            steps: &steps,
            credentials: &credentials,
            config: &config,
        })
        .await;

        assert!(matches!(result, Err(RunError::BillingExhausted)));
        assert_eq!(
            *credentials.signals.lock().unwrap(),
            vec![CredentialSignal::BillingExhausted]
        );
    }

    #[tokio::test]
    async fn unauthorized_marks_credential_invalid_but_does_not_abort_the_run() {
        let scout = sample_scout();
        let recent: Vec<RecentFinding> = vec![];
        let llm = AlwaysToolCallLlm;
        let tools: Vec<Arc<dyn DynTool>> = vec![Arc::new(FailOnceThenOkTool {
            calls: Mutex::new(0),
            failure_message: "webtool API error (status 401): unauthorized".to_string(),
        })];
        let steps = NoopStepRecorder;
        let credentials = RecordingCredentialHandler::default();
        // Loop budget exhausts before 3 consecutive errors could ever
        // accumulate, isolating the "unauthorized is transient" behavior.
        let config = base_config(3, 3);

        let outcome = run(RunContext {
            execution_id: Uuid::new_v4(),
            scout: &scout,
            recent_findings: &recent,
            now: Utc::now(),
            llm: &llm,
            tools: &tools,
            steps: &steps,
            credentials: &credentials,
            config: &config,
        })
        .await
        .expect("a 401 must not abort the run");

        assert!(!outcome.task_completed);
        assert_eq!(
            *credentials.signals.lock().unwrap(),
            vec![CredentialSignal::Unauthorized]
        );
    }
}
