use thiserror::Error;

/// Fatal outcomes of a run (spec.md §7). Every variant here is a terminal
/// failure — iteration exhaustion and parse failures are handled as
/// `AgentOutcome` values instead, since they still produce a `completed`
/// row rather than aborting.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("chat completion failed: {0}")]
    LlmCallFailed(#[from] scout_llm::LlmError),

    #[error("tool failed {0} consecutive times: {1}")]
    ConsecutiveToolErrors(u32, String),

    #[error("credits exhausted, add your own key")]
    BillingExhausted,

    #[error("webtool credential is no longer valid")]
    CredentialInvalid,
}
