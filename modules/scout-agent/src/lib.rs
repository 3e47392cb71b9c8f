pub mod dedup_note;
pub mod error;
pub mod parsing;
pub mod prompt;
pub mod run;
pub mod tools;

pub use error::RunError;
pub use parsing::{StructuredResponse, TaskStatus};
pub use run::{run, AgentOutcome, CredentialSignalHandler, RunConfig, RunContext, StepRecorder};
pub use tools::{ScrapeWebsiteTool, WebSearchTool};
