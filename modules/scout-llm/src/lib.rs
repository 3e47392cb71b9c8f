pub mod client;
pub mod error;
pub mod provider;
pub mod tool;
pub mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use provider::{ChatProvider, EmbedProvider, LlmProvider};
pub use types::*;
