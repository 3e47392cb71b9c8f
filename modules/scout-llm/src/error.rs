use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("no response choices returned")]
    EmptyResponse,

    #[error("no embedding returned")]
    EmptyEmbedding,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}
