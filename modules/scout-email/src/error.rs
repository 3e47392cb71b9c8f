use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("network error: {0}")]
    Network(String),

    #[error("email API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        EmailError::Network(err.to_string())
    }
}
