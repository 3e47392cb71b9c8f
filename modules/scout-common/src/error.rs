use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),
}
