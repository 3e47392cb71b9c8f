use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("scout {0} not found")]
    ScoutNotFound(uuid::Uuid),

    #[error("no webtool credential configured for user {0}")]
    CredentialNotFound(uuid::Uuid),
}

pub type Result<T> = std::result::Result<T, StoreError>;
