use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("no usable webtool credential for user {0}")]
    Unavailable(Uuid),

    #[error(transparent)]
    Store(#[from] scout_store::StoreError),
}

pub type Result<T> = std::result::Result<T, CredentialError>;
