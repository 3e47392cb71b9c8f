pub mod blacklist;
pub mod client;
pub mod error;
pub mod types;

pub use client::WebtoolClient;
pub use error::WebtoolError;
pub use types::*;
