pub mod error;
pub mod sender;

pub use error::EmailError;
pub use sender::{EmailSender, HttpEmailSender};
#[cfg(any(test, feature = "test-support"))]
pub use sender::NoopEmailSender;
