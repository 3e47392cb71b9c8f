pub mod credentials;
pub mod error;
pub mod executions;
pub mod pool;
pub mod scouts;
pub mod steps;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use credentials::CredentialStore;
pub use error::StoreError;
pub use executions::{ClaimOutcome, ExecutionStore, FinishExecutionInput};
pub use pool::connect;
pub use scouts::{ScoutPostRunUpdate, ScoutStore};
pub use steps::StepStore;
