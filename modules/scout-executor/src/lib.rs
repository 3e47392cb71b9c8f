pub mod error;
pub mod http;
pub mod pipeline;
pub mod state;

pub use error::ExecutorError;
pub use pipeline::execute_scout;
pub use state::AppState;
