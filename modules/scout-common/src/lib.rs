pub mod analytics;
pub mod config;
pub mod error;
pub mod types;

pub use analytics::{AnalyticsEvent, AnalyticsSink};
pub use config::AppConfig;
pub use error::CommonError;
pub use types::*;
