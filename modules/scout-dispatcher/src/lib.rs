pub mod dispatch;
pub mod reap;

pub use dispatch::dispatch_due_scouts;
pub use reap::reap_stale_executions;
