use scout_common::AppConfig;
use scout_dispatcher::{dispatch_due_scouts, reap_stale_executions};
use scout_store::{ExecutionStore, ScoutStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scout_dispatcher=info".parse()?))
        .init();

    let config = AppConfig::from_env();

    let pool = scout_store::connect(&config.database_url).await?;
    let scouts = ScoutStore::new(pool.clone());
    let executions = ExecutionStore::new(pool);
    let http = reqwest::Client::new();

    // spec.md §4.D: reap executions stuck in `running` past 2x the executor's
    // own wall-clock budget, not the budget itself.
    let max_runtime = chrono::Duration::from_std(config.executor_wall_limit)
        .unwrap_or_else(|_| chrono::Duration::seconds(300))
        * 2;

    info!(
        dispatch_interval_secs = config.dispatch_interval.as_secs(),
        reap_interval_secs = config.reap_interval.as_secs(),
        executor_base_url = %config.executor_base_url,
        "scout dispatcher starting"
    );

    let mut dispatch_tick = tokio::time::interval(config.dispatch_interval);
    let mut reap_tick = tokio::time::interval(config.reap_interval);

    loop {
        tokio::select! {
            _ = dispatch_tick.tick() => {
                dispatch_due_scouts(&scouts, &http, &config.executor_base_url).await;
            }
            _ = reap_tick.tick() => {
                reap_stale_executions(&executions, max_runtime).await;
            }
        }
    }
}
