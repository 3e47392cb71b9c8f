use std::sync::Arc;

use scout_common::AppConfig;
use scout_credentials::CredentialResolver;
use scout_email::HttpEmailSender;
use scout_executor::state::AppState;
use scout_store::{CredentialStore, ExecutionStore, ScoutStore, StepStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scout_executor=info".parse()?))
        .init();

    let config = Arc::new(AppConfig::from_env());

    let pool = scout_store::connect(&config.database_url).await?;
    let scouts = ScoutStore::new(pool.clone());
    let executions = ExecutionStore::new(pool.clone());
    let steps = StepStore::new(pool.clone());
    let credential_store = CredentialStore::new(pool.clone());

    let (analytics, analytics_rx) = scout_common::analytics::channel();
    tokio::spawn(scout_common::analytics::drain(
        analytics_rx,
        config.analytics_endpoint.clone(),
        config.analytics_api_key.clone(),
    ));

    let credentials = Arc::new(CredentialResolver::new(
        credential_store.clone(),
        scouts.clone(),
        analytics.clone(),
    ));

    let email: Arc<dyn scout_email::EmailSender> = Arc::new(HttpEmailSender::new(
        config.email_api_base_url.clone(),
        config.email_api_key.clone(),
        config.email_from.clone(),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        scouts,
        executions,
        steps,
        credentials,
        credential_store,
        email,
        analytics,
    });

    let app = scout_executor::http::build_router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    tracing::info!(%addr, "scout executor starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
