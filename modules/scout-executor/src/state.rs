use std::sync::Arc;

use scout_common::{AnalyticsSink, AppConfig};
use scout_credentials::CredentialResolver;
use scout_email::EmailSender;
use scout_store::{CredentialStore, ExecutionStore, ScoutStore, StepStore};

/// No shared `LlmClient` lives here: a fresh one is built per execution in
/// `pipeline::run_and_finish`, since the key/endpoint pairing is process-wide
/// configuration but `LlmClient` itself carries no `Clone` impl.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub scouts: ScoutStore,
    pub executions: ExecutionStore,
    pub steps: StepStore,
    pub credentials: Arc<CredentialResolver>,
    pub credential_store: CredentialStore,
    pub email: Arc<dyn EmailSender>,
    pub analytics: AnalyticsSink,
}
