use std::env;
use std::time::Duration;

/// One-time, explicit configuration for every component in the pipeline.
///
/// Loaded once from the environment at process start and passed down by
/// reference; nothing in this workspace reaches back into `std::env` after
/// construction.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Postgres (execution store)
    pub database_url: String,

    // LLM provider — exactly one of the two blocks below is populated,
    // selected by `LlmEndpoint::from_config`.
    pub llm_api_key: String,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_deployment: Option<String>,
    pub llm_api_version: Option<String>,
    pub embedding_model: String,

    // Search/scrape provider
    pub webtool_base_url: String,

    // Where the dispatcher sends `/execute` requests (spec.md §4.D).
    pub executor_base_url: String,

    // Email
    pub email_api_key: String,
    pub email_api_base_url: String,
    pub email_from: String,

    // Analytics (process-wide, fire-and-forget)
    pub analytics_endpoint: Option<String>,
    pub analytics_api_key: Option<String>,

    // Bounds (Design Notes §9: no ambient mutable singletons — these are
    // plain fields threaded through the agent loop / dispatcher).
    pub max_agent_loops: u32,
    pub max_consecutive_tool_errors: u32,
    pub http_timeout: Duration,
    pub executor_wall_limit: Duration,
    pub dispatch_interval: Duration,
    pub reap_interval: Duration,
    pub consecutive_failures_to_deactivate: u32,
    pub dedup_similarity_threshold: f64,
    pub recent_findings_limit: u32,

    pub web_host: String,
    pub web_port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables. Panics with a clear
    /// message if a required variable is missing — deliberately fails fast
    /// at process start rather than deep inside a run.
    pub fn from_env() -> Self {
        let direct_model = env::var("LLM_MODEL").ok();
        let deployment = env::var("LLM_DEPLOYMENT").ok();
        if direct_model.is_some() && deployment.is_some() {
            panic!("LLM_MODEL and LLM_DEPLOYMENT are mutually exclusive");
        }

        Self {
            database_url: required_env("DATABASE_URL"),

            llm_api_key: required_env("LLM_API_KEY"),
            llm_model: direct_model,
            llm_base_url: env::var("LLM_BASE_URL").ok(),
            llm_deployment: deployment,
            llm_api_version: env::var("LLM_API_VERSION").ok(),
            embedding_model: env::var("LLM_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),

            webtool_base_url: required_env("WEBTOOL_BASE_URL"),
            executor_base_url: env::var("EXECUTOR_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),

            email_api_key: required_env("EMAIL_API_KEY"),
            email_api_base_url: env::var("EMAIL_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.resend.com".to_string()),
            email_from: required_env("EMAIL_FROM"),

            analytics_endpoint: env::var("ANALYTICS_ENDPOINT").ok(),
            analytics_api_key: env::var("ANALYTICS_API_KEY").ok(),

            max_agent_loops: 7,
            max_consecutive_tool_errors: 3,
            http_timeout: Duration::from_secs(60),
            executor_wall_limit: Duration::from_secs(300),
            dispatch_interval: Duration::from_secs(60),
            reap_interval: Duration::from_secs(5 * 60),
            consecutive_failures_to_deactivate: 3,
            dedup_similarity_threshold: 0.85,
            recent_findings_limit: 20,

            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
