use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    #[error("scout {0} not found")]
    ScoutNotFound(Uuid),

    #[error("execution already in progress")]
    AlreadyRunning(Uuid),

    #[error(transparent)]
    Store(#[from] scout_store::StoreError),

    #[error(transparent)]
    Credential(#[from] scout_credentials::CredentialError),

    #[error(transparent)]
    Run(#[from] scout_agent::RunError),
}

/// Maps onto the three response shapes of spec.md §6: 200 on success
/// (handled separately in the handler), 409 when a run is already in
/// progress, 500 for everything else.
impl IntoResponse for &ExecutorError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ExecutorError::AlreadyRunning(running_execution_id) => (
                StatusCode::CONFLICT,
                Json(serde_json::json!({
                    "success": false,
                    "error": "already in progress",
                    "runningExecutionId": running_execution_id,
                })),
            )
                .into_response(),
            ExecutorError::ScoutNotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": self.to_string()})),
            )
                .into_response(),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": other.to_string()})),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_running_maps_to_409() {
        let err = ExecutorError::AlreadyRunning(Uuid::nil());
        let response = (&err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn scout_not_found_maps_to_404() {
        let err = ExecutorError::ScoutNotFound(Uuid::nil());
        let response = (&err).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn run_error_maps_to_500() {
        let err = ExecutorError::Run(scout_agent::RunError::CredentialInvalid);
        let response = (&err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
