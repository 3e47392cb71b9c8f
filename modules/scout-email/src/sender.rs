use async_trait::async_trait;

use crate::error::EmailError;

/// Pluggable transactional email backend. `send` is fire-and-forget from
/// the caller's perspective (spec.md §4.A): failures are returned so the
/// caller can log/report them, but never propagate into run status.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError>;
}

/// Sends via a transactional email HTTP API (Resend-shaped: POST
/// `{base_url}/emails` with bearer auth). Grounded in the teacher's
/// `SlackWebhook` backend — same "build payload, POST, map non-2xx to an
/// error" shape, swapped from a chat webhook to an email API.
pub struct HttpEmailSender {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(base_url: String, api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let payload = serde_json::json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let url = format!("{}/emails", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api { status, message });
        }

        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct NoopEmailSender {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for NoopEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl NoopEmailSender {
    pub fn new() -> Self {
        Self { sent: std::sync::Mutex::new(Vec::new()) }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl EmailSender for NoopEmailSender {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_sender_records_calls() {
        let sender = NoopEmailSender::new();
        sender.send("a@example.com", "subject", "<p>hi</p>").await.unwrap();
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }
}
