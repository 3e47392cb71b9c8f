//! Success notifier (spec.md §4.G). Only ever called for completed,
//! non-duplicate runs — callers are expected to check that before invoking
//! `send_success`; this crate does not re-check duplicate status itself.

use chrono::Utc;
use scout_common::{AnalyticsEvent, AnalyticsSink, Execution, Scout};
use scout_email::EmailSender;
use tracing::warn;

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_html(scout: &Scout, execution: &Execution, summary: &str) -> String {
    let body = escape_html(summary).replace('\n', "<br>\n");
    format!(
        "<h1>{title}</h1>\
         <p><strong>Goal:</strong> {goal}</p>\
         <div>{body}</div>\
         <p style=\"color:#888;font-size:12px\">Run {execution_id} &middot; {completed_at}</p>",
        title = escape_html(&scout.title),
        goal = escape_html(&scout.goal),
        body = body,
        execution_id = execution.id,
        completed_at = execution
            .completed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
    )
}

/// Sends the success email for a completed, non-duplicate run. Failures
/// are logged and forwarded to the analytics sink; they never change run
/// status (spec.md §4.G).
pub async fn send_success(
    sender: &dyn EmailSender,
    analytics: &AnalyticsSink,
    recipient: &str,
    scout: &Scout,
    execution: &Execution,
) {
    let summary = execution.summary_text.as_deref().unwrap_or_default();
    let html = render_html(scout, execution, summary);
    let subject = format!("Scout \"{}\" found something new", scout.title);

    if let Err(e) = sender.send(recipient, &subject, &html).await {
        warn!(
            scout_id = %scout.id,
            execution_id = %execution.id,
            error = %e,
            "success notification failed"
        );
        analytics.emit(AnalyticsEvent::NotificationFailed {
            scout_id: scout.id,
            execution_id: execution.id,
            reason: e.to_string(),
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_common::{ExecutionStatus, Frequency, Location, ScrapeOptions};
    use scout_email::NoopEmailSender;
    use uuid::Uuid;

    fn scout() -> Scout {
        Scout {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "AI News".to_string(),
            goal: "track AI announcements".to_string(),
            description: String::new(),
            queries: vec!["AI news".to_string()],
            location: Location::any(),
            frequency: Frequency::Daily,
            scrape_options: ScrapeOptions::default(),
            is_active: true,
            last_run_at: None,
            consecutive_failures: 0,
        }
    }

    fn execution(scout_id: Uuid) -> Execution {
        Execution {
            id: Uuid::new_v4(),
            scout_id,
            status: ExecutionStatus::Completed,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error_message: None,
            results_summary: None,
            summary_text: Some("Found <a thing>\nacross two sources.".to_string()),
            summary_embedding: None,
            duplicate: false,
        }
    }

    #[tokio::test]
    async fn sends_one_email_with_escaped_body() {
        let sender = NoopEmailSender::new();
        let (analytics, rx) = scout_common::analytics::channel();
        drop(rx);
        let s = scout();
        let e = execution(s.id);

        send_success(&sender, &analytics, "user@example.com", &s, &e).await;

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "user@example.com");
        assert!(sent[0].1.contains("AI News"));
    }

    #[test]
    fn render_html_escapes_angle_brackets() {
        let s = scout();
        let e = execution(s.id);
        let html = render_html(&s, &e, "Found <a thing>\nacross two sources.");
        assert!(html.contains("&lt;a thing&gt;"));
        assert!(!html.contains("<a thing>"));
    }
}
