use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Partial,
    NotFound,
    InsufficientData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredResponse {
    pub task_completed: bool,
    pub task_status: TaskStatus,
    pub response: String,
}

/// Parses the model's final `content` as the structured response (spec.md
/// §4.E step 7). Strips a wrapping markdown code fence if present, then
/// truncates to the last `}` to drop any trailing commentary, before
/// attempting to deserialize. A parse failure never aborts the run — it
/// yields an `insufficient_data` result carrying the raw text.
pub fn parse_structured_response(raw: &str) -> StructuredResponse {
    let stripped = strip_code_fence(raw.trim());
    let truncated = match stripped.rfind('}') {
        Some(idx) => &stripped[..=idx],
        None => stripped,
    };

    serde_json::from_str(truncated).unwrap_or_else(|_| StructuredResponse {
        task_completed: false,
        task_status: TaskStatus::InsufficientData,
        response: raw.to_string(),
    })
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\n', '\r']);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let raw = r#"{"taskCompleted":true,"taskStatus":"completed","response":"done"}"#;
        let parsed = parse_structured_response(raw);
        assert!(parsed.task_completed);
        assert_eq!(parsed.task_status, TaskStatus::Completed);
        assert_eq!(parsed.response, "done");
    }

    #[test]
    fn strips_markdown_code_fence() {
        let raw = "```json\n{\"taskCompleted\":false,\"taskStatus\":\"partial\",\"response\":\"x\"}\n```";
        let parsed = parse_structured_response(raw);
        assert_eq!(parsed.task_status, TaskStatus::Partial);
    }

    #[test]
    fn truncates_trailing_commentary_after_last_brace() {
        let raw = r#"{"taskCompleted":true,"taskStatus":"completed","response":"done"} -- end of message"#;
        let parsed = parse_structured_response(raw);
        assert!(parsed.task_completed);
    }

    #[test]
    fn malformed_output_falls_back_to_insufficient_data() {
        let raw = "I looked around but found nothing conclusive.";
        let parsed = parse_structured_response(raw);
        assert!(!parsed.task_completed);
        assert_eq!(parsed.task_status, TaskStatus::InsufficientData);
        assert_eq!(parsed.response, raw);
    }
}
