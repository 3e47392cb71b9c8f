use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::tool::ToolDefinition;
use crate::types::{ChatCompletion, Message, Role, ToolCall, ToolChoice, ToolSpec};

/// Two mutually exclusive ways of addressing a chat-completions endpoint
/// (spec.md §4.A): "direct" carries the model name in the request body
/// against a single base URL; "deployment" puts the deployment name in the
/// URL path and requires an API version query parameter, omitting `model`
/// from the body (Azure-style).
#[derive(Debug, Clone)]
pub enum LlmEndpoint {
    Direct {
        base_url: String,
        model: String,
    },
    Deployment {
        base_url: String,
        deployment: String,
        api_version: String,
    },
}

impl LlmEndpoint {
    pub fn from_config(cfg: &scout_common::AppConfig) -> Self {
        match (&cfg.llm_model, &cfg.llm_deployment) {
            (Some(model), None) => LlmEndpoint::Direct {
                base_url: cfg
                    .llm_base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: model.clone(),
            },
            (None, Some(deployment)) => LlmEndpoint::Deployment {
                base_url: cfg
                    .llm_base_url
                    .clone()
                    .expect("LLM_BASE_URL is required in deployment mode"),
                deployment: deployment.clone(),
                api_version: cfg
                    .llm_api_version
                    .clone()
                    .expect("LLM_API_VERSION is required in deployment mode"),
            },
            _ => panic!("exactly one of LLM_MODEL or LLM_DEPLOYMENT must be set"),
        }
    }

    fn chat_url(&self) -> String {
        match self {
            LlmEndpoint::Direct { base_url, .. } => format!("{base_url}/chat/completions"),
            LlmEndpoint::Deployment {
                base_url,
                deployment,
                api_version,
            } => format!(
                "{base_url}/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
            ),
        }
    }

    fn embeddings_url(&self) -> String {
        match self {
            LlmEndpoint::Direct { base_url, .. } => format!("{base_url}/embeddings"),
            LlmEndpoint::Deployment {
                base_url,
                deployment,
                api_version,
            } => format!(
                "{base_url}/openai/deployments/{deployment}/embeddings?api-version={api_version}"
            ),
        }
    }
}

pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: LlmEndpoint,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(api_key: String, endpoint: LlmEndpoint, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint,
            timeout,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// `chatComplete(messages, tools?, tool_choice?) -> {assistantMessage,
    /// toolCalls?}` (spec.md §4.A). Enforces the ~60s wall-clock timeout and
    /// surfaces transport/4xx/5xx errors verbatim.
    pub async fn chat_complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, LlmError> {
        let mut body = ChatRequestBody {
            model: None,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: None,
            tool_choice: None,
        };
        if let LlmEndpoint::Direct { model, .. } = &self.endpoint {
            body.model = Some(model.clone());
        }
        if !tools.is_empty() {
            body.tools = Some(
                tools
                    .iter()
                    .cloned()
                    .map(ToolSpec::from)
                    .collect::<Vec<_>>(),
            );
            body.tool_choice = Some(ToolChoice::Auto);
        }

        let url = self.endpoint.chat_url();
        debug!(%url, "chat completion request");

        let send = self.http.post(&url).headers(self.headers()).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let parsed: ChatResponseBody = response.json().await?;
        let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
        Ok(ChatCompletion {
            message: Message::from(choice.message),
        })
    }

    /// `embed(text) -> vector<float, 1536>` (spec.md §4.A).
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingRequestBody {
            model: model.to_string(),
            input: text.to_string(),
        };
        let url = self.endpoint.embeddings_url();

        let send = self.http.post(&url).headers(self.headers()).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let parsed: EmbeddingResponseBody = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::EmptyEmbedding)
    }
}

// --- wire shapes (provider JSON, distinct from our public `Message`) ---

#[derive(Debug, Serialize)]
struct ChatRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCallFunction {
    name: String,
    /// The provider sends arguments as a JSON-encoded string, not a nested
    /// object (spec.md §6 "structured argument blob").
    arguments: String,
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        WireMessage {
            role: m.role,
            content: m.content.clone(),
            tool_call_id: m.tool_call_id.clone(),
            tool_calls: m.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|c| WireToolCall {
                        id: c.id.clone(),
                        kind: "function".to_string(),
                        function: WireToolCallFunction {
                            name: c.name.clone(),
                            arguments: c.arguments.to_string(),
                        },
                    })
                    .collect()
            }),
        }
    }
}

impl From<WireMessage> for Message {
    fn from(m: WireMessage) -> Self {
        Message {
            role: m.role,
            content: m.content,
            tool_call_id: m.tool_call_id,
            tool_calls: m.tool_calls.map(|calls| {
                calls
                    .into_iter()
                    .map(|c| ToolCall {
                        id: c.id,
                        name: c.function.name,
                        arguments: serde_json::from_str(&c.function.arguments)
                            .unwrap_or(serde_json::Value::Null),
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequestBody {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponseBody {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_endpoint_builds_flat_chat_url() {
        let ep = LlmEndpoint::Direct {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
        };
        assert_eq!(ep.chat_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn deployment_endpoint_builds_path_with_api_version() {
        let ep = LlmEndpoint::Deployment {
            base_url: "https://my-resource.openai.azure.com".to_string(),
            deployment: "gpt4o-prod".to_string(),
            api_version: "2024-06-01".to_string(),
        };
        assert_eq!(
            ep.chat_url(),
            "https://my-resource.openai.azure.com/openai/deployments/gpt4o-prod/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn tool_call_arguments_round_trip_through_wire_string() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "searchWeb".to_string(),
            arguments: serde_json::json!({"query": "rust async"}),
        };
        let msg = Message::assistant(None, Some(vec![call]));
        let wire = WireMessage::from(&msg);
        let back: Message = wire.into();
        let calls = back.tool_calls.unwrap();
        assert_eq!(calls[0].arguments["query"], "rust async");
    }
}
