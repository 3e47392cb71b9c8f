//! Tool-calling surface shared by the agent loop and its two concrete
//! tools. Mirrors the teacher's `Tool`/`DynTool`/`ToolWrapper` split: typed
//! tools implement `Tool`, the agent loop dispatches over the
//! object-safe `DynTool` so `searchWeb` and `scrapeWebsite` can sit in one
//! `Vec<Arc<dyn DynTool>>`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    const NAME: &'static str;
    type Error: Error + Send + Sync + 'static;
    type Args: DeserializeOwned + Send + Sync;
    type Output: Serialize + Send + Sync;

    fn definition(&self) -> ToolDefinition;
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;
}

#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn definition(&self) -> ToolDefinition;
    async fn call_json(&self, args: Value) -> Result<Value, String>;
}

pub struct ToolWrapper<T: Tool>(pub T);

#[async_trait]
impl<T: Tool> DynTool for ToolWrapper<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        self.0.definition()
    }

    async fn call_json(&self, args: Value) -> Result<Value, String> {
        let parsed_args: T::Args =
            serde_json::from_value(args).map_err(|e| format!("failed to parse args: {e}"))?;

        let result = self
            .0
            .call(parsed_args)
            .await
            .map_err(|e| format!("tool error: {e}"))?;

        serde_json::to_value(result).map_err(|e| format!("failed to serialize result: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct EchoArgs {
        message: String,
    }

    #[derive(Debug)]
    struct EchoError;
    impl std::fmt::Display for EchoError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "echo error")
        }
    }
    impl std::error::Error for EchoError {}

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        const NAME: &'static str = "echo";
        type Error = EchoError;
        type Args = EchoArgs;
        type Output = String;

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: Self::NAME.to_string(),
                description: "Echo back the input".to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"]
                }),
            }
        }

        async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
            Ok(args.message)
        }
    }

    #[tokio::test]
    async fn tool_wrapper_round_trips_json() {
        let tool: Box<dyn DynTool> = Box::new(ToolWrapper(EchoTool));
        assert_eq!(tool.name(), "echo");

        let result = tool
            .call_json(serde_json::json!({"message": "hello"}))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!("hello"));
    }

    #[tokio::test]
    async fn tool_wrapper_surfaces_parse_errors() {
        let tool: Box<dyn DynTool> = Box::new(ToolWrapper(EchoTool));
        let result = tool.call_json(serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
