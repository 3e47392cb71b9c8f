//! The two tools exposed to the model (spec.md §4.E), grounded in the
//! teacher's `discovery/agent_tools.rs` `WebSearchTool`/`ReadPageTool` pair
//! and adapted to the webtool adapter's richer request shape.

use std::sync::Arc;

use async_trait::async_trait;
use scout_common::{Location, ScrapeOptions};
use scout_llm::tool::{Tool, ToolDefinition};
use scout_webtool::WebtoolClient;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct ToolError(pub String);

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ToolError {}

pub struct WebSearchTool {
    pub webtool: Arc<WebtoolClient>,
    pub location: Option<Location>,
    pub scrape_options: ScrapeOptions,
    pub max_age_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub tbs: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebSearchOutput {
    pub results: Vec<WebSearchResultItem>,
    pub filtered_count: u32,
}

#[derive(Debug, Serialize)]
pub struct WebSearchResultItem {
    pub title: String,
    pub url: String,
    pub description: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    const NAME: &'static str = "searchWeb";
    type Error = ToolError;
    type Args = WebSearchArgs;
    type Output = WebSearchOutput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web. Returns titles, URLs, and short descriptions."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query"},
                    "limit": {"type": "integer", "description": "Max results, up to 10"},
                    "tbs": {"type": "string", "description": "Optional time filter"}
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let response = self
            .webtool
            .search(
                &args.query,
                args.limit.unwrap_or(10),
                args.tbs,
                self.location.as_ref(),
                self.max_age_secs,
                &self.scrape_options,
            )
            .await
            .map_err(|e| ToolError(e.to_string()))?;

        Ok(WebSearchOutput {
            results: response
                .results
                .into_iter()
                .map(|r| WebSearchResultItem {
                    title: r.title,
                    url: r.url,
                    description: r.description,
                })
                .collect(),
            filtered_count: response.filtered_count,
        })
    }
}

pub struct ScrapeWebsiteTool {
    pub webtool: Arc<WebtoolClient>,
    pub scrape_options: ScrapeOptions,
    pub max_age_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeWebsiteArgs {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeWebsiteOutput {
    pub url: String,
    pub title: String,
    pub content: String,
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    const NAME: &'static str = "scrapeWebsite";
    type Error = ToolError;
    type Args = ScrapeWebsiteArgs;
    type Output = ScrapeWebsiteOutput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Fetch a page's content as markdown.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The URL to scrape"}
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let response = self
            .webtool
            .scrape(&args.url, self.max_age_secs, &self.scrape_options)
            .await
            .map_err(|e| ToolError(e.to_string()))?;

        Ok(ScrapeWebsiteOutput {
            url: response.url,
            title: response.title,
            content: response.content,
        })
    }
}
