use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use scout_common::{ScrapeOptions, WaitFor};

/// Time-range filter string for the search provider (hour/day/week/month).
pub type Tbs = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    /// Count of blacklisted-domain URLs removed before returning.
    pub filtered_count: u32,
    pub echoed_params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub url: String,
    pub title: String,
    /// Markdown content, truncated to 2000 chars (spec.md §4.A).
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

pub(crate) const MAX_SCRAPE_CONTENT_CHARS: usize = 2000;

/// Truncate markdown to `MAX_SCRAPE_CONTENT_CHARS`, respecting char
/// boundaries.
pub(crate) fn truncate_markdown(content: &str) -> String {
    if content.chars().count() <= MAX_SCRAPE_CONTENT_CHARS {
        return content.to_string();
    }
    content.chars().take(MAX_SCRAPE_CONTENT_CHARS).collect()
}

// --- wire request bodies (spec.md §6) ---

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequestBody {
    pub query: String,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tbs: Option<Tbs>,
    #[serde(rename = "ignoreInvalidURLs")]
    pub ignore_invalid_urls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "scrapeOptions")]
    pub scrape_options: WireScrapeOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireScrapeOptions {
    #[serde(rename = "maxAge")]
    pub max_age: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(rename = "waitFor", skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<serde_json::Value>,
}

impl WireScrapeOptions {
    pub(crate) fn from_scout_options(opts: &ScrapeOptions, max_age: u64) -> Self {
        Self {
            max_age,
            headers: if opts.headers.is_empty() {
                None
            } else {
                Some(opts.headers.clone())
            },
            wait_for: opts.wait_for.as_ref().map(|w| match w {
                WaitFor::Ms(ms) => serde_json::json!(ms),
                WaitFor::Selector(s) => serde_json::json!(s),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeRequestBody {
    pub url: String,
    pub formats: Vec<serde_json::Value>,
    #[serde(rename = "maxAge")]
    pub max_age: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(rename = "waitFor", skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

// --- wire response bodies ---

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponseBody {
    pub data: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponseBody {
    pub data: ScrapeResponseData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponseData {
    pub markdown: Option<String>,
    pub metadata: Option<ScrapeResponseMetadata>,
    pub screenshot: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponseMetadata {
    pub title: Option<String>,
    pub favicon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_at_char_boundary() {
        let long = "a".repeat(3000);
        let truncated = truncate_markdown(&long);
        assert_eq!(truncated.chars().count(), MAX_SCRAPE_CONTENT_CHARS);
    }

    #[test]
    fn leaves_short_content_untouched() {
        assert_eq!(truncate_markdown("short"), "short");
    }
}
