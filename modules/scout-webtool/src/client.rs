use std::time::Duration;

use scout_common::{Location, ScrapeOptions};
use tracing::debug;

use crate::blacklist::is_blacklisted;
use crate::error::WebtoolError;
use crate::types::{
    truncate_markdown, ScrapeRequestBody, ScrapeResponse, ScrapeResponseBody, SearchRequestBody,
    SearchResponse, SearchResponseBody, WireScrapeOptions,
};

/// Default ISO country code appended when a scout's location has no comma
/// (spec.md §4.A: "no comma" implies a bare city name, so the adapter
/// widens it with a default country).
const DEFAULT_COUNTRY: &str = "US";

pub struct WebtoolClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl WebtoolClient {
    /// `api_key` is the per-user credential resolved for this run (spec.md
    /// §4.A) — a fresh client is built per execution rather than shared,
    /// since the key can differ scout to scout.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    /// `search(query, limit, time_filter?, location?, maxAge, scrapeOpts?)`
    /// (spec.md §4.A). Blacklisted-domain results are removed before
    /// returning; the count removed is reported as `filtered_count`.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        tbs: Option<String>,
        location: Option<&Location>,
        max_age_secs: u64,
        scrape_opts: &ScrapeOptions,
    ) -> Result<SearchResponse, WebtoolError> {
        let limit = limit.min(10);

        let (location_param, country_param) = match location {
            Some(loc) if loc.is_geo_biased() => {
                let country = loc.country_hint.clone().unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
                let location_str = if loc.city.contains(',') {
                    loc.city.clone()
                } else {
                    format!("{}, {}", loc.city, country)
                };
                (Some(location_str), Some(country))
            }
            _ => (None, None),
        };

        let body = SearchRequestBody {
            query: query.to_string(),
            limit,
            tbs,
            ignore_invalid_urls: true,
            location: location_param,
            country: country_param,
            scrape_options: WireScrapeOptions::from_scout_options(scrape_opts, max_age_secs),
        };

        let url = format!("{}/search", self.base_url);
        debug!(%url, query, "webtool search request");

        let send = self.http.post(&url).bearer_auth(&self.api_key).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| WebtoolError::Timeout(self.timeout))??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(WebtoolError::Api { status, message });
        }

        let parsed: SearchResponseBody = response.json().await?;
        let before = parsed.data.len();
        let results: Vec<_> = parsed
            .data
            .into_iter()
            .filter(|r| !is_blacklisted(&r.url))
            .collect();
        let filtered_count = (before - results.len()) as u32;

        Ok(SearchResponse {
            results,
            filtered_count,
            echoed_params: serde_json::json!({"query": query, "limit": limit}),
        })
    }

    /// `scrape(url, maxAge, scrapeOpts?)` (spec.md §4.A).
    pub async fn scrape(
        &self,
        target_url: &str,
        max_age_secs: u64,
        scrape_opts: &ScrapeOptions,
    ) -> Result<ScrapeResponse, WebtoolError> {
        let wire_opts = WireScrapeOptions::from_scout_options(scrape_opts, max_age_secs);
        let body = ScrapeRequestBody {
            url: target_url.to_string(),
            formats: vec![
                serde_json::json!("markdown"),
                serde_json::json!({"type": "screenshot", "fullPage": false}),
            ],
            max_age: max_age_secs,
            headers: wire_opts.headers,
            wait_for: wire_opts.wait_for,
            timeout: scrape_opts.timeout_ms,
        };

        let url = format!("{}/scrape", self.base_url);
        debug!(%url, target_url, "webtool scrape request");

        let send = self.http.post(&url).bearer_auth(&self.api_key).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| WebtoolError::Timeout(self.timeout))??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(WebtoolError::Api { status, message });
        }

        let parsed: ScrapeResponseBody = response.json().await?;
        let markdown = parsed.data.markdown.unwrap_or_default();

        Ok(ScrapeResponse {
            url: target_url.to_string(),
            title: parsed
                .data
                .metadata
                .as_ref()
                .and_then(|m| m.title.clone())
                .unwrap_or_default(),
            content: truncate_markdown(&markdown),
            screenshot: parsed.data.screenshot,
            favicon: parsed.data.metadata.and_then(|m| m.favicon),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_without_comma_gets_default_country_appended() {
        let loc = Location {
            city: "Minneapolis".to_string(),
            lat: 44.98,
            lon: -93.27,
            country_hint: None,
        };
        assert!(!loc.city.contains(','));
    }
}
