//! Web search tool backed by the Google Custom Search JSON API.
//!
//! The observation is always a JSON document with a `status` field
//! (`ok`, `no_results` or `error`); network and API failures are reported
//! inside the document rather than failing the tool call, so the agent can
//! read the outcome either way.

use crate::agent::tool::Tool;
use crate::config::WebSearchConfig;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;

/// A tool for searching the web via Google Programmable Search.
pub struct WebSearchTool {
    config: WebSearchConfig,
    http: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(config: WebSearchConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn search(&self, query: &str, k: usize) -> SearchResponse {
        let (api_key, cse_id) = match (self.config.api_key(), self.config.cse_id()) {
            (Some(api_key), Some(cse_id)) => (api_key, cse_id),
            _ => {
                return SearchResponse::error(
                    query,
                    "web search is not configured: set GOOGLE_API_KEY and GOOGLE_CSE_ID",
                );
            }
        };

        let url = format!(
            "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}&num={}",
            api_key,
            cse_id,
            urlencoding::encode(query),
            k
        );

        match self.request(&url).await {
            Ok(body) => {
                let results = collect_results(&body, k);
                if results.is_empty() {
                    SearchResponse {
                        query: query.to_string(),
                        status: SearchStatus::NoResults,
                        message: None,
                        results,
                    }
                } else {
                    SearchResponse {
                        query: query.to_string(),
                        status: SearchStatus::Ok,
                        message: None,
                        results,
                    }
                }
            }
            Err(err) => SearchResponse::error(query, &err.to_string()),
        }
    }

    async fn request(&self, url: &str) -> Result<serde_json::Value> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information, news, or specific facts."
    }

    fn usage(&self) -> &str {
        r#"Pass the search query directly, or JSON: {"query": "your terms", "k": 3}."#
    }

    async fn call(&self, args: &str) -> Result<String> {
        if !self.config.enabled {
            bail!("Web search is currently disabled. Please enable it in configuration.");
        }

        let (query, k) = parse_args(args, self.config.max_results);
        let response = self.search(query.trim(), k).await;
        Ok(serde_json::to_string(&response)?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum SearchStatus {
    Ok,
    NoResults,
    Error,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    results: Vec<SearchResult>,
}

impl SearchResponse {
    fn error(query: &str, message: &str) -> Self {
        Self {
            query: query.to_string(),
            status: SearchStatus::Error,
            message: Some(message.to_string()),
            results: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchResult {
    title: String,
    link: String,
    snippet: String,
}

fn parse_args(args: &str, default_k: usize) -> (String, usize) {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(args) {
        if let Some(query) = value.get("query").and_then(|v| v.as_str()) {
            let k = value
                .get("k")
                .and_then(|v| v.as_u64())
                .map(|k| k as usize)
                .unwrap_or(default_k);
            return (query.to_string(), k.max(1));
        }
    }
    (args.to_string(), default_k.max(1))
}

/// Normalize the `items` array of a Custom Search response.
fn collect_results(body: &serde_json::Value, k: usize) -> Vec<SearchResult> {
    body.get("items")
        .and_then(|items| items.as_array())
        .map(|items| {
            items
                .iter()
                .take(k)
                .map(|item| SearchResult {
                    title: item
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    link: item
                        .get("link")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    snippet: item
                        .get("snippet")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
