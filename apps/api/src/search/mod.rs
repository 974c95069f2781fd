/// Web search client used to ground tax answers in current official sources.
///
/// ARCHITECTURAL RULE: No other module may call the search API directly.
/// All lookups MUST go through this module so the domain allow-list below
/// is applied to every query.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 5;

/// Only official tax-information sources. Results from anywhere else never
/// reach a prompt.
const OFFICIAL_TAX_DOMAINS: &[&str] = &[
    "europa.eu",
    "revenue.ie",
    "citizensinformation.ie",
    "gov.uk",
    "irs.gov",
    "oecd.org",
];

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One search hit, already reduced to what a prompt needs.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Search seam held by `AppState` as an optional trait object: `None` when
/// no search credentials are configured.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
    include_domains: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Tavily-backed `SearchProvider`.
#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: String,
}

impl TavilyClient {
    /// `None` when no search API key is configured; the caller degrades to
    /// answering without search context.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.tavily_api_key.clone()?;
        Some(Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        })
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let request_body = TavilySearchRequest {
            query,
            max_results: MAX_RESULTS,
            search_depth: "basic",
            include_domains: OFFICIAL_TAX_DOMAINS,
        };

        let response = self
            .client
            .post(TAVILY_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: TavilySearchResponse = response.json().await?;

        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_pins_result_count_and_domains() {
        let request = TavilySearchRequest {
            query: "income tax credits 2025",
            max_results: MAX_RESULTS,
            search_depth: "basic",
            include_domains: OFFICIAL_TAX_DOMAINS,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"max_results\":5"));
        assert!(json.contains("\"revenue.ie\""));
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_response_parses_and_ignores_extra_fields() {
        let body = r#"{
            "query": "income tax credits 2025",
            "response_time": 1.2,
            "results": [
                {
                    "title": "Tax credits",
                    "url": "https://www.revenue.ie/en/personal-tax-credits",
                    "content": "A summary of personal tax credits.",
                    "score": 0.97
                }
            ]
        }"#;

        let parsed: TavilySearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].title, "Tax credits");
    }

    #[test]
    fn test_response_defaults_to_empty_results() {
        let parsed: TavilySearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
