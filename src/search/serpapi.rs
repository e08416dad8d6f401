//! SerpAPI Client
//!
//! Google web search through SerpAPI's JSON endpoint.
//!
//! ## Ranking
//!
//! SerpAPI already returns results in Google's order. Hits from regulators,
//! exchanges and the major financial press are moved ahead of the rest;
//! provider order is kept within each group.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::search::{SearchHit, SearchProvider};
use crate::types::AppError;

const SERPAPI_BASE: &str = "https://serpapi.com";

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("SerpAPI key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search provider error: {0}")]
    Provider(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        AppError::SearchUnavailable(e.to_string())
    }
}

/// SerpAPI client for market and company web search
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl SerpApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: SERPAPI_BASE.to_string(),
            max_results: 5,
        }
    }

    /// Configure client from config
    pub fn from_config(config: &crate::config::SearchConfig) -> Self {
        Self::new(config.serpapi_key.clone())
            .with_base_url(&config.base_url)
            .with_max_results(config.max_results)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set maximum results per search
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.max(1);
        self
    }

    fn parse_results(&self, body: &serde_json::Value) -> Result<Vec<SearchHit>, SearchError> {
        if let Some(message) = body.get("error").and_then(|v| v.as_str()) {
            // SerpAPI reports "no results" as an error string; that is an empty success.
            if message.contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(SearchError::Provider(message.to_string()));
        }

        let results_array = match body.get("organic_results") {
            Some(value) => value
                .as_array()
                .ok_or_else(|| SearchError::ParseError("Expected array of results".to_string()))?,
            None => return Ok(Vec::new()),
        };

        let mut hits: Vec<SearchHit> = results_array
            .iter()
            .filter_map(|result| {
                let url = result.get("link").and_then(|v| v.as_str())?.to_string();

                let title = result
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Untitled")
                    .to_string();

                let snippet = result
                    .get("snippet")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();

                let source = result
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .or_else(|| url.split('/').nth(2).map(String::from));

                Some(SearchHit { title, snippet, url, source })
            })
            .collect();

        // Stable: provider order is kept inside each group.
        hits.sort_by_key(|hit| !is_reputable_financial_source(&hit.url));
        hits.truncate(self.max_results);
        Ok(hits)
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching Google via SerpAPI");

        let num = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("hl", "en"),
                ("gl", "us"),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are JSON from SerpAPI itself, HTML from proxies in front of it.
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|body| body.get("error").and_then(|v| v.as_str()).map(str::to_string))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(SearchError::Provider(format!("{} ({})", message, status)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        debug!("Raw SerpAPI response received");

        let hits = self.parse_results(&body)?;
        info!(count = hits.len(), "Web search completed");
        Ok(hits)
    }
}

/// Check if a URL is from a regulator, exchange, or established financial outlet
fn is_reputable_financial_source(url: &str) -> bool {
    let reputable_domains = [
        // Regulators and filings
        "sec.gov",
        "federalreserve.gov",
        "esma.europa.eu",
        "fca.org.uk",
        // Exchanges
        "nasdaq.com",
        "nyse.com",
        "lseg.com",
        // Financial press and data
        "reuters.com",
        "bloomberg.com",
        "wsj.com",
        "ft.com",
        "cnbc.com",
        "marketwatch.com",
        "barrons.com",
        "morningstar.com",
        "finance.yahoo.com",
    ];

    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("")
        .to_lowercase();

    // Company investor-relations sites
    if host.starts_with("ir.") || host.starts_with("investor.") || host.starts_with("investors.") {
        return true;
    }

    reputable_domains
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_reputable_financial_source() {
        assert!(is_reputable_financial_source("https://www.sec.gov/Archives/edgar/data/1318605"));
        assert!(is_reputable_financial_source("https://www.reuters.com/business/autos"));
        assert!(is_reputable_financial_source("https://ir.tesla.com/press-release"));
        assert!(!is_reputable_financial_source("https://random-blog.com/reuters.com-is-great"));
    }

    #[test]
    fn test_parse_results_ranks_and_bounds() {
        let client = SerpApiClient::new("key".to_string()).with_max_results(2);
        let body = json!({
            "organic_results": [
                {"title": "Blog take", "link": "https://someblog.net/tsla", "snippet": "opinion"},
                {"title": "Reuters", "link": "https://www.reuters.com/tsla", "snippet": "news"},
                {"title": "No link"},
                {"title": "Forum", "link": "https://forum.example.com/tsla", "snippet": "chatter"}
            ]
        });

        let hits = client.parse_results(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Reuters");
        assert_eq!(hits[1].title, "Blog take");
        assert_eq!(hits[1].source.as_deref(), Some("someblog.net"));
    }

    #[test]
    fn test_parse_results_error_payloads() {
        let client = SerpApiClient::new("key".to_string());

        let empty = json!({"error": "Google hasn't returned any results for this query."});
        assert!(client.parse_results(&empty).unwrap().is_empty());

        let quota = json!({"error": "Your account has run out of searches."});
        assert!(matches!(client.parse_results(&quota), Err(SearchError::Provider(_))));

        let missing = json!({"search_metadata": {}});
        assert!(client.parse_results(&missing).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("engine".into(), "google".into()),
                mockito::Matcher::UrlEncoded("q".into(), "tesla deliveries".into()),
                mockito::Matcher::UrlEncoded("api_key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"organic_results": [
                    {"title": "Tesla deliveries", "link": "https://www.cnbc.com/tesla", "snippet": "384k vehicles"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = SerpApiClient::new("test-key".to_string()).with_base_url(&server.url());
        let hits = client.search("tesla deliveries").await.unwrap();

        mock.assert_async().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source.as_deref(), Some("www.cnbc.com"));
    }

    #[tokio::test]
    async fn test_search_http_failure_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search.json")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Invalid API key."}"#)
            .create_async()
            .await;

        let client = SerpApiClient::new("bad-key".to_string()).with_base_url(&server.url());
        let err = client.search("anything").await.unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));

        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::SearchUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_json_gateway_error_keeps_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search.json")
            .match_query(mockito::Matcher::Any)
            .with_status(502)
            .with_header("content-type", "text/html")
            .with_body("<html><body>502 Bad Gateway</body></html>")
            .create_async()
            .await;

        let client = SerpApiClient::new("test-key".to_string()).with_base_url(&server.url());
        match client.search("tesla deliveries").await {
            Err(SearchError::Provider(message)) => assert!(message.contains("502")),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_without_key() {
        let client = SerpApiClient::new(String::new());
        assert!(matches!(client.search("q").await, Err(SearchError::NoApiKey)));
    }
}
