//! Search Module
//!
//! Web search capability used by agents that need market context.
//! The pipeline only depends on the [`SearchProvider`] trait; SerpAPI
//! (Google web results) is the production backend.

pub mod serpapi;

pub use serpapi::{SerpApiClient, SearchError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ranked web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
    /// Source domain
    pub source: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return a bounded, ranked list of hits for free-text `query`.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

/// Render hits as the observation text an agent reads back.
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No web results found for \"{}\".", query);
    }

    let mut output = format!("Web results for \"{}\":\n", query);
    for (i, hit) in hits.iter().enumerate() {
        output.push_str(&format!("{}. {}\n   {}\n   {}\n", i + 1, hit.title, hit.url, hit.snippet));
    }
    output
}
