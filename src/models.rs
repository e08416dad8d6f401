use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::storage::StagingArea;

/// Query used when the client sends none, or only whitespace
pub const DEFAULT_QUERY: &str = "Analyze this financial document for investment insights";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub staging: StagingArea,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub query: String,
    pub analysis: String,
    pub file_processed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Trim the query, falling back to [`DEFAULT_QUERY`] when it is missing or blank.
pub fn normalize_query(query: Option<&str>) -> String {
    match query.map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => DEFAULT_QUERY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query(None), DEFAULT_QUERY);
        assert_eq!(normalize_query(Some("")), DEFAULT_QUERY);
        assert_eq!(normalize_query(Some("   \n\t")), DEFAULT_QUERY);
        assert_eq!(normalize_query(Some("  What is the revenue?  ")), "What is the revenue?");
    }
}
