// Financial Document Analyzer - multi-agent LLM analysis of uploaded financial reports

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod search;    // Web search (SerpAPI Google results)
pub mod documents; // PDF text extraction
pub mod storage;   // Per-request staging of uploads
pub mod pipeline;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use pipeline::{Pipeline, PipelineOutcome, RunState};
