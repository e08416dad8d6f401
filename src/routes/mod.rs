//! API Routes
//!
//! - `GET /` - Liveness probe
//! - `POST /analyze` - Upload a financial PDF and run the analysis pipeline

pub mod analyze;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::middleware::cors_layer;
use crate::models::{AppState, ErrorBody};
use crate::types::AppError;

/// Create the application router
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    info!(
        max_upload_bytes = server.max_upload_bytes,
        origins = ?server.cors_allowed_origins,
        "Creating application router"
    );

    Router::new()
        .merge(health::router())
        .merge(analyze::router())
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_allowed_origins))
        .with_state(state)
}

/// Every failure reaches the client as a 500 with a `detail` message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        let body = ErrorBody {
            detail: format!("Error processing financial document: {}", self),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use crate::agents::{AgentExecutor, AgentRegistry};
    use crate::documents::processor::tests::build_pdf;
    use crate::llm::{LLMAdapter, LLM};
    use crate::models::{AnalyzeResponse, LivenessResponse, DEFAULT_QUERY};
    use crate::pipeline::Pipeline;
    use crate::search::{SearchError, SearchHit, SearchProvider};
    use crate::storage::StagingArea;
    use crate::types::{AppResult, LLMRequest, LLMResponse, TokenUsage};

    const BOUNDARY: &str = "findoc-test-boundary";

    struct FinalAnswerAdapter {
        requests: Mutex<Vec<LLMRequest>>,
    }

    #[async_trait]
    impl LLMAdapter for FinalAnswerAdapter {
        async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(LLMResponse {
                content: format!("{{\"final_answer\": \"stage {} done\"}}", requests.len()),
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            })
        }
    }

    struct EmptySearch;

    #[async_trait]
    impl SearchProvider for EmptySearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
            Ok(vec![])
        }
    }

    fn server_config() -> ServerConfig {
        ServerConfig {
            port: 8000,
            host: "127.0.0.1".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
            max_upload_bytes: 1024 * 1024,
        }
    }

    fn app(staging_dir: &Path) -> (Router, Arc<FinalAnswerAdapter>) {
        let adapter = Arc::new(FinalAnswerAdapter {
            requests: Mutex::new(Vec::new()),
        });
        let pipeline = Pipeline::new(
            AgentRegistry::financial_analysis().unwrap(),
            AgentExecutor::new(
                LLM::with_adapter(adapter.clone(), "scripted"),
                Arc::new(EmptySearch),
                10_000,
            ),
            Duration::from_secs(30),
        );
        let state = AppState {
            pipeline: Arc::new(pipeline),
            staging: StagingArea::new(staging_dir),
        };
        (create_router(state, &server_config()), adapter)
    }

    fn pdf_bytes() -> Vec<u8> {
        let mut doc = build_pdf(&["Tesla Q2 2025 Update", "Total revenues 22,496"]);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn multipart_body(file: Option<(&str, &[u8])>, query: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((filename, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(query) = query {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\n{query}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_liveness() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: LivenessResponse = json_body(response).await;
        assert_eq!(body.message, "Financial Document Analyzer API is running");
    }

    #[tokio::test]
    async fn test_analyze_success_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let (app, adapter) = app(dir.path());
        let pdf = pdf_bytes();

        let response = app
            .oneshot(analyze_request(multipart_body(
                Some(("TSLA-Q2-2025-Update.pdf", &pdf)),
                Some("What is the revenue?"),
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: AnalyzeResponse = json_body(response).await;
        assert_eq!(body.status, "success");
        assert_eq!(body.query, "What is the revenue?");
        assert_eq!(body.analysis, "stage 4 done");
        assert_eq!(body.file_processed, "TSLA-Q2-2025-Update.pdf");

        assert_eq!(adapter.requests.lock().unwrap().len(), 4);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_blank_query_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let (app, adapter) = app(dir.path());
        let pdf = pdf_bytes();

        let response = app
            .oneshot(analyze_request(multipart_body(Some(("report.pdf", &pdf)), Some("   "))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: AnalyzeResponse = json_body(response).await;
        assert_eq!(body.query, DEFAULT_QUERY);

        let requests = adapter.requests.lock().unwrap();
        assert!(requests[0].messages[0]
            .content
            .contains(&format!("User query: {}", DEFAULT_QUERY)));
    }

    #[tokio::test]
    async fn test_unreadable_upload_is_500_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let (app, adapter) = app(dir.path());

        let response = app
            .oneshot(analyze_request(multipart_body(
                Some(("notes.txt", b"quarterly notes, not a pdf")),
                None,
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = json_body(response).await;
        assert!(body
            .detail
            .starts_with("Error processing financial document: Document unreadable"));

        assert!(adapter.requests.lock().unwrap().is_empty());
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .oneshot(analyze_request(multipart_body(None, Some("What is the revenue?"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = json_body(response).await;
        assert!(body.detail.contains("missing 'file' field"));
    }
}
