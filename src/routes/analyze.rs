use axum::{extract::Multipart, extract::State, routing::post, Json, Router};
use tracing::info;

use crate::models::{normalize_query, AnalyzeResponse, AppState};
use crate::types::{AppError, AppResult};

pub fn router() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze_document))
}

/// `POST /analyze`: multipart `file` (required) and `query` (optional).
async fn analyze_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<AnalyzeResponse>> {
    let mut upload = None;
    let mut query = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(format!("malformed multipart body: {}", e)))?
    {
        match field.name().map(str::to_string).as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Upload(format!("failed to read file: {}", e)))?;
                upload = Some((filename, data));
            }
            Some("query") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Upload(format!("failed to read query: {}", e)))?;
                query = Some(text);
            }
            _ => {}
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::Upload("missing 'file' field".to_string()))?;
    let query = normalize_query(query.as_deref());

    // Removed when `staged` drops, whichever way this handler exits.
    let staged = state.staging.stage(&data).await?;
    info!(
        file = %filename,
        bytes = data.len(),
        query_len = query.len(),
        "Analysis request received"
    );

    let outcome = state.pipeline.run(&query, staged.path()).await?;
    info!(run_id = %outcome.run_id, file = %filename, "Analysis complete");

    Ok(Json(AnalyzeResponse {
        status: "success".to_string(),
        query,
        analysis: outcome.result,
        file_processed: filename,
    }))
}
