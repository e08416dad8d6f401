use axum::{routing::get, Json, Router};

use crate::models::{AppState, LivenessResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(liveness))
}

async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        message: "Financial Document Analyzer API is running".to_string(),
    })
}
