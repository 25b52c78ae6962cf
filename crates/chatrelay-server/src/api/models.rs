use crate::api::{ApiResponse, state::AppState};
use axum::{Json, extract::State};

/// GET /api/models - List the model labels the chat endpoint accepts
pub async fn list_models(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    let labels = state.registry.labels().map(str::to_string).collect();
    Json(ApiResponse::ok(labels))
}
