use crate::api::{ApiResponse, state::AppState};
use crate::knowledge::KnowledgeBase;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct CreateKnowledgeBaseRequest {
    #[serde(rename = "名称", default)]
    pub name: Option<String>,
}

// GET /api/knowledge_bases
pub async fn list_knowledge_bases(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<KnowledgeBase>>> {
    let items = state.knowledge_bases.list().await;
    info!(count = items.len(), "Listing knowledge bases");
    Json(ApiResponse::list(items))
}

// POST /api/knowledge_bases
pub async fn create_knowledge_base(
    State(state): State<AppState>,
    body: Result<Json<CreateKnowledgeBaseRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse<KnowledgeBase>>) {
    let name = body
        .ok()
        .and_then(|Json(request)| request.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let Some(name) = name else {
        warn!("Rejected knowledge base without a name");
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("知识库名称不能为空")),
        );
    };

    let created = state.knowledge_bases.create(name).await;
    info!(id = created.id, name = %created.name, "Created knowledge base");
    (StatusCode::OK, Json(ApiResponse::ok(created)))
}

// DELETE /api/knowledge_bases/{id}
pub async fn delete_knowledge_base(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    if state.knowledge_bases.delete(id).await {
        info!(id, "Deleted knowledge base");
        (StatusCode::OK, Json(ApiResponse::message("成功删除知识库")))
    } else {
        warn!(id, "Knowledge base not found");
        (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("未找到指定的知识库")),
        )
    }
}
