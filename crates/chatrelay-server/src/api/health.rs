use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    timestamp: String,
}

// GET /api/health
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        timestamp: chrono::Local::now().to_rfc3339(),
    })
}
