//! ChatRelay server - relays chat messages to an LLM backend (or a scripted
//! demo reply) and streams the answer back as Server-Sent Events.

pub mod api;
pub mod config;
pub mod knowledge;
pub mod relay;

use api::{
    chat::{chat_json, chat_query},
    health::health,
    knowledge_bases::{create_knowledge_base, delete_knowledge_base, list_knowledge_bases},
    models::list_models,
    state::AppState,
};
use axum::{
    Router,
    http::{Method, header},
    routing::{delete, get},
};
use tower_http::cors::CorsLayer;

pub fn build_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health))
        // Streaming chat
        .route("/api/chat", get(chat_query).post(chat_json))
        .route("/api/models", get(list_models))
        // Knowledge base management
        .route(
            "/api/knowledge_bases",
            get(list_knowledge_bases).post(create_knowledge_base),
        )
        .route("/api/knowledge_bases/{id}", delete(delete_knowledge_base))
        .layer(cors)
        .with_state(state)
}
