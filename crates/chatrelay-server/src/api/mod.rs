pub mod chat;
pub mod error;
pub mod health;
pub mod knowledge_bases;
pub mod models;
pub mod response;
pub mod state;

pub use error::ApiError;
pub use response::ApiResponse;
