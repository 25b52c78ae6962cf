use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures reported before a stream is opened. Rendered as
/// `{"error": <message>}`; never sent as SSE frames.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("消息内容不能为空")]
    EmptyMessage,
    #[error("不支持的模型：{0}")]
    UnknownModel(String),
    #[error("请求格式错误，请检查参数")]
    MalformedRequest,
    #[error("模型服务未配置")]
    BackendUnavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::EmptyMessage | ApiError::UnknownModel(_) | ApiError::MalformedRequest => {
                StatusCode::BAD_REQUEST
            }
            ApiError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
