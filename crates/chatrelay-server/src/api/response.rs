use serde::Serialize;

/// Envelope used by the knowledge-base and model listing endpoints.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            message: None,
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            count: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            success: true,
            data: Some(items),
            count: Some(count),
            message: None,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            count: None,
            message: Some(message.into()),
            error: None,
        }
    }
}
