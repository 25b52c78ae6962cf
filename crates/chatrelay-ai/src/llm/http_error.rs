use reqwest::Response;

use crate::error::AiError;

/// Error bodies longer than this are cut before they reach logs or clients.
const MAX_ERROR_BODY: usize = 512;

pub fn parse_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
}

pub async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(&response);
    let body = response.text().await.unwrap_or_default();

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message: truncate_body(body),
        retry_after_secs: retry_after,
    }
}

fn truncate_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }

    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &body[..cut])
}
