//! OpenAI-compatible streaming provider

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::http_client::build_streaming_client;
use crate::llm::client::{
    CompletionRequest, FinishReason, LlmClient, Message, Role, StreamChunk, StreamResult,
};
use crate::llm::http_error::response_to_error;

/// OpenAI client
///
/// Works against any `/chat/completions` endpoint that speaks the OpenAI
/// streaming dialect (OpenAI, DashScope compatible mode, DeepSeek, ...).
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_streaming_client(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAIStreamRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for OpenAIMessage<'a> {
    fn from(message: &'a Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
        };
        Self {
            role,
            content: &message.content,
        }
    }
}

// Streaming types

#[derive(Deserialize, Debug)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    error: Option<OpenAIStreamError>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct OpenAIStreamDelta {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamError {
    #[serde(default)]
    message: String,
}

/// Split the next complete SSE event off the front of `buffer`.
///
/// Expects `\r` to have been stripped already. The terminating blank line is
/// consumed but not returned.
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.windows(2).position(|pair| pair == b"\n\n")?;
    let event = buffer[..pos].to_vec();
    buffer.drain(..pos + 2);
    Some(event)
}

/// Decode one complete event and return its non-empty `data:` payloads.
fn data_payloads(event: &[u8]) -> Result<Vec<&str>> {
    let text = std::str::from_utf8(event)?;
    Ok(text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter(|data| !data.trim().is_empty())
        .collect())
}

/// Parse one SSE `data:` payload into the chunks it carries.
///
/// Returns `Ok(None)` for the `[DONE]` sentinel.
fn parse_data_line(data: &str) -> Result<Option<Vec<StreamChunk>>> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(None);
    }

    let parsed: OpenAIStreamResponse = serde_json::from_str(data)?;
    if let Some(error) = parsed.error {
        return Err(AiError::Llm(format!("upstream error: {}", error.message)));
    }

    let mut chunks = Vec::new();
    for choice in parsed.choices {
        if let Some(content) = choice.delta.content
            && !content.is_empty()
        {
            chunks.push(StreamChunk::text(content));
        }
        if let Some(reason) = choice.finish_reason {
            chunks.push(StreamChunk::final_chunk(FinishReason::parse(&reason)));
        }
    }
    Ok(Some(chunks))
}

impl LlmClient for OpenAIClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = format!("{}/chat/completions", self.base_url);

        Box::pin(async_stream::stream! {
            let body = OpenAIStreamRequest {
                model: &request.model,
                messages: request.messages.iter().map(OpenAIMessage::from).collect(),
                temperature: request.temperature,
                stream: true,
            };

            let response = match client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AiError::Llm(format!("Request failed: {}", e)));
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(response_to_error(response, "OpenAI").await);
                return;
            }

            let mut byte_stream = response.bytes_stream();
            // Raw bytes: a multi-byte character may straddle two reads.
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AiError::Llm(format!("Stream error: {}", e)));
                        return;
                    }
                };

                buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

                while let Some(event) = take_event(&mut buffer) {
                    let payloads = match data_payloads(&event) {
                        Ok(payloads) => payloads,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    for data in payloads {
                        match parse_data_line(data) {
                            Ok(Some(chunks)) => {
                                for chunk in chunks {
                                    yield Ok(chunk);
                                }
                            }
                            Ok(None) => return,
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                }
            }

            // The last event may lack its trailing blank line after a network
            // interruption; parse whatever is left.
            let payloads = match data_payloads(&buffer) {
                Ok(payloads) => payloads,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for data in payloads {
                match parse_data_line(data) {
                    Ok(Some(chunks)) => {
                        for chunk in chunks {
                            yield Ok(chunk);
                        }
                    }
                    Ok(None) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::USER_AGENT;
    use futures::TryStreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "qwen3-max",
            vec![Message::system("be helpful"), Message::user("hello")],
        )
        .with_temperature(0.7)
    }

    fn sse_body(events: &[&str]) -> String {
        events
            .iter()
            .map(|event| format!("data: {}\n\n", event))
            .collect()
    }

    /// Serve one request, answering with a chunked body written in `parts`,
    /// one network write per part. Returns the base URL.
    async fn serve_chunked(parts: Vec<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Read the whole request so the client never sees a reset.
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
                let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + content_length {
                    break;
                }
            }

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\n\
                      content-type: text/event-stream\r\n\
                      transfer-encoding: chunked\r\n\r\n",
                )
                .await
                .unwrap();
            for part in parts {
                let mut chunk = format!("{:x}\r\n", part.len()).into_bytes();
                chunk.extend_from_slice(&part);
                chunk.extend_from_slice(b"\r\n");
                // The client may hang up early after `[DONE]` or an error.
                if socket.write_all(&chunk).await.is_err() || socket.flush().await.is_err() {
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        format!("http://{}", addr)
    }

    #[test]
    fn take_event_keeps_split_characters_intact() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\n".as_bytes();
        let split = body.iter().position(|b| *b >= 0x80).unwrap() + 1;

        let mut buffer = body[..split].to_vec();
        assert!(take_event(&mut buffer).is_none());

        buffer.extend_from_slice(&body[split..]);
        let event = take_event(&mut buffer).expect("complete event");
        assert!(buffer.is_empty());

        let payloads = data_payloads(&event).unwrap();
        let chunks = parse_data_line(payloads[0]).unwrap().unwrap();
        assert_eq!(chunks, vec![StreamChunk::text("你好")]);
    }

    #[test]
    fn data_payloads_rejects_invalid_utf8() {
        assert!(matches!(
            data_payloads(b"data: \xff\xfe"),
            Err(AiError::Utf8(_))
        ));
    }

    #[test]
    fn parse_data_line_skips_empty_deltas() {
        let chunks = parse_data_line(r#"{"choices":[{"delta":{"content":""}}]}"#)
            .unwrap()
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn parse_data_line_reports_done_sentinel() {
        assert!(parse_data_line(" [DONE]").unwrap().is_none());
    }

    #[test]
    fn parse_data_line_surfaces_upstream_error() {
        let err = parse_data_line(r#"{"error":{"message":"quota exceeded"}}"#).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn parse_data_line_rejects_malformed_json() {
        assert!(matches!(
            parse_data_line("{not json"),
            Err(AiError::Json(_))
        ));
    }

    #[tokio::test]
    async fn streams_text_chunks_in_order() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"choices":[{"delta":{"role":"assistant","content":"Hel"}}]}"#,
            r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ]);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("user-agent", USER_AGENT))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen3-max",
                "stream": true,
                "temperature": 0.7,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("test-key").with_base_url(server.uri());
        let chunks: Vec<StreamChunk> = client
            .complete_stream(request())
            .try_collect()
            .await
            .expect("stream should succeed");

        let text: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "Hello");
        assert_eq!(
            chunks.last().and_then(|c| c.finish_reason.clone()),
            Some(FinishReason::Stop)
        );
    }

    #[tokio::test]
    async fn non_success_status_becomes_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "3")
                    .set_body_string("rate limited"),
            )
            .mount(&server)
            .await;

        let client = OpenAIClient::new("test-key").with_base_url(server.uri());
        let results: Vec<Result<StreamChunk>> = client.complete_stream(request()).collect().await;

        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(AiError::LlmHttp {
                status,
                message,
                retry_after_secs,
                ..
            }) => {
                assert_eq!(*status, 429);
                assert_eq!(message, "rate limited");
                assert_eq!(*retry_after_secs, Some(3));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_event_ends_stream_with_error() {
        let server = MockServer::start().await;
        let body = format!(
            "{}data: {{broken\n\n{}",
            sse_body(&[r#"{"choices":[{"delta":{"content":"partial"}}]}"#]),
            sse_body(&[r#"{"choices":[{"delta":{"content":"never seen"}}]}"#]),
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("test-key").with_base_url(server.uri());
        let results: Vec<Result<StreamChunk>> = client.complete_stream(request()).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().text, "partial");
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn character_split_across_reads_is_decoded_whole() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\ndata: [DONE]\n\n"
            .as_bytes()
            .to_vec();
        // Split right after the first byte of the first CJK character.
        let split = body.iter().position(|b| *b >= 0x80).unwrap() + 1;
        let base_url = serve_chunked(vec![body[..split].to_vec(), body[split..].to_vec()]).await;

        let client = OpenAIClient::new("test-key").with_base_url(base_url);
        let chunks: Vec<StreamChunk> = client
            .complete_stream(request())
            .try_collect()
            .await
            .expect("stream should succeed");

        let text: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "你好");
    }

    #[tokio::test]
    async fn invalid_utf8_ends_stream_with_error() {
        let mut body = b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n".to_vec();
        body.extend_from_slice(b"data: \xff\xfe\n\n");
        let base_url = serve_chunked(vec![body]).await;

        let client = OpenAIClient::new("test-key").with_base_url(base_url);
        let results: Vec<Result<StreamChunk>> = client.complete_stream(request()).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().text, "ok");
        assert!(matches!(results[1], Err(AiError::Utf8(_))));
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line_is_parsed() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("test-key").with_base_url(format!("{}/", server.uri()));
        let chunks: Vec<StreamChunk> = client
            .complete_stream(request())
            .try_collect()
            .await
            .expect("stream should succeed");

        assert_eq!(chunks, vec![StreamChunk::text("tail")]);
    }
}
