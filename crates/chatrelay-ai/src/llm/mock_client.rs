//! Deterministic mock LLM client for relay tests.

use std::sync::Arc;

use async_stream::stream;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::AiError;

use super::{CompletionRequest, FinishReason, LlmClient, StreamChunk, StreamResult};

/// What a scripted step yields.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Yield one text chunk.
    Text(String),
    /// Fail the stream with an LLM error.
    Error(String),
}

/// Scripted stream step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock LLM client driven by scripted steps.
///
/// Every call to `complete_stream` replays the same steps and records the
/// request it was given.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    steps: Arc<Vec<MockStep>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn from_steps(steps: Vec<MockStep>) -> Self {
        Self {
            steps: Arc::new(steps),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let steps = self.steps.clone();
        let requests = self.requests.clone();

        Box::pin(stream! {
            requests.lock().await.push(request);

            for step in steps.iter() {
                if step.delay_ms > 0 {
                    sleep(Duration::from_millis(step.delay_ms)).await;
                }
                match &step.kind {
                    MockStepKind::Text(content) => {
                        yield Ok(StreamChunk::text(content.clone()));
                    }
                    MockStepKind::Error(message) => {
                        yield Err(AiError::Llm(message.clone()));
                        return;
                    }
                }
            }

            yield Ok(StreamChunk::final_chunk(FinishReason::Stop));
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::llm::Message;

    #[tokio::test]
    async fn mock_client_replays_text_then_finishes() {
        let client = MockLlmClient::from_steps(vec![MockStep::text("a"), MockStep::text("b")]);

        let chunks: Vec<_> = client
            .complete_stream(CompletionRequest::new("m", vec![Message::user("hi")]))
            .collect()
            .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].as_ref().unwrap().text, "a");
        assert_eq!(chunks[1].as_ref().unwrap().text, "b");
        assert_eq!(
            chunks[2].as_ref().unwrap().finish_reason,
            Some(FinishReason::Stop)
        );

        let requests = client.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "m");
    }

    #[tokio::test]
    async fn mock_client_stops_after_error() {
        let client = MockLlmClient::from_steps(vec![
            MockStep::text("a"),
            MockStep::error("quota"),
            MockStep::text("never"),
        ]);

        let chunks: Vec<_> = client
            .complete_stream(CompletionRequest::new("m", vec![Message::user("hi")]))
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_err());
    }
}
