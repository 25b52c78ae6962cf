//! LLM module - streaming client abstraction

mod client;
mod http_error;
#[cfg(any(test, feature = "test-utils"))]
mod mock_client;
mod openai;

pub use client::{
    CompletionRequest, FinishReason, LlmClient, Message, Role, StreamChunk, StreamResult,
};
pub use http_error::response_to_error;
#[cfg(any(test, feature = "test-utils"))]
pub use mock_client::{MockLlmClient, MockStep};
pub use openai::OpenAIClient;
