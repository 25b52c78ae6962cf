//! ChatRelay AI - streaming LLM backend for the relay server
//!
//! This crate provides:
//! - Chat message and completion request types
//! - The `LlmClient` streaming trait
//! - An OpenAI-compatible streaming client
//! - A scripted mock client for tests (`test-utils` feature)

pub mod error;
mod http_client;
pub mod llm;

pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, LlmClient, Message, OpenAIClient, Role, StreamChunk, StreamResult,
};

#[cfg(any(test, feature = "test-utils"))]
pub use llm::{MockLlmClient, MockStep};
