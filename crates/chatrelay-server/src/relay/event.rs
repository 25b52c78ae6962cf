use serde::{Deserialize, Serialize};

/// One unit of streamed content for a single chat response.
///
/// `Error` and `End` are terminal: a stream carries at most one of them and
/// nothing follows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    TextDelta {
        text: String,
    },
    Structured(StructuredEvent),
    Error {
        #[serde(rename = "error")]
        message: String,
    },
    End,
}

impl DomainEvent {
    pub fn text_delta(text: impl Into<String>) -> Self {
        DomainEvent::TextDelta { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        DomainEvent::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DomainEvent::Error { .. } | DomainEvent::End)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Thinking,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredContent {
    Text(String),
    Code(CodeBlock),
}

/// A pre-authored "thinking" or "result" step of a scripted reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "contentType")]
    pub content_type: ContentType,
    pub content: StructuredContent,
}

impl StructuredEvent {
    /// Whether `content_type` agrees with the shape of `content`.
    pub fn is_consistent(&self) -> bool {
        matches!(
            (self.content_type, &self.content),
            (ContentType::Text, StructuredContent::Text(_))
                | (ContentType::Code, StructuredContent::Code(_))
        )
    }

    pub fn code_block(&self) -> Option<&CodeBlock> {
        match &self.content {
            StructuredContent::Code(block) => Some(block),
            StructuredContent::Text(_) => None,
        }
    }
}
