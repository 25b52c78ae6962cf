use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use chatrelay_ai::{CompletionRequest, LlmClient, Message};
use futures::{Stream, StreamExt};
use tracing::warn;

use super::event::{DomainEvent, StructuredEvent};

/// Lazily produced events for one response.
pub type EventStream = Pin<Box<dyn Stream<Item = DomainEvent> + Send>>;

/// Preamble sent ahead of every user message in live mode.
pub const SYSTEM_PREAMBLE: &str = "You are a helpful assistant.";

pub const LIVE_TEMPERATURE: f32 = 0.7;

/// Producer of the events for a single request. Consumed once.
pub enum StreamSource {
    Live(LiveCompletionSource),
    Scripted(ScriptedSource),
}

impl StreamSource {
    /// Sources never emit `End`; the relay appends it after clean exhaustion.
    /// A failure shows up as a final `Error` event.
    pub fn into_events(self) -> EventStream {
        match self {
            StreamSource::Live(source) => source.into_events(),
            StreamSource::Scripted(source) => source.into_events(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamSource::Live(_) => "live",
            StreamSource::Scripted(_) => "scripted",
        }
    }
}

/// Relays one upstream streaming completion as text deltas.
pub struct LiveCompletionSource {
    client: Arc<dyn LlmClient>,
    backend_id: String,
    message: String,
}

impl LiveCompletionSource {
    pub fn new(
        client: Arc<dyn LlmClient>,
        backend_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            client,
            backend_id: backend_id.into(),
            message: message.into(),
        }
    }

    fn into_events(self) -> EventStream {
        Box::pin(stream! {
            let request = CompletionRequest::new(
                self.backend_id,
                vec![Message::system(SYSTEM_PREAMBLE), Message::user(self.message)],
            )
            .with_temperature(LIVE_TEMPERATURE);

            let mut chunks = self.client.complete_stream(request);
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(chunk) if chunk.has_text() => {
                        yield DomainEvent::text_delta(chunk.text);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        if let Some(secs) = err.retry_after() {
                            warn!(
                                provider = self.client.provider(),
                                retry_after_secs = secs,
                                "Backend asked callers to back off"
                            );
                        }
                        yield DomainEvent::error(format!("model call failed: {}", err));
                        return;
                    }
                }
            }
        })
    }
}

/// Replays a pre-authored script with a pause before every event.
pub struct ScriptedSource {
    events: Arc<[StructuredEvent]>,
    delay: Duration,
}

impl ScriptedSource {
    pub fn new(events: Arc<[StructuredEvent]>, delay: Duration) -> Self {
        Self { events, delay }
    }

    fn into_events(self) -> EventStream {
        Box::pin(stream! {
            for event in self.events.iter() {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                yield DomainEvent::Structured(event.clone());
            }
        })
    }
}
