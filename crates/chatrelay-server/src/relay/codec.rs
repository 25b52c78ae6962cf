//! SSE framing for [`DomainEvent`]s. Producer side only.

use axum::body::Bytes;

use super::event::DomainEvent;

/// Record sent after a stream finishes without error.
pub const END_FRAME: &str = "event: end\ndata: Stream completed\n\n";

/// Sent in place of an event that could not be serialized.
const ENCODE_FAILURE_FRAME: &str = "data: {\"error\":\"event encoding failed\"}\n\n";

/// Encode one event as a complete SSE record.
pub fn encode(event: &DomainEvent) -> Result<Bytes, serde_json::Error> {
    if let DomainEvent::End = event {
        return Ok(Bytes::from_static(END_FRAME.as_bytes()));
    }

    let json = serde_json::to_string(event)?;
    let mut frame = String::with_capacity(json.len() + 8);
    frame.push_str("data: ");
    frame.push_str(&json);
    frame.push_str("\n\n");
    Ok(Bytes::from(frame))
}

/// Like [`encode`], but never fails: a serialization error becomes a
/// generic error record so the stream stays well formed.
pub fn encode_or_error_frame(event: &DomainEvent) -> Bytes {
    encode(event).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to encode stream event");
        Bytes::from_static(ENCODE_FAILURE_FRAME.as_bytes())
    })
}
