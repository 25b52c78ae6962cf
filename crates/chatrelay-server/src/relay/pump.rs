//! Drives a [`StreamSource`] into the response body of one connection.

use std::time::Duration;

use axum::body::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::codec::encode_or_error_frame;
use super::event::DomainEvent;
use super::source::StreamSource;

/// Frames are handed over through a channel of this size, so the pump is
/// never more than one frame ahead of the connection.
pub const FRAME_BUFFER: usize = 1;

/// Per-connection details used for logging and the stream deadline.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub request_id: Uuid,
    pub message_preview: String,
    pub max_duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Source exhausted; end marker delivered.
    Completed { frames: usize },
    /// Source reported an error, or the deadline passed; error frame delivered.
    Failed { frames: usize },
    /// Client went away; nothing more was written.
    Disconnected { frames: usize },
}

enum Step {
    Event(Option<DomainEvent>),
    TimedOut,
    Closed,
}

/// Pump events from `source` into `tx` until a terminal frame is sent,
/// the deadline passes, or the receiving side is dropped or stops draining.
///
/// The source is dropped when this returns, which releases any upstream
/// connection it holds.
pub async fn pump(source: StreamSource, tx: mpsc::Sender<Bytes>, ctx: RelayContext) -> RelayOutcome {
    let deadline = Instant::now() + ctx.max_duration;
    let mut events = source.into_events();
    let mut frames = 0usize;

    loop {
        let step = tokio::select! {
            biased;
            _ = tx.closed() => Step::Closed,
            next = timeout_at(deadline, events.next()) => match next {
                Ok(event) => Step::Event(event),
                Err(_) => Step::TimedOut,
            },
        };

        let event = match step {
            Step::Closed => {
                return disconnected(&ctx, frames);
            }
            Step::TimedOut => {
                warn!(
                    request_id = %ctx.request_id,
                    message_preview = %ctx.message_preview,
                    frames,
                    failure_point = "deadline",
                    "Stream exceeded its time limit"
                );
                DomainEvent::error(format!(
                    "stream timed out after {}s",
                    ctx.max_duration.as_secs()
                ))
            }
            Step::Event(None) => DomainEvent::End,
            Step::Event(Some(event)) => event,
        };

        let terminal = event.is_terminal();
        if let DomainEvent::Error { message } = &event {
            warn!(
                request_id = %ctx.request_id,
                message_preview = %ctx.message_preview,
                frames,
                failure_point = "source",
                error = %message,
                "Stream failed"
            );
        }

        // A reader that holds the socket open without draining it is
        // treated like one that went away.
        match timeout_at(deadline, tx.send(encode_or_error_frame(&event))).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return disconnected(&ctx, frames),
            Err(_) => {
                warn!(
                    request_id = %ctx.request_id,
                    message_preview = %ctx.message_preview,
                    frames,
                    failure_point = "client",
                    "Client stopped reading before the time limit"
                );
                return RelayOutcome::Disconnected { frames };
            }
        }
        frames += 1;
        debug!(request_id = %ctx.request_id, frames, "Frame handed to connection");

        if terminal {
            return match event {
                DomainEvent::End => {
                    info!(request_id = %ctx.request_id, frames, "Stream completed");
                    RelayOutcome::Completed { frames }
                }
                _ => RelayOutcome::Failed { frames },
            };
        }
    }
}

fn disconnected(ctx: &RelayContext, frames: usize) -> RelayOutcome {
    info!(
        request_id = %ctx.request_id,
        message_preview = %ctx.message_preview,
        frames,
        failure_point = "client",
        "Client disconnected, stopping stream"
    );
    RelayOutcome::Disconnected { frames }
}
