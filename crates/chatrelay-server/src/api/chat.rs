use crate::api::{error::ApiError, state::AppState};
use crate::relay::{
    LiveCompletionSource, RelayContext, ScriptedSource, StreamSource, pump, pump::FRAME_BUFFER,
    select_script,
};
use axum::{
    Json,
    body::Body,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

const PREVIEW_CHARS: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub model: String,
}

// GET /api/chat?message=..&model=..
pub async fn chat_query(
    State(state): State<AppState>,
    query: Result<Query<ChatRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(request) = query.map_err(|err| {
        warn!(error = %err, "Failed to parse chat query");
        ApiError::MalformedRequest
    })?;
    open_stream(&state, request)
}

// POST /api/chat
pub async fn chat_json(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|err| {
        warn!(error = %err, "Failed to parse chat body");
        ApiError::MalformedRequest
    })?;
    open_stream(&state, request)
}

/// Validate the request, pick a source and commit the SSE response.
///
/// Every error returned from here happens before any byte of the stream is
/// written; later failures travel inside the stream.
fn open_stream(state: &AppState, request: ChatRequest) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let message = request.message.trim();
    if message.is_empty() {
        warn!(%request_id, model = %request.model, "Rejected empty chat message");
        return Err(ApiError::EmptyMessage);
    }

    let message_preview = preview(message);
    let source = select_source(state, message, &request.model).inspect_err(|err| {
        warn!(%request_id, message_preview = %message_preview, error = %err, "Rejected chat request");
    })?;

    info!(
        %request_id,
        model = %request.model,
        source = source.kind(),
        message_preview = %message_preview,
        "Opening chat stream"
    );

    let ctx = RelayContext {
        request_id,
        message_preview,
        max_duration: state.relay.max_stream_duration,
    };

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(pump(source, tx, ctx).instrument(info_span!("relay", %request_id)));

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        body,
    )
        .into_response())
}

fn select_source(state: &AppState, message: &str, model: &str) -> Result<StreamSource, ApiError> {
    if model == state.relay.scripted_label {
        let key = select_script(message, state.picker.as_ref());
        info!(script = key.as_str(), "Using scripted reply");
        return Ok(StreamSource::Scripted(ScriptedSource::new(
            state.scripts.get(key),
            state.relay.script_delay,
        )));
    }

    let backend_id = state
        .registry
        .resolve(model)
        .map_err(|_| ApiError::UnknownModel(model.to_string()))?;
    let llm = state.llm.clone().ok_or(ApiError::BackendUnavailable)?;

    Ok(StreamSource::Live(LiveCompletionSource::new(
        llm, backend_id, message,
    )))
}

fn preview(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
