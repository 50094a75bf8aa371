//! SSE framing: `data: {json}\n\n` lines terminated by a `[DONE]` marker.

use crate::frames::FrameEncoder;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tandem_contract::AgentEvent;

/// Terminal marker: streaming consumers are never left waiting.
pub const DONE_MARKER: &str = "data: [DONE]\n\n";

/// Encode an engine event stream as SSE data lines.
///
/// The `[DONE]` marker is always appended once the event stream ends,
/// whether the run finished, aborted, or was cut short.
pub fn sse_frame_stream<S>(
    events: S,
    encoder: FrameEncoder,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = AgentEvent> + Send + 'static,
{
    async_stream::stream! {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            let Some(frame) = encoder.encode(&event) else {
                continue;
            };
            match serde_json::to_string(&frame) {
                Ok(json) => yield Ok(Bytes::from(format!("data: {json}\n\n"))),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize stream frame");
                }
            }
        }
        yield Ok(Bytes::from(DONE_MARKER));
    }
}

/// Build an SSE response from a byte stream.
pub fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}
