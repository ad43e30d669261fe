use crate::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use chatrelay::models::event::ChatEvent;
use chatrelay::orchestrator::{ChatRequest, Relay};
use futures::Stream;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Terminal frame, sent exactly once after the last event
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// One `data:` frame per event
pub fn format_event(event: &ChatEvent) -> String {
    match serde_json::to_string(event) {
        Ok(json) => format!("data: {}\n\n", json),
        Err(e) => {
            tracing::error!("Failed to encode event: {}", e);
            String::new()
        }
    }
}

// Event stream response: every relayed event, then the terminal frame
pub struct SseResponse {
    rx: ReceiverStream<ChatEvent>,
    finished: bool,
}

impl SseResponse {
    fn new(rx: ReceiverStream<ChatEvent>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match Pin::new(&mut self.rx).poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(Bytes::from(format_event(&event))))),
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(Some(Ok(Bytes::from_static(DONE_FRAME.as_bytes()))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

async fn handler(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> SseResponse {
    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tracing::info!(model = %request.model_name, "received chat request");

    // The turn runs on its own task; dropping the relay ends the response
    tokio::spawn(async move {
        let relay = Relay::new(tx);
        state.orchestrator.reply(request, &relay).await;
    });

    SseResponse::new(stream)
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}
