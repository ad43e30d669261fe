//! Stream adapter for OpenAI-style delta chunks.
//!
//! Tool calls arrive as `tool_calls` fragments: the name usually in the first
//! fragment and the JSON arguments spread across the rest. Content that
//! arrives while a call is being assembled is dropped.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::base::{ChunkStream, EventStream, StreamEvent};
use super::openai::{ChatCompletionChunk, ToolCallDelta};
use crate::models::tool::PendingToolCall;

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeltaState {
    Idle,
    Emitting,
    ToolAccumulating { index: u32, call: PendingToolCall },
    ToolCallComplete,
}

/// Per-stream state machine turning chunks into [`StreamEvent`]s.
#[derive(Debug)]
pub struct DeltaAdapter {
    state: DeltaState,
    infer_completion: bool,
}

impl DeltaAdapter {
    /// `infer_completion` is for providers that never send a `tool_calls`
    /// finish reason; any stop signal then completes a named call.
    pub fn new(infer_completion: bool) -> Self {
        Self {
            state: DeltaState::Idle,
            infer_completion,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == DeltaState::ToolCallComplete
    }

    pub fn on_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
        if self.is_complete() {
            debug!("ignoring chunk after tool call completion");
            return Vec::new();
        }
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        match choice.delta.tool_calls.filter(|calls| !calls.is_empty()) {
            Some(tool_calls) => {
                for delta in tool_calls {
                    self.accumulate(delta, &mut events);
                }
            }
            None => {
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    match self.state {
                        DeltaState::Idle | DeltaState::Emitting => {
                            self.state = DeltaState::Emitting;
                            events.push(StreamEvent::Content(content));
                        }
                        _ => debug!("suppressing content while a tool call is assembled"),
                    }
                }
            }
        }

        if let Some(reason) = choice.finish_reason.as_deref() {
            self.on_finish_reason(reason, &mut events);
        }
        events
    }

    /// Stream ended without a further chunk
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let state = std::mem::replace(&mut self.state, DeltaState::ToolCallComplete);
        match state {
            DeltaState::ToolAccumulating { call, .. }
                if self.infer_completion && !call.name.is_empty() =>
            {
                vec![StreamEvent::ToolCallReady(call)]
            }
            DeltaState::ToolAccumulating { call, .. } => {
                warn!(tool = %call.name, "stream ended before the tool call completed");
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn accumulate(&mut self, delta: ToolCallDelta, events: &mut Vec<StreamEvent>) {
        if matches!(self.state, DeltaState::Idle | DeltaState::Emitting) {
            debug!(index = delta.index, "tool call started");
            self.state = DeltaState::ToolAccumulating {
                index: delta.index,
                call: PendingToolCall::default(),
            };
        }

        let DeltaState::ToolAccumulating { index, call } = &mut self.state else {
            return;
        };
        if delta.index != *index {
            warn!(
                index = delta.index,
                "ignoring additional tool call in the same turn"
            );
            return;
        }

        if call.name.is_empty() {
            if let Some(name) = delta.function.name.filter(|n| !n.is_empty()) {
                call.name = name.clone();
                events.push(StreamEvent::ToolCallStarted(name));
            }
        }
        if let Some(arguments) = delta.function.arguments {
            call.arguments.push_str(&arguments);
        }
    }

    fn on_finish_reason(&mut self, reason: &str, events: &mut Vec<StreamEvent>) {
        let ready = match &self.state {
            DeltaState::ToolAccumulating { call, .. } => {
                reason == "tool_calls" || (self.infer_completion && !call.name.is_empty())
            }
            _ => false,
        };
        if !ready {
            return;
        }
        if let DeltaState::ToolAccumulating { call, .. } =
            std::mem::replace(&mut self.state, DeltaState::ToolCallComplete)
        {
            debug!(tool = %call.name, reason, "tool call complete");
            events.push(StreamEvent::ToolCallReady(call));
        }
    }
}

/// Adapt a chunk stream with tool-call detection
pub fn adapt(chunks: ChunkStream, infer_completion: bool) -> EventStream {
    let stream = async_stream::try_stream! {
        let mut adapter = DeltaAdapter::new(infer_completion);
        let mut chunks = chunks;
        while let Some(chunk) = chunks.next().await {
            for event in adapter.on_chunk(chunk?) {
                yield event;
            }
        }
        for event in adapter.finish() {
            yield event;
        }
    };
    Box::pin(stream)
}

/// Adapt a chunk stream for a call made without tool definitions
pub fn content_only(chunks: ChunkStream) -> EventStream {
    chunks
        .flat_map(|chunk| {
            let content = chunk.map(|chunk| {
                chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|content| !content.is_empty())
            });
            stream::iter(content.transpose().map(|c| c.map(StreamEvent::Content)))
        })
        .boxed()
}
