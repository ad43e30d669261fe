//! Stream adapter for Anthropic-style block events.
//!
//! The tool name is known as soon as its `tool_use` block starts, so the
//! client is told right away. Arguments follow as `input_json_delta`
//! fragments and the turn ends with a `tool_use` stop reason.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::anthropic::{BlockDelta, BlockEvent, ContentBlock};
use super::base::{BlockStream, EventStream, StreamEvent};
use crate::models::tool::PendingToolCall;

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockState {
    Streaming,
    ToolAccumulating { index: u32, call: PendingToolCall },
    ToolCallComplete,
}

#[derive(Debug)]
pub struct BlockAdapter {
    state: BlockState,
}

impl Default for BlockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockAdapter {
    pub fn new() -> Self {
        Self {
            state: BlockState::Streaming,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == BlockState::ToolCallComplete
    }

    pub fn on_event(&mut self, event: BlockEvent) -> Vec<StreamEvent> {
        if self.is_complete() {
            debug!("ignoring event after tool call completion");
            return Vec::new();
        }

        match event {
            BlockEvent::ContentBlockStart {
                index,
                content_block: ContentBlock::ToolUse { name, .. },
            } => {
                if self.state != BlockState::Streaming {
                    warn!(tool = %name, "ignoring additional tool call in the same turn");
                    return Vec::new();
                }
                debug!(tool = %name, index, "tool use block started");
                self.state = BlockState::ToolAccumulating {
                    index,
                    call: PendingToolCall::new(name.clone(), ""),
                };
                vec![StreamEvent::ToolCallStarted(name)]
            }
            BlockEvent::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
                ..
            } if !text.is_empty() => vec![StreamEvent::Content(text)],
            BlockEvent::ContentBlockDelta {
                index,
                delta: BlockDelta::InputJsonDelta { partial_json },
            } => {
                if let BlockState::ToolAccumulating { index: active, call } = &mut self.state {
                    if *active == index {
                        call.arguments.push_str(&partial_json);
                    }
                }
                Vec::new()
            }
            BlockEvent::MessageDelta { delta } if delta.stop_reason.as_deref() == Some("tool_use") => {
                match std::mem::replace(&mut self.state, BlockState::ToolCallComplete) {
                    BlockState::ToolAccumulating { call, .. } => {
                        debug!(tool = %call.name, "tool call complete");
                        vec![StreamEvent::ToolCallReady(call)]
                    }
                    other => {
                        self.state = other;
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        if let BlockState::ToolAccumulating { call, .. } = &self.state {
            warn!(tool = %call.name, "stream ended before the tool call completed");
        }
    }
}

/// Adapt a block event stream with tool-call detection
pub fn adapt(events: BlockStream) -> EventStream {
    let stream = async_stream::try_stream! {
        let mut adapter = BlockAdapter::new();
        let mut events = events;
        while let Some(event) = events.next().await {
            for out in adapter.on_event(event?) {
                yield out;
            }
        }
        adapter.finish();
    };
    Box::pin(stream)
}

/// Adapt a block event stream for a call made without tool definitions
pub fn content_only(events: BlockStream) -> EventStream {
    events
        .flat_map(|event| {
            let content = event.map(|event| match event {
                BlockEvent::ContentBlockDelta {
                    delta: BlockDelta::TextDelta { text },
                    ..
                } if !text.is_empty() => Some(StreamEvent::Content(text)),
                _ => None,
            });
            stream::iter(content.transpose())
        })
        .boxed()
}
