use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::anthropic::BlockEvent;
use super::openai::ChatCompletionChunk;
use super::{block, delta};
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::{PendingToolCall, Tool};

/// Vendors the relay knows how to reach.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Gemini,
    DeepSeek,
    Grok,
    Qwen,
    Groq,
    Cerebras,
    Anthropic,
}

/// Streaming wire shape a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// OpenAI-style `choices[].delta` chunks with incremental `tool_calls`
    Delta,
    /// Anthropic-style block start/delta/stop events
    Block,
}

impl ProviderId {
    pub fn family(&self) -> ProviderFamily {
        match self {
            ProviderId::Anthropic => ProviderFamily::Block,
            _ => ProviderFamily::Delta,
        }
    }

    pub fn default_host(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "https://api.openai.com/v1",
            ProviderId::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            ProviderId::DeepSeek => "https://api.deepseek.com",
            ProviderId::Grok => "https://api.x.ai/v1",
            ProviderId::Qwen => "https://dashscope-intl.aliyuncs.com/compatible-mode/v1",
            ProviderId::Groq => "https://api.groq.com/openai/v1",
            ProviderId::Cerebras => "https://api.cerebras.ai/v1",
            ProviderId::Anthropic => "https://api.anthropic.com",
        }
    }

    /// Providers that never finish a tool-calling turn with `tool_calls`
    pub fn infers_tool_completion(&self) -> bool {
        matches!(self, ProviderId::Gemini)
    }

    /// Providers that only accept plain string message content
    pub fn requires_plain_content(&self) -> bool {
        matches!(self, ProviderId::Gemini)
    }
}

/// A single completion call as the orchestrator sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Empty means the call is made without tool definitions
    pub tools: Vec<Tool>,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new<S: Into<String>>(model: S, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            stream: true,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

pub type ChunkStream = BoxStream<'static, Result<ChatCompletionChunk, ProviderError>>;
pub type BlockStream = BoxStream<'static, Result<BlockEvent, ProviderError>>;
pub type EventStream = BoxStream<'static, Result<StreamEvent, ProviderError>>;

/// Source of OpenAI-style completion chunks
#[async_trait]
pub trait DeltaClient: Send + Sync {
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ProviderError>;
}

/// Source of Anthropic-style block events
#[async_trait]
pub trait BlockClient: Send + Sync {
    async fn stream(&self, request: CompletionRequest) -> Result<BlockStream, ProviderError>;
}

/// Provider-neutral output of a stream adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    /// The tool name became known while its arguments are still streaming
    ToolCallStarted(String),
    /// The single tool call of this turn is complete
    ToolCallReady(PendingToolCall),
}

#[derive(Clone)]
pub enum ProviderHandle {
    Delta(Arc<dyn DeltaClient>),
    Block(Arc<dyn BlockClient>),
}

impl ProviderHandle {
    pub fn family(&self) -> ProviderFamily {
        match self {
            ProviderHandle::Delta(_) => ProviderFamily::Delta,
            ProviderHandle::Block(_) => ProviderFamily::Block,
        }
    }

    /// Open a stream and wrap it in the adapter for this family.
    ///
    /// A request without tools gets the content-only adapter.
    pub async fn open(
        &self,
        provider: ProviderId,
        request: CompletionRequest,
    ) -> Result<EventStream, ProviderError> {
        let tools_enabled = !request.tools.is_empty();
        match self {
            ProviderHandle::Delta(client) => {
                let chunks = client.stream(request).await?;
                Ok(if tools_enabled {
                    delta::adapt(chunks, provider.infers_tool_completion())
                } else {
                    delta::content_only(chunks)
                })
            }
            ProviderHandle::Block(client) => {
                let events = client.stream(request).await?;
                Ok(if tools_enabled {
                    block::adapt(events)
                } else {
                    block::content_only(events)
                })
            }
        }
    }
}

/// Client handles keyed by provider, built once at startup.
#[derive(Clone, Default)]
pub struct ProviderTable {
    entries: HashMap<ProviderId, ProviderHandle>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider: ProviderId, handle: ProviderHandle) {
        self.entries.insert(provider, handle);
    }

    pub fn with(mut self, provider: ProviderId, handle: ProviderHandle) -> Self {
        self.insert(provider, handle);
        self
    }

    pub fn get(&self, provider: ProviderId) -> Option<&ProviderHandle> {
        self.entries.get(&provider)
    }

    pub fn contains(&self, provider: ProviderId) -> bool {
        self.entries.contains_key(&provider)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
