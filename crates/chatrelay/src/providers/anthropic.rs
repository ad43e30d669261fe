use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::base::{BlockClient, BlockStream, CompletionRequest};
use super::configs::AnthropicProviderConfig;
use super::sse::data_stream;
use super::utils::{messages_to_anthropic_spec, tools_to_anthropic_spec};
use crate::errors::ProviderError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One event of the Anthropic messages stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockEvent {
    MessageStart {
        #[serde(default)]
        message: Value,
    },
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessageDeltaBody,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiErrorBody,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl BlockEvent {
    pub fn text_start(index: u32) -> Self {
        BlockEvent::ContentBlockStart {
            index,
            content_block: ContentBlock::Text {
                text: String::new(),
            },
        }
    }

    pub fn text<S: Into<String>>(index: u32, text: S) -> Self {
        BlockEvent::ContentBlockDelta {
            index,
            delta: BlockDelta::TextDelta { text: text.into() },
        }
    }

    pub fn tool_use_start<S: Into<String>>(index: u32, name: S) -> Self {
        BlockEvent::ContentBlockStart {
            index,
            content_block: ContentBlock::ToolUse {
                id: format!("toolu_{}", index),
                name: name.into(),
            },
        }
    }

    pub fn input_json<S: Into<String>>(index: u32, partial_json: S) -> Self {
        BlockEvent::ContentBlockDelta {
            index,
            delta: BlockDelta::InputJsonDelta {
                partial_json: partial_json.into(),
            },
        }
    }

    pub fn stop_reason<S: Into<String>>(reason: S) -> Self {
        BlockEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some(reason.into()),
            },
        }
    }
}

fn decode_event(data: &str) -> Result<BlockEvent, ProviderError> {
    match serde_json::from_str::<BlockEvent>(data) {
        Ok(BlockEvent::Error { error }) => Err(ProviderError::Protocol(format!(
            "{}: {}",
            error.kind, error.message
        ))),
        Ok(event) => Ok(event),
        Err(e) => Err(ProviderError::Decode(format!("{}: {}", e, data))),
    }
}

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, request: &CompletionRequest) -> Value {
        let (system, messages) = messages_to_anthropic_spec(&request.messages);
        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "stream": true,
        });
        if let Some(system) = system {
            payload["system"] = json!(system);
        }
        if !request.tools.is_empty() {
            payload["tools"] = json!(tools_to_anthropic_spec(&request.tools));
        }
        payload
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(ProviderError::Http {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl BlockClient for AnthropicProvider {
    async fn stream(&self, request: CompletionRequest) -> Result<BlockStream, ProviderError> {
        let payload = self.payload(&request);
        tracing::debug!(
            model = %request.model,
            tools = request.tools.len(),
            "opening anthropic message stream"
        );
        let response = self.post(&payload).await?;
        Ok(data_stream(response)
            .map(|data| data.and_then(|data| decode_event(&data)))
            .boxed())
    }
}
