use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::base::{ChunkStream, CompletionRequest, DeltaClient};
use super::configs::OpenAiCompatibleConfig;
use super::sse::data_stream;
use super::utils::{messages_to_openai_spec, tools_to_openai_spec};
use crate::errors::ProviderError;

/// One streamed `chat.completion.chunk`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: FunctionDelta,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

impl ChatCompletionChunk {
    pub fn content<S: Into<String>>(text: S) -> Self {
        Self::from_delta(
            ChunkDelta {
                content: Some(text.into()),
                tool_calls: None,
            },
            None,
        )
    }

    pub fn tool_call(index: u32, name: Option<&str>, arguments: Option<&str>) -> Self {
        Self::from_delta(
            ChunkDelta {
                content: None,
                tool_calls: Some(vec![ToolCallDelta {
                    index,
                    id: None,
                    function: FunctionDelta {
                        name: name.map(String::from),
                        arguments: arguments.map(String::from),
                    },
                }]),
            },
            None,
        )
    }

    pub fn finish<S: Into<String>>(reason: S) -> Self {
        Self::from_delta(ChunkDelta::default(), Some(reason.into()))
    }

    pub fn with_finish_reason<S: Into<String>>(mut self, reason: S) -> Self {
        if let Some(choice) = self.choices.first_mut() {
            choice.finish_reason = Some(reason.into());
        }
        self
    }

    fn from_delta(delta: ChunkDelta, finish_reason: Option<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta,
                finish_reason,
            }],
        }
    }
}

/// Fold a non-streaming completion into a single chunk so it flows
/// through the same adapter as streamed output.
pub fn completion_to_chunk(response: &Value) -> Result<ChatCompletionChunk, ProviderError> {
    let choice = response
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| ProviderError::Decode("completion has no choices".to_string()))?;
    let message = &choice["message"];

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .map(|(index, call)| ToolCallDelta {
                    index: index as u32,
                    id: call["id"].as_str().map(String::from),
                    function: FunctionDelta {
                        name: call["function"]["name"].as_str().map(String::from),
                        arguments: call["function"]["arguments"].as_str().map(String::from),
                    },
                })
                .collect::<Vec<_>>()
        })
        .filter(|calls| !calls.is_empty());

    Ok(ChatCompletionChunk {
        choices: vec![ChunkChoice {
            delta: ChunkDelta {
                content: message["content"].as_str().map(String::from),
                tool_calls,
            },
            finish_reason: choice["finish_reason"].as_str().map(String::from),
        }],
    })
}

fn decode_chunk(data: &str) -> Result<ChatCompletionChunk, ProviderError> {
    let value: Value = serde_json::from_str(data)
        .map_err(|e| ProviderError::Decode(format!("{}: {}", e, data)))?;
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(ProviderError::Protocol(message));
    }
    serde_json::from_value(value).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Client for every vendor that speaks the OpenAI chat completions API.
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, request: &CompletionRequest) -> Value {
        let plain_content = self.config.provider.requires_plain_content();
        let mut payload = json!({
            "model": request.model,
            "messages": messages_to_openai_spec(&request.messages, plain_content),
            "stream": request.stream,
        });
        if !request.tools.is_empty() {
            payload["tools"] = json!(tools_to_openai_spec(&request.tools));
        }
        payload
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!(
            "{}/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
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
impl DeltaClient for OpenAiCompatibleProvider {
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ProviderError> {
        let payload = self.payload(&request);
        tracing::debug!(
            provider = %self.config.provider,
            model = %request.model,
            stream = request.stream,
            tools = request.tools.len(),
            "opening completion"
        );
        let response = self.post(&payload).await?;

        if !request.stream {
            let body: Value = response.json().await?;
            let chunk = completion_to_chunk(&body);
            return Ok(stream::once(async move { chunk }).boxed());
        }

        Ok(data_stream(response)
            .map(|data| data.and_then(|data| decode_chunk(&data)))
            .boxed())
    }
}
