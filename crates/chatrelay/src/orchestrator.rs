//! Runs one chat turn: the first stream, at most one tool call and, for
//! tools whose output should be rewritten, a second summarizing stream.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{ChatError, ChatResult, ProviderError};
use crate::marker::{synthesize_marker, InlineScanner, ScanEnd};
use crate::models::event::ChatEvent;
use crate::models::message::Message;
use crate::models::model::{ModelDescriptor, ModelRegistry};
use crate::models::tool::PendingToolCall;
use crate::processor::{ProcessedText, ToolProcessor};
use crate::prompt_template;
use crate::providers::base::{
    CompletionRequest, EventStream, ProviderHandle, ProviderTable, StreamEvent,
};
use crate::tools::{OutputPolicy, ToolRegistry};

/// Separates first-stream narration from what follows the tool call
pub const SECOND_STREAM_SEPARATOR: &str = "\n\n";

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(rename = "modelName")]
    pub model_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Upper bound on a single tool execution
    pub tool_timeout: Duration,
    /// Longest wait for the next event of a provider stream
    pub idle_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

/// Where a turn's events go. A failed send means the client is gone.
#[derive(Debug, Clone)]
pub struct Relay {
    tx: mpsc::Sender<ChatEvent>,
}

impl Relay {
    pub fn new(tx: mpsc::Sender<ChatEvent>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, event: ChatEvent) -> ChatResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ChatError::ClientDisconnected)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A tool call found in the first stream.
enum PendingCall {
    /// From the provider's function-calling protocol
    Structured(PendingToolCall),
    /// Written by the model as marker text
    Inline(String),
}

struct FirstStream {
    relayed_content: bool,
    call: Option<PendingCall>,
}

pub struct Orchestrator {
    models: ModelRegistry,
    providers: ProviderTable,
    processor: ToolProcessor,
    limits: Limits,
}

impl Orchestrator {
    pub fn new(
        models: ModelRegistry,
        providers: ProviderTable,
        tools: Arc<ToolRegistry>,
        limits: Limits,
    ) -> Self {
        Self {
            models,
            providers,
            processor: ToolProcessor::new(tools, limits.tool_timeout),
            limits,
        }
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn providers(&self) -> &ProviderTable {
        &self.providers
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.processor.registry()
    }

    /// Run a turn, reporting any failure as a single error event.
    ///
    /// The caller owns the terminal `[DONE]` frame.
    pub async fn reply(&self, request: ChatRequest, relay: &Relay) {
        match self.run(request, relay).await {
            Ok(()) => {}
            Err(ChatError::ClientDisconnected) => {
                info!("client disconnected, abandoning turn");
            }
            Err(e) => {
                error!(error = %e, "chat turn failed");
                if relay.send(ChatEvent::error(e.to_string())).await.is_err() {
                    debug!("client gone before the error could be delivered");
                }
            }
        }
    }

    pub async fn run(&self, request: ChatRequest, relay: &Relay) -> ChatResult<()> {
        let model = self
            .models
            .get(&request.model_name)
            .ok_or_else(|| ChatError::InvalidModel(request.model_name.clone()))?;
        if request.messages.is_empty() {
            return Err(ChatError::InvalidRequest("no messages".to_string()));
        }
        for message in &request.messages {
            message.validate().map_err(ChatError::InvalidRequest)?;
        }
        let handle = self
            .providers
            .get(model.provider_id)
            .ok_or(ChatError::ProviderUnavailable(model.provider_id))?;

        info!(
            model = %model.name,
            provider = %model.provider_id,
            messages = request.messages.len(),
            "starting chat turn"
        );

        let first = self.first_stream(model, handle, request.messages, relay).await?;
        match first.call {
            Some(call) => {
                self.service_call(model, handle, call, first.relayed_content, relay)
                    .await
            }
            None => Ok(()),
        }
    }

    async fn first_stream(
        &self,
        model: &ModelDescriptor,
        handle: &ProviderHandle,
        history: Vec<Message>,
        relay: &Relay,
    ) -> ChatResult<FirstStream> {
        let registry = self.processor.registry();
        let (tools, instruction) = if model.supports_tools {
            (
                registry.tools_for(model.provider_id),
                prompt_template::system_prompt(None)?,
            )
        } else {
            let listed = registry.tools();
            (Vec::new(), prompt_template::system_prompt(Some(listed.as_slice()))?)
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::new(model.system_role, instruction));
        messages.extend(history);

        let request = CompletionRequest::new(&model.name, messages)
            .with_tools(tools)
            .with_stream(model.supports_streaming);
        let mut events = handle.open(model.provider_id, request).await?;

        let mut scanner = InlineScanner::new();
        let mut relayed_content = false;
        let mut ready = None;

        while let Some(event) = self.next_event(&mut events).await? {
            match event {
                StreamEvent::Content(text) => {
                    if let Some(text) = scanner.push(&text) {
                        relay.send(ChatEvent::content(text)).await?;
                        relayed_content = true;
                    }
                }
                StreamEvent::ToolCallStarted(name) => {
                    relay.send(ChatEvent::tool_call(name)).await?;
                }
                StreamEvent::ToolCallReady(call) => {
                    debug!(tool = %call.name, "tool call ready");
                    ready = Some(call);
                }
            }
        }

        let call = match (ready, scanner.finish()) {
            (Some(call), ScanEnd::Captured(text)) => {
                warn!(tool = %call.name, dropped = %text, "ignoring inline marker next to a structured call");
                Some(PendingCall::Structured(call))
            }
            (ready, ScanEnd::Text(text)) => {
                relay.send(ChatEvent::content(text)).await?;
                relayed_content = true;
                ready.map(PendingCall::Structured)
            }
            (ready, ScanEnd::Nothing) => ready.map(PendingCall::Structured),
            (None, ScanEnd::Captured(text)) => Some(PendingCall::Inline(text)),
        };

        Ok(FirstStream {
            relayed_content,
            call,
        })
    }

    async fn service_call(
        &self,
        model: &ModelDescriptor,
        handle: &ProviderHandle,
        call: PendingCall,
        relayed_content: bool,
        relay: &Relay,
    ) -> ChatResult<()> {
        let marker = match call {
            PendingCall::Structured(call) => {
                let field = self
                    .tools()
                    .get(&call.name)
                    .and_then(|handler| handler.marker_field());
                match synthesize_marker(&call, field) {
                    Ok(marker) => marker,
                    Err(e) => {
                        warn!(tool = %call.name, arguments = %call.arguments, "unusable tool arguments");
                        let text = format!("Error executing {}: {}", call.name, e);
                        return relay
                            .send(ChatEvent::content(lead(relayed_content, &text)))
                            .await;
                    }
                }
            }
            PendingCall::Inline(text) => text,
        };

        if relay.is_closed() {
            return Err(ChatError::ClientDisconnected);
        }
        let processed = self.processor.process(&marker).await;
        if processed.invocations.is_empty() {
            debug!("captured text held no complete tool marker");
            if processed.text.is_empty() {
                return Ok(());
            }
            return relay.send(ChatEvent::content(processed.text)).await;
        }

        if self.should_summarize(&processed) {
            if relayed_content {
                relay
                    .send(ChatEvent::content(SECOND_STREAM_SEPARATOR))
                    .await?;
            }
            self.second_stream(model, handle, processed.text, relay).await
        } else {
            relay
                .send(ChatEvent::content(lead(relayed_content, &processed.text)))
                .await
        }
    }

    /// Failed calls and passthrough tools are shown as they are
    fn should_summarize(&self, processed: &ProcessedText) -> bool {
        !processed.has_failures()
            && processed.invocations.iter().any(|invocation| {
                self.tools()
                    .get(&invocation.name)
                    .map(|handler| handler.output_policy())
                    == Some(OutputPolicy::Summarize)
            })
    }

    async fn second_stream(
        &self,
        model: &ModelDescriptor,
        handle: &ProviderHandle,
        rendered: String,
        relay: &Relay,
    ) -> ChatResult<()> {
        let messages = vec![
            Message::new(model.system_role, prompt_template::summarizer_prompt()?),
            Message::user().with_text(rendered),
        ];
        let request =
            CompletionRequest::new(&model.name, messages).with_stream(model.supports_streaming);
        if relay.is_closed() {
            return Err(ChatError::ClientDisconnected);
        }
        let mut events = handle.open(model.provider_id, request).await?;

        while let Some(event) = self.next_event(&mut events).await? {
            if let StreamEvent::Content(text) = event {
                relay.send(ChatEvent::content(text)).await?;
            }
        }
        Ok(())
    }

    async fn next_event(&self, events: &mut EventStream) -> ChatResult<Option<StreamEvent>> {
        let idle = self.limits.idle_timeout;
        let next = tokio::time::timeout(idle, events.next())
            .await
            .map_err(|_| ProviderError::Timeout(idle))?;
        Ok(next.transpose()?)
    }
}

fn lead(relayed_content: bool, text: &str) -> String {
    if relayed_content {
        format!("{}{}", SECOND_STREAM_SEPARATOR, text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolError;
    use crate::models::message::Role;
    use crate::providers::anthropic::BlockEvent;
    use crate::providers::base::ProviderId;
    use crate::providers::mock::{MockBlockClient, MockDeltaClient, MockScript};
    use crate::providers::openai::ChatCompletionChunk;
    use crate::tools::calculator::Calculator;
    use crate::tools::testing::StubTool;
    use crate::tools::{ToolHandler, ToolOutput};

    fn registry() -> Arc<ToolRegistry> {
        let handlers: Vec<Arc<dyn ToolHandler>> = vec![
            Arc::new(Calculator::new()),
            Arc::new(StubTool::echo("lookup", "query")),
            Arc::new(
                StubTool::new("draw", "chart", Ok(ToolOutput::text("```mermaid\npie\n```")))
                    .passthrough(),
            ),
            Arc::new(StubTool::new(
                "broken",
                "q",
                Err(ToolError::Execution("upstream returned 502".into())),
            )),
            Arc::new(
                StubTool::new("delta_only", "q", Ok(ToolOutput::text("x")))
                    .unsupported_on(ProviderId::Anthropic),
            ),
        ];
        Arc::new(ToolRegistry::new(handlers).unwrap())
    }

    fn models() -> ModelRegistry {
        ModelRegistry::new(vec![
            ModelDescriptor::new("delta-model", "Delta", ProviderId::OpenAi),
            ModelDescriptor::new("block-model", "Block", ProviderId::Anthropic),
            ModelDescriptor::new("plain-model", "Plain", ProviderId::Cerebras)
                .without_tools()
                .with_system_role(Role::User),
            ModelDescriptor::new("offline-model", "Offline", ProviderId::Qwen),
        ])
    }

    fn delta_orchestrator(client: &MockDeltaClient, limits: Limits) -> Orchestrator {
        let handle = ProviderHandle::Delta(Arc::new(client.clone()));
        let providers = ProviderTable::new()
            .with(ProviderId::OpenAi, handle.clone())
            .with(ProviderId::Cerebras, handle);
        Orchestrator::new(models(), providers, registry(), limits)
    }

    fn block_orchestrator(client: &MockBlockClient) -> Orchestrator {
        let providers = ProviderTable::new().with(
            ProviderId::Anthropic,
            ProviderHandle::Block(Arc::new(client.clone())),
        );
        Orchestrator::new(models(), providers, registry(), Limits::default())
    }

    fn request(model: &str, text: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![Message::user().with_text(text)],
            model_name: model.to_string(),
        }
    }

    async fn collect(orchestrator: &Orchestrator, request: ChatRequest) -> Vec<ChatEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        let relay = Relay::new(tx);
        orchestrator.reply(request, &relay).await;
        drop(relay);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn text_of(message: &Message) -> String {
        message.content.to_plain_text()
    }

    #[tokio::test]
    async fn test_plain_reply_relays_content() {
        let client = MockDeltaClient::new(vec![vec![
            ChatCompletionChunk::content("Hello"),
            ChatCompletionChunk::content(" there"),
            ChatCompletionChunk::finish("stop"),
        ]]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("delta-model", "hi")).await;
        assert_eq!(
            events,
            vec![ChatEvent::content("Hello"), ChatEvent::content(" there")]
        );

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let first = &requests[0];
        assert_eq!(first.model, "delta-model");
        assert!(first.stream);
        assert_eq!(first.messages[0].role, Role::System);
        assert!(text_of(&first.messages[0]).contains("Mermaid"));
        assert_eq!(text_of(&first.messages[1]), "hi");
        assert_eq!(first.tools.len(), 5);
    }

    #[tokio::test]
    async fn test_unknown_model_rejected_before_any_call() {
        let client = MockDeltaClient::new(Vec::<MockScript<ChatCompletionChunk>>::new());
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("gpt-17", "hi")).await;
        assert_eq!(events, vec![ChatEvent::error("Unknown model: gpt-17")]);
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let client = MockDeltaClient::new(Vec::<MockScript<ChatCompletionChunk>>::new());
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("offline-model", "hi")).await;
        assert_eq!(events, vec![ChatEvent::error("Provider qwen is not configured")]);
    }

    #[tokio::test]
    async fn test_structured_call_is_summarized() {
        let client = MockDeltaClient::new(vec![
            vec![
                ChatCompletionChunk::content("Let me look."),
                ChatCompletionChunk::tool_call(0, Some("lookup"), Some("{\"query\":")),
                ChatCompletionChunk::content("suppressed"),
                ChatCompletionChunk::tool_call(0, None, Some("\"rust\"}")),
                ChatCompletionChunk::finish("tool_calls"),
                ChatCompletionChunk::finish("tool_calls"),
            ],
            vec![
                ChatCompletionChunk::content("Rust is"),
                ChatCompletionChunk::content(" a language."),
            ],
        ]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("delta-model", "what is rust")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::content("Let me look."),
                ChatEvent::tool_call("lookup"),
                ChatEvent::content("\n\n"),
                ChatEvent::content("Rust is"),
                ChatEvent::content(" a language."),
            ]
        );

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        let second = &requests[1];
        assert!(second.tools.is_empty());
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[0].role, Role::System);
        assert!(text_of(&second.messages[0]).contains("raw output of a tool"));
        assert_eq!(second.messages[1].role, Role::User);
        assert_eq!(text_of(&second.messages[1]), "echo {\"query\":\"rust\"}");
    }

    #[tokio::test]
    async fn test_block_passthrough_tool_skips_second_stream() {
        let client = MockBlockClient::new(vec![vec![
            BlockEvent::text_start(0),
            BlockEvent::text(0, "Drawing it."),
            BlockEvent::tool_use_start(1, "draw"),
            BlockEvent::input_json(1, "{\"chart\":"),
            BlockEvent::input_json(1, "\"pie\"}"),
            BlockEvent::stop_reason("tool_use"),
        ]]);
        let orchestrator = block_orchestrator(&client);

        let events = collect(&orchestrator, request("block-model", "chart it")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::content("Drawing it."),
                ChatEvent::tool_call("draw"),
                ChatEvent::content("\n\n```mermaid\npie\n```"),
            ]
        );

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let names: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert!(!names.contains(&"delta_only"));
        assert!(names.contains(&"draw"));
    }

    #[tokio::test]
    async fn test_failed_tool_is_shown_without_second_stream() {
        let client = MockDeltaClient::new(vec![vec![
            ChatCompletionChunk::tool_call(0, Some("broken"), Some("{\"q\":\"x\"}")),
            ChatCompletionChunk::finish("tool_calls"),
        ]]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("delta-model", "go")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::tool_call("broken"),
                ChatEvent::content("Error executing broken: upstream returned 502"),
            ]
        );
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_structured_tool() {
        let client = MockDeltaClient::new(vec![vec![
            ChatCompletionChunk::tool_call(0, Some("teleport"), Some("{\"to\":\"mars\"}")),
            ChatCompletionChunk::finish("tool_calls"),
        ]]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("delta-model", "go")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::tool_call("teleport"),
                ChatEvent::content("Error: Tool \"teleport\" not found"),
            ]
        );
    }

    #[tokio::test]
    async fn test_truncated_arguments() {
        let client = MockDeltaClient::new(vec![vec![
            ChatCompletionChunk::tool_call(0, Some("lookup"), Some("{\"query\": \"ru")),
            ChatCompletionChunk::finish("tool_calls"),
        ]]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("delta-model", "go")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::tool_call("lookup"),
                ChatEvent::content("Error executing lookup: invalid tool arguments"),
            ]
        );
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_inline_marker_from_model_without_tools() {
        let client = MockDeltaClient::new(vec![
            vec![
                ChatCompletionChunk::content("Working it out. <to"),
                ChatCompletionChunk::content("ol>calculator</tool>"),
                ChatCompletionChunk::content("2+2"),
            ],
            vec![ChatCompletionChunk::content("2 + 2 is 4.")],
        ]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("plain-model", "what's 2+2")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::content("Working it out. "),
                ChatEvent::content("\n\n"),
                ChatEvent::content("2 + 2 is 4."),
            ]
        );

        let requests = client.requests();
        let first = &requests[0];
        assert!(first.tools.is_empty());
        assert_eq!(first.messages[0].role, Role::User);
        assert!(text_of(&first.messages[0]).contains("<tool>TOOL_NAME</tool>PARAMETERS"));
        assert!(text_of(&first.messages[0]).contains("- calculator:"));
        assert_eq!(text_of(&requests[1].messages[1]), "4");
    }

    #[tokio::test]
    async fn test_held_back_text_is_flushed() {
        let client = MockDeltaClient::new(vec![vec![
            ChatCompletionChunk::content("Use a <to"),
            ChatCompletionChunk::content("oltip"),
            ChatCompletionChunk::content(" or <too"),
        ]]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("plain-model", "hi")).await;
        let text: String = events
            .iter()
            .map(|event| match event {
                ChatEvent::Content { content } => content.as_str(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(text, "Use a <tooltip or <too");
    }

    #[tokio::test]
    async fn test_provider_error_mid_stream() {
        let client = MockDeltaClient::new(vec![MockScript::new(vec![
            ChatCompletionChunk::content("partial"),
        ])
        .then_fail("overloaded")]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let events = collect(&orchestrator, request("delta-model", "hi")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::content("partial"),
                ChatEvent::error("Provider reported an error: overloaded"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stalled_provider_times_out() {
        let client = MockDeltaClient::new(vec![MockScript::new(vec![
            ChatCompletionChunk::content("thinking"),
        ])
        .then_stall()]);
        let limits = Limits {
            idle_timeout: Duration::from_millis(50),
            ..Limits::default()
        };
        let orchestrator = delta_orchestrator(&client, limits);

        let events = collect(&orchestrator, request("delta-model", "hi")).await;
        assert_eq!(
            events,
            vec![
                ChatEvent::content("thinking"),
                ChatEvent::error("Provider stream stalled for 50ms"),
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnect_aborts_turn() {
        let client = MockDeltaClient::new(vec![
            vec![
                ChatCompletionChunk::tool_call(0, Some("lookup"), Some("{\"query\":\"rust\"}")),
                ChatCompletionChunk::finish("tool_calls"),
            ],
            vec![ChatCompletionChunk::content("never sent")],
        ]);
        let orchestrator = delta_orchestrator(&client, Limits::default());

        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let result = orchestrator
            .run(request("delta-model", "hi"), &Relay::new(tx))
            .await;
        assert!(matches!(result, Err(ChatError::ClientDisconnected)));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_during_tool_skips_second_stream() {
        let client = MockDeltaClient::new(vec![
            vec![
                ChatCompletionChunk::tool_call(0, Some("slow_lookup"), Some("{\"query\":\"rust\"}")),
                ChatCompletionChunk::finish("tool_calls"),
            ],
            vec![ChatCompletionChunk::content("never requested")],
        ]);
        let slow: Arc<dyn ToolHandler> = Arc::new(
            StubTool::echo("slow_lookup", "query").with_delay(Duration::from_millis(100)),
        );
        let providers = ProviderTable::new().with(
            ProviderId::OpenAi,
            ProviderHandle::Delta(Arc::new(client.clone())),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            models(),
            providers,
            Arc::new(ToolRegistry::new(vec![slow]).unwrap()),
            Limits::default(),
        ));

        let (tx, mut rx) = mpsc::channel(8);
        let turn = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move {
                orchestrator
                    .run(request("delta-model", "hi"), &Relay::new(tx))
                    .await
            }
        });

        assert_eq!(rx.recv().await, Some(ChatEvent::tool_call("slow_lookup")));
        drop(rx);

        let result = turn.await.unwrap();
        assert!(matches!(result, Err(ChatError::ClientDisconnected)));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_part_list_rejected() {
        let client = MockDeltaClient::new(Vec::<MockScript<ChatCompletionChunk>>::new());
        let orchestrator = delta_orchestrator(&client, Limits::default());
        let request = ChatRequest {
            messages: vec![Message::new(
                Role::User,
                crate::models::message::MessageContent::Parts(Vec::new()),
            )],
            model_name: "delta-model".into(),
        };

        let events = collect(&orchestrator, request).await;
        assert!(matches!(&events[..], [ChatEvent::Error { content }] if content.starts_with("Invalid request")));
        assert!(client.requests().is_empty());
    }
}
