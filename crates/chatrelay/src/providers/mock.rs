use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::anthropic::BlockEvent;
use super::base::{BlockClient, BlockStream, ChunkStream, CompletionRequest, DeltaClient};
use super::openai::ChatCompletionChunk;
use crate::errors::ProviderError;

/// Canned output for one provider call.
#[derive(Debug, Clone)]
pub struct MockScript<T> {
    items: Vec<Result<T, String>>,
    stall: bool,
}

impl<T> MockScript<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter().map(Ok).collect(),
            stall: false,
        }
    }

    /// End the script with a mid-stream provider error
    pub fn then_fail<S: Into<String>>(mut self, message: S) -> Self {
        self.items.push(Err(message.into()));
        self
    }

    /// Keep the stream open forever after the last item
    pub fn then_stall(mut self) -> Self {
        self.stall = true;
        self
    }
}

impl<T> From<Vec<T>> for MockScript<T> {
    fn from(items: Vec<T>) -> Self {
        MockScript::new(items)
    }
}

impl<T: Send + 'static> MockScript<T> {
    fn into_stream(self) -> stream::BoxStream<'static, Result<T, ProviderError>> {
        let items = stream::iter(
            self.items
                .into_iter()
                .map(|item| item.map_err(ProviderError::Protocol)),
        );
        if self.stall {
            items.chain(stream::pending()).boxed()
        } else {
            items.boxed()
        }
    }
}

/// Shared state behind both mock clients.
struct Recorder<T> {
    scripts: Mutex<Vec<MockScript<T>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl<T: Send + 'static> Recorder<T> {
    fn new(scripts: Vec<MockScript<T>>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn next(&self, request: CompletionRequest) -> stream::BoxStream<'static, Result<T, ProviderError>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        if scripts.is_empty() {
            // Return empty stream if no more pre-configured responses
            stream::empty().boxed()
        } else {
            scripts.remove(0).into_stream()
        }
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// A delta-family client that replays pre-configured chunk sequences
#[derive(Clone)]
pub struct MockDeltaClient {
    inner: Arc<Recorder<ChatCompletionChunk>>,
}

impl MockDeltaClient {
    /// Each script answers one call, in order
    pub fn new<S: Into<MockScript<ChatCompletionChunk>>>(scripts: Vec<S>) -> Self {
        Self {
            inner: Arc::new(Recorder::new(scripts.into_iter().map(Into::into).collect())),
        }
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.inner.requests()
    }
}

#[async_trait]
impl DeltaClient for MockDeltaClient {
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ProviderError> {
        Ok(self.inner.next(request))
    }
}

/// A block-family client that replays pre-configured event sequences
#[derive(Clone)]
pub struct MockBlockClient {
    inner: Arc<Recorder<BlockEvent>>,
}

impl MockBlockClient {
    pub fn new<S: Into<MockScript<BlockEvent>>>(scripts: Vec<S>) -> Self {
        Self {
            inner: Arc::new(Recorder::new(scripts.into_iter().map(Into::into).collect())),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.inner.requests()
    }
}

#[async_trait]
impl BlockClient for MockBlockClient {
    async fn stream(&self, request: CompletionRequest) -> Result<BlockStream, ProviderError> {
        Ok(self.inner.next(request))
    }
}

pub fn chunk_stream(chunks: Vec<ChatCompletionChunk>) -> ChunkStream {
    MockScript::new(chunks).into_stream()
}

pub fn block_stream(events: Vec<BlockEvent>) -> BlockStream {
    MockScript::new(events).into_stream()
}
