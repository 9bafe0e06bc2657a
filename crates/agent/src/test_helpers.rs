//! Scripted providers shared by the engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use turnpike_core::error::ProviderError;
use turnpike_core::message::{ChatMessage, ToolCallRequest};
use turnpike_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage,
};

/// Returns queued responses in order and records every request.
///
/// With `repeat_last`, the final response is served forever; otherwise an
/// exhausted script is a test bug and panics.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    repeat_last: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat_last: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(responses: Vec<ProviderResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    /// Serve `response` on every call.
    pub fn always(response: ProviderResponse) -> Self {
        Self {
            repeat_last: true,
            ..Self::replies(vec![response])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let mut script = self.script.lock().unwrap();
        if self.repeat_last && script.len() == 1 {
            return script[0].clone();
        }
        script
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: script exhausted after {} calls", self.calls()))
    }
}

/// Streams one queued chunk script per call.
///
/// `released` flips once the consumer side of a stream has gone away and the
/// producer task noticed.
pub struct StreamingProvider {
    streams: Mutex<VecDeque<Vec<Result<StreamChunk, ProviderError>>>>,
    refuse_streams: bool,
    fallback: Option<ProviderResponse>,
    calls: AtomicUsize,
    released: Arc<AtomicBool>,
}

impl StreamingProvider {
    pub fn new(streams: Vec<Vec<Result<StreamChunk, ProviderError>>>) -> Self {
        Self {
            streams: Mutex::new(streams.into()),
            refuse_streams: false,
            fallback: None,
            calls: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Advertises streaming but fails every `stream_generate` up front;
    /// `generate` answers with `fallback`.
    pub fn refusing(fallback: ProviderResponse) -> Self {
        Self {
            refuse_streams: true,
            fallback: Some(fallback),
            ..Self::new(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for StreamingProvider {
    fn name(&self) -> &str {
        "streaming"
    }

    async fn generate(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fallback
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("no blocking script".into()))
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn stream_generate(&self, _request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        if self.refuse_streams {
            return Err(ProviderError::Network("connection refused".into()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        let chunks = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .expect("StreamingProvider: stream script exhausted");

        let (tx, rx) = mpsc::channel(1);
        let released = self.released.clone();
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(chunk).await.is_err() {
                    released.store(true, Ordering::SeqCst);
                    return;
                }
            }
        });
        Ok(rx)
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A final answer with no tool calls.
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: ChatMessage::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// An assistant turn that requests the given tools.
pub fn tool_response(calls: Vec<ToolCallRequest>) -> ProviderResponse {
    ProviderResponse {
        message: ChatMessage::assistant_with_tools("", calls),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(id, name, args.to_string())
}

/// A streamed tool-call delta.
/// The closing chunk every complete stream ends with.
pub fn end_of_stream() -> StreamChunk {
    StreamChunk {
        done: true,
        ..StreamChunk::default()
    }
}

pub fn tool_delta(id: &str, name: &str, arguments: &str) -> StreamChunk {
    StreamChunk {
        tool_calls: vec![ToolCallRequest::new(id, name, arguments)],
        ..StreamChunk::default()
    }
}
