//! The orchestration engine: a bounded, tool-calling turn loop.
//!
//! One run drives `AwaitingModel → DispatchingTools → AwaitingModel …` until
//! the model answers without tool calls (`Done`) or the turn budget runs out
//! after a dispatch round (`Truncated`). Within a run exactly one model call
//! or one tool dispatch is in flight at a time; tool calls returned together
//! are executed in order, one after another.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use turnpike_config::EngineLimits;
use turnpike_core::agent::{Agent, AgentHandle};
use turnpike_core::context::AgentContext;
use turnpike_core::error::{Error, ProviderError, Result, ValidationError};
use turnpike_core::event::{DomainEvent, EventBus};
use turnpike_core::message::{ChatMessage, Role, ToolCallRequest};
use turnpike_core::provider::{ChunkReceiver, ProviderRequest, ToolDefinition, Usage};
use turnpike_core::response::{AgentResponse, RunOutcome};
use turnpike_core::tool::{ToolRegistry, ToolResult};
use turnpike_providers::ProviderRouter;

use crate::stream_event::AgentStreamEvent;
use crate::wire::{ChatRequest, ChatResponse};

/// Capacity of the event channel handed to streaming consumers.
const STREAM_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    AwaitingModel,
    DispatchingTools,
    Done,
    Truncated,
}

/// Drives runs against a fixed router, tool registry and limits.
///
/// Cheap to clone; every clone shares the same router, registry and bus.
#[derive(Clone)]
pub struct Engine {
    router: Arc<ProviderRouter>,
    tools: Arc<ToolRegistry>,
    limits: EngineLimits,
    event_bus: Arc<EventBus>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Run to completion (or truncation).
    ///
    /// `ctx.history` is replaced with the agent's instructions followed by
    /// `messages`, then grows as the run proceeds. A provider failure ends
    /// the run with an error; tool failures become error-flagged results the
    /// model sees on its next turn.
    pub async fn run(
        &self,
        agent: &Agent,
        messages: Vec<ChatMessage>,
        ctx: &mut AgentContext,
        max_turns: u32,
    ) -> Result<AgentResponse> {
        let max_turns = self.check_request(&messages, max_turns)?;
        let run_id = Uuid::new_v4().to_string();
        let tool_defs = self.tools.definitions_for(agent);
        ctx.history = seed_history(agent, messages);

        self.announce(&run_id, agent, max_turns);

        let mut turn = 0u32;
        let mut provider_calls = 0u32;
        let mut state = RunState::AwaitingModel;

        let outcome = loop {
            state = match state {
                RunState::AwaitingModel => {
                    debug!(run_id = %run_id, turn, "Awaiting model");
                    provider_calls += 1;
                    let message = self
                        .call_model(&run_id, agent, &ctx.history, &tool_defs)
                        .await?;
                    let next = if message.has_tool_calls() {
                        RunState::DispatchingTools
                    } else {
                        RunState::Done
                    };
                    ctx.history.push(message);
                    next
                }
                RunState::DispatchingTools => {
                    let calls = pending_calls(&ctx.history);
                    debug!(run_id = %run_id, turn, count = calls.len(), "Dispatching tool calls");
                    for call in &calls {
                        let result = self.dispatch(&run_id, agent, call, ctx).await;
                        ctx.history
                            .push(ChatMessage::tool_result(&call.id, result.text, result.is_error));
                    }
                    turn += 1;
                    self.after_dispatch(&run_id, turn, max_turns)
                }
                RunState::Done => break RunOutcome::Completed,
                RunState::Truncated => break RunOutcome::Truncated,
            };
        };

        self.finish(&run_id, outcome, turn, provider_calls);

        Ok(AgentResponse {
            messages: ctx.history.clone(),
            agent: agent.clone(),
            final_variables: ctx.variables.clone(),
            outcome,
            turns: turn,
            provider_calls,
        })
    }

    /// Snapshot the live agent, then run with that snapshot.
    ///
    /// Agents published while the run is in progress do not affect it.
    pub async fn run_with(
        &self,
        handle: &AgentHandle,
        messages: Vec<ChatMessage>,
        ctx: &mut AgentContext,
        max_turns: u32,
    ) -> Result<AgentResponse> {
        let agent = handle.snapshot();
        self.run(&agent, messages, ctx, max_turns).await
    }

    /// Serve one transport request end to end.
    pub async fn chat(&self, handle: &AgentHandle, request: ChatRequest) -> Result<ChatResponse> {
        let request = request.validate(&self.limits)?;
        let mut ctx = request.context;
        let response = self
            .run_with(handle, request.messages, &mut ctx, request.max_turns)
            .await?;
        Ok(ChatResponse::from(&response))
    }

    /// Run in the background, forwarding model text as it arrives.
    ///
    /// Validation happens before anything is spawned, so a bad request is an
    /// `Err` here rather than an event. If the receiver is dropped, the run
    /// stops before its next model call and releases the provider stream.
    pub async fn run_streaming(
        &self,
        agent: &Agent,
        messages: Vec<ChatMessage>,
        ctx: AgentContext,
        max_turns: u32,
    ) -> Result<mpsc::Receiver<AgentStreamEvent>> {
        let max_turns = self.check_request(&messages, max_turns)?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let engine = self.clone();
        let agent = agent.clone();
        tokio::spawn(async move {
            engine
                .drive_stream(agent, messages, ctx, max_turns, tx)
                .await;
        });

        Ok(rx)
    }

    async fn drive_stream(
        self,
        agent: Agent,
        messages: Vec<ChatMessage>,
        mut ctx: AgentContext,
        max_turns: u32,
        tx: mpsc::Sender<AgentStreamEvent>,
    ) {
        let run_id = Uuid::new_v4().to_string();
        let tool_defs = self.tools.definitions_for(&agent);
        ctx.history = seed_history(&agent, messages);

        self.announce(&run_id, &agent, max_turns);

        let mut turn = 0u32;
        let mut provider_calls = 0u32;
        let mut state = RunState::AwaitingModel;

        let outcome = loop {
            state = match state {
                RunState::AwaitingModel => {
                    if tx.is_closed() {
                        debug!(run_id = %run_id, "Stream consumer gone, stopping run");
                        return;
                    }
                    provider_calls += 1;
                    match self
                        .stream_model(&run_id, &agent, &ctx.history, &tool_defs, &tx)
                        .await
                    {
                        Ok(Some(message)) => {
                            let next = if message.has_tool_calls() {
                                RunState::DispatchingTools
                            } else {
                                RunState::Done
                            };
                            ctx.history.push(message);
                            next
                        }
                        Ok(None) => {
                            debug!(run_id = %run_id, "Stream consumer gone mid-response");
                            return;
                        }
                        Err(e) => {
                            warn!(run_id = %run_id, error = %e, "Streaming run failed");
                            let _ = tx
                                .send(AgentStreamEvent::Error {
                                    message: e.to_string(),
                                })
                                .await;
                            return;
                        }
                    }
                }
                RunState::DispatchingTools => {
                    for call in pending_calls(&ctx.history) {
                        let announced = tx
                            .send(AgentStreamEvent::ToolCall {
                                id: call.id.clone(),
                                name: call.name.clone(),
                                input: serde_json::from_str(&call.arguments)
                                    .unwrap_or_else(|_| serde_json::Value::String(call.arguments.clone())),
                            })
                            .await;
                        if announced.is_err() {
                            return;
                        }

                        let result = self.dispatch(&run_id, &agent, &call, &mut ctx).await;
                        ctx.history.push(ChatMessage::tool_result(
                            &call.id,
                            result.text.clone(),
                            result.is_error,
                        ));

                        let reported = tx
                            .send(AgentStreamEvent::ToolResult {
                                id: call.id,
                                name: call.name,
                                output: result.text,
                                success: !result.is_error,
                            })
                            .await;
                        if reported.is_err() {
                            return;
                        }
                    }
                    turn += 1;
                    self.after_dispatch(&run_id, turn, max_turns)
                }
                RunState::Done => break RunOutcome::Completed,
                RunState::Truncated => break RunOutcome::Truncated,
            };
        };

        self.finish(&run_id, outcome, turn, provider_calls);

        let _ = tx
            .send(AgentStreamEvent::Done {
                outcome,
                turns: turn,
                provider_calls,
                variables: ctx.variables,
            })
            .await;
    }

    /// Validate a request and return the effective turn budget.
    fn check_request(
        &self,
        messages: &[ChatMessage],
        max_turns: u32,
    ) -> std::result::Result<u32, ValidationError> {
        if messages.is_empty() {
            return Err(ValidationError::EmptyMessages);
        }
        if messages.len() > self.limits.max_messages {
            return Err(ValidationError::TooManyMessages {
                count: messages.len(),
                max: self.limits.max_messages,
            });
        }
        if let Some(m) = messages.iter().find(|m| m.role == Role::System) {
            return Err(ValidationError::UnsupportedRole(m.role.to_string()));
        }
        if max_turns == 0 {
            return Err(ValidationError::InvalidMaxTurns(0));
        }
        Ok(max_turns.min(self.limits.max_turns_ceiling))
    }

    fn announce(&self, run_id: &str, agent: &Agent, max_turns: u32) {
        info!(
            run_id = %run_id,
            agent = %agent.name(),
            model = %agent.model(),
            max_turns,
            "Run started"
        );
        self.event_bus.publish(DomainEvent::RunStarted {
            run_id: run_id.to_string(),
            agent: agent.name().to_string(),
            max_turns,
            timestamp: Utc::now(),
        });
    }

    fn after_dispatch(&self, run_id: &str, turn: u32, max_turns: u32) -> RunState {
        if turn >= max_turns {
            warn!(run_id = %run_id, turns = turn, "Turn budget exhausted, truncating run");
            RunState::Truncated
        } else {
            RunState::AwaitingModel
        }
    }

    fn finish(&self, run_id: &str, outcome: RunOutcome, turns: u32, provider_calls: u32) {
        info!(run_id = %run_id, ?outcome, turns, provider_calls, "Run finished");
        self.event_bus.publish(DomainEvent::RunFinished {
            run_id: run_id.to_string(),
            outcome,
            turns,
            provider_calls,
            timestamp: Utc::now(),
        });
    }

    fn provider_called(&self, run_id: &str, provider_id: &str, model: &str, usage: Option<Usage>) {
        self.event_bus.publish(DomainEvent::ProviderCalled {
            run_id: run_id.to_string(),
            provider_id: provider_id.to_string(),
            model: model.to_string(),
            tokens_used: usage.map(|u| u.total_tokens),
            timestamp: Utc::now(),
        });
    }

    /// One blocking model call. The model is resolved on every call.
    async fn call_model(
        &self,
        run_id: &str,
        agent: &Agent,
        history: &[ChatMessage],
        tool_defs: &[ToolDefinition],
    ) -> Result<ChatMessage> {
        let resolved = self.router.resolve(agent.model())?;
        let request = ProviderRequest {
            model: resolved.model.clone(),
            messages: history.to_vec(),
            tools: tool_defs.to_vec(),
            stream: false,
        };

        let response = resolved.provider.generate(request).await.map_err(|e| {
            warn!(run_id = %run_id, provider = %resolved.provider_id, error = %e, "Provider call failed");
            Error::Provider(e)
        })?;

        self.provider_called(run_id, &resolved.provider_id, &response.model, response.usage);
        Ok(with_call_ids(response.message))
    }

    /// One streamed model call. `Ok(None)` means the consumer hung up.
    async fn stream_model(
        &self,
        run_id: &str,
        agent: &Agent,
        history: &[ChatMessage],
        tool_defs: &[ToolDefinition],
        tx: &mpsc::Sender<AgentStreamEvent>,
    ) -> Result<Option<ChatMessage>> {
        let resolved = self.router.resolve(agent.model())?;
        let request = ProviderRequest {
            model: resolved.model.clone(),
            messages: history.to_vec(),
            tools: tool_defs.to_vec(),
            stream: true,
        };

        if resolved.provider.supports_streaming() {
            match resolved.provider.stream_generate(request.clone()).await {
                Ok(chunks) => {
                    let Some((message, usage)) = forward_chunks(chunks, tx).await? else {
                        return Ok(None);
                    };
                    self.provider_called(run_id, &resolved.provider_id, &resolved.model, usage);
                    return Ok(Some(with_call_ids(message)));
                }
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        provider = %resolved.provider_id,
                        error = %e,
                        "Streaming unavailable, falling back to a blocking call"
                    );
                }
            }
        }

        let response = resolved
            .provider
            .generate(ProviderRequest {
                stream: false,
                ..request
            })
            .await?;
        self.provider_called(run_id, &resolved.provider_id, &response.model, response.usage);

        let message = with_call_ids(response.message);
        if !message.content.is_empty()
            && tx
                .send(AgentStreamEvent::Chunk {
                    content: message.content.clone(),
                })
                .await
                .is_err()
        {
            return Ok(None);
        }
        Ok(Some(message))
    }

    /// Run one tool call, refusing tools outside the agent's allowed set.
    async fn dispatch(
        &self,
        run_id: &str,
        agent: &Agent,
        call: &ToolCallRequest,
        ctx: &mut AgentContext,
    ) -> ToolResult {
        if !agent.allows(&call.name) {
            warn!(run_id = %run_id, tool = %call.name, agent = %agent.name(), "Tool not allowed for agent");
            return ToolResult::error(format!(
                "Tool '{}' is not available to agent '{}'",
                call.name,
                agent.name()
            ));
        }

        let start = Instant::now();
        let result = self.tools.execute(&call.name, &call.arguments, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(run_id = %run_id, tool = %call.name, is_error = result.is_error, duration_ms, "Tool finished");
        self.event_bus.publish(DomainEvent::ToolExecuted {
            run_id: run_id.to_string(),
            tool_name: call.name.clone(),
            success: !result.is_error,
            duration_ms,
            timestamp: Utc::now(),
        });

        result
    }
}

/// System instructions (if any) followed by the caller's messages.
fn seed_history(agent: &Agent, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut history = Vec::with_capacity(messages.len() + 1);
    if !agent.instructions().trim().is_empty() {
        history.push(ChatMessage::system(agent.instructions()));
    }
    history.extend(messages);
    history
}

/// Tool calls carried by the most recent assistant message.
fn pending_calls(history: &[ChatMessage]) -> Vec<ToolCallRequest> {
    history
        .last()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.tool_calls.clone())
        .unwrap_or_default()
}

/// Give every tool call an id so each result can reference its request.
fn with_call_ids(mut message: ChatMessage) -> ChatMessage {
    for call in message.tool_calls.iter_mut() {
        if call.id.trim().is_empty() {
            call.id = format!("call_{}", Uuid::new_v4().simple());
        }
    }
    message
}

/// Fold streamed tool-call deltas into complete calls.
///
/// A delta with a known id extends that call; an empty id extends the most
/// recent one; anything else starts a new call.
fn merge_tool_deltas(calls: &mut Vec<ToolCallRequest>, deltas: Vec<ToolCallRequest>) {
    for delta in deltas {
        let target = if delta.id.is_empty() {
            calls.last_mut()
        } else {
            calls.iter_mut().find(|c| c.id == delta.id)
        };
        match target {
            Some(call) => {
                if call.name.is_empty() {
                    call.name = delta.name;
                }
                call.arguments.push_str(&delta.arguments);
            }
            None => calls.push(delta),
        }
    }
}

/// Forward text chunks to the consumer while assembling the full message.
///
/// Returns `Ok(None)` when the consumer is gone; `chunks` is dropped on every
/// return path, which releases the provider stream. A stream that closes
/// before its `done` chunk is interrupted, and its partial message is
/// discarded.
async fn forward_chunks(
    mut chunks: ChunkReceiver,
    tx: &mpsc::Sender<AgentStreamEvent>,
) -> std::result::Result<Option<(ChatMessage, Option<Usage>)>, ProviderError> {
    let mut content = String::new();
    let mut calls = Vec::new();
    let mut usage = None;
    let mut finished = false;

    while let Some(item) = chunks.recv().await {
        let chunk = item?;

        if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
            content.push_str(&text);
            if tx.send(AgentStreamEvent::Chunk { content: text }).await.is_err() {
                return Ok(None);
            }
        }

        merge_tool_deltas(&mut calls, chunk.tool_calls);

        if chunk.usage.is_some() {
            usage = chunk.usage;
        }
        if chunk.done {
            finished = true;
            break;
        }
    }

    if !finished {
        return Err(ProviderError::StreamInterrupted(
            "stream closed before completion".into(),
        ));
    }

    let message = if calls.is_empty() {
        ChatMessage::assistant(content)
    } else {
        ChatMessage::assistant_with_tools(content, calls)
    };
    Ok(Some((message, usage)))
}

/// Builder producing a fully initialized [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    router: Option<Arc<ProviderRouter>>,
    tools: Option<Arc<ToolRegistry>>,
    limits: Option<EngineLimits>,
    event_bus: Option<Arc<EventBus>>,
}

impl EngineBuilder {
    pub fn router(mut self, router: Arc<ProviderRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Freeze the registry; no tools can be added after this.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(Arc::new(tools));
        self
    }

    pub fn limits(mut self, limits: EngineLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let router = self
            .router
            .ok_or_else(|| Error::config("Engine requires a provider router"))?;
        Ok(Engine {
            router,
            tools: self.tools.unwrap_or_else(|| Arc::new(ToolRegistry::new())),
            limits: self.limits.unwrap_or_default(),
            event_bus: self.event_bus.unwrap_or_default(),
        })
    }
}
