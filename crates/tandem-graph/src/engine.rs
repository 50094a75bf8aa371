//! The engine loop: reason, act, merge, checkpoint, repeat.

use crate::convert::{build_request, tool_response};
use crate::definition::{GraphDefinition, Next, NodeKind, START};
use crate::dispatch::execute_tools_parallel;
use crate::error::EngineError;
use crate::llm::LlmExecutor;
use crate::stream::{StreamCollector, StreamOutput};
use async_stream::stream;
use futures::{Stream, StreamExt};
use genai::chat::ChatOptions;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use tandem_contract::{
    now_ms, AgentEvent, Message, MessageMetadata, Thread, ThreadDelta, ThreadStore, Tool,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Configuration for the engine loop.
#[derive(Clone)]
pub struct EngineConfig {
    /// Model identifier (e.g., "gpt-4o", "deepseek-chat").
    pub model: String,
    /// System prompt prepended to every reasoning call.
    pub system_prompt: String,
    /// Maximum number of reasoning invocations per run. The counter is
    /// incremented before each invocation and the run aborts with
    /// `CycleExceeded` when it reaches this bound.
    pub max_steps: usize,
    /// Chat options for the LLM.
    pub chat_options: Option<ChatOptions>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            system_prompt: String::new(),
            max_steps: 10,
            chat_options: None,
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("model", &self.model)
            .field(
                "system_prompt",
                &format!("[{} chars]", self.system_prompt.len()),
            )
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl EngineConfig {
    /// Create a new config with the specified model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set max reasoning steps.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set chat options.
    #[must_use]
    pub fn with_chat_options(mut self, options: ChatOptions) -> Self {
        self.chat_options = Some(options);
        self
    }
}

/// Final state of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The thread after the run's checkpoints.
    pub thread: Thread,
    /// The final assistant response text.
    pub response: String,
}

/// The execution-graph engine.
///
/// Owns the node/edge loop, the step bound, per-thread run serialization,
/// and failure semantics. Storage, tools, and the model are injected.
pub struct GraphEngine {
    definition: GraphDefinition,
    llm: Arc<dyn LlmExecutor>,
    tools: HashMap<String, Arc<dyn Tool>>,
    store: Arc<dyn ThreadStore>,
    config: EngineConfig,
    /// One mutex per thread id: at most one active run per thread.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GraphEngine {
    pub fn new(
        definition: GraphDefinition,
        llm: Arc<dyn LlmExecutor>,
        tools: HashMap<String, Arc<dyn Tool>>,
        store: Arc<dyn ThreadStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            definition,
            llm,
            tools,
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The injected store, for read-side consumers.
    pub fn store(&self) -> Arc<dyn ThreadStore> {
        self.store.clone()
    }

    async fn lock_for(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run to completion without observing intermediate events.
    pub async fn run(
        &self,
        thread_id: &str,
        user_text: &str,
    ) -> Result<RunOutcome, EngineError> {
        self.run_inner(thread_id, user_text, None).await
    }

    /// Run and observe the step sequence as a lazy event stream.
    ///
    /// The run executes on its own task: dropping the stream stops event
    /// emission and ends the run before its next step, while a tool batch
    /// already dispatched runs to completion.
    pub fn run_stream(
        self: Arc<Self>,
        thread_id: String,
        user_text: String,
    ) -> Pin<Box<dyn Stream<Item = AgentEvent> + Send>> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(err) = engine.run_inner(&thread_id, &user_text, Some(&tx)).await {
                warn!(thread_id = %thread_id, error = %err, "run aborted");
                let _ = tx.send(AgentEvent::Error {
                    code: err.code(),
                    message: err.to_string(),
                });
            }
        });
        Box::pin(stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        })
    }

    /// Load the thread for `thread_id`, creating it empty on first reference.
    async fn load_or_create(&self, thread_id: &str) -> Result<Thread, EngineError> {
        if let Some(head) = self.store.load(thread_id).await? {
            return Ok(head.thread);
        }
        let thread = Thread::new(thread_id);
        self.store.create(&thread).await?;
        Ok(thread)
    }

    /// Merge a step's messages into the thread and checkpoint the delta.
    ///
    /// The in-memory merge and the durable append use the same delta, so a
    /// reader of the store never sees anything the engine has not committed.
    async fn commit(
        &self,
        thread: &mut Thread,
        node: &str,
        messages: Vec<Message>,
        run_id: &str,
    ) -> Result<ThreadDelta, EngineError> {
        let delta = ThreadDelta {
            run_id: run_id.to_string(),
            node: node.to_string(),
            messages,
            at_ms: now_ms(),
        };
        delta.apply_to(thread);
        self.store.append(&thread.id, &delta).await?;
        debug!(thread_id = %thread.id, node, messages = delta.messages.len(), "step committed");
        Ok(delta)
    }

    /// The node/edge loop shared by `run` and `run_stream`.
    ///
    /// Events are emitted through `events` when present; a closed receiver
    /// means the consumer disconnected and the run stops before its next
    /// step (no further events, no further model calls).
    async fn run_inner(
        &self,
        thread_id: &str,
        user_text: &str,
        events: Option<&mpsc::UnboundedSender<AgentEvent>>,
    ) -> Result<RunOutcome, EngineError> {
        let emit = |event: AgentEvent| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };
        let consumer_gone = || events.is_some_and(|tx| tx.is_closed());

        let run_id = uuid::Uuid::now_v7().to_string();
        let lock = self.lock_for(thread_id).await;
        let _guard = lock.lock().await;

        info!(thread_id, run_id = %run_id, model = %self.config.model, "run started");

        let mut thread = self.load_or_create(thread_id).await?;
        let mut step_index: u32 = 0;
        let meta = |step_index: u32| MessageMetadata {
            run_id: Some(run_id.clone()),
            step_index: Some(step_index),
        };

        let user_msg = Message::user(user_text).with_metadata(meta(step_index));
        let delta = self.commit(&mut thread, START, vec![user_msg], &run_id).await?;
        emit(AgentEvent::Step {
            node: START.to_string(),
            delta: delta.messages,
            at_ms: delta.at_ms,
        });

        let tool_refs: Vec<&dyn Tool> = self.tools.values().map(|t| t.as_ref()).collect();
        let mut current = self.definition.start_node()?;
        let mut reasoning_steps: usize = 0;
        let mut last_text = String::new();

        loop {
            if consumer_gone() {
                debug!(thread_id, "consumer disconnected, stopping run");
                return Ok(RunOutcome {
                    thread,
                    response: last_text,
                });
            }
            step_index += 1;

            match self.definition.node_kind(current)? {
                NodeKind::Reasoning => {
                    reasoning_steps += 1;
                    if reasoning_steps >= self.config.max_steps {
                        return Err(EngineError::CycleExceeded(self.config.max_steps));
                    }

                    let mut request_messages = Vec::new();
                    if !self.config.system_prompt.is_empty() {
                        request_messages.push(Message::system(&self.config.system_prompt));
                    }
                    request_messages.extend(thread.messages.iter().cloned());
                    let request = build_request(&request_messages, &tool_refs);

                    let mut chat_stream = self
                        .llm
                        .exec_chat_stream_events(
                            &self.config.model,
                            request,
                            self.config.chat_options.as_ref(),
                        )
                        .await
                        .map_err(|e| EngineError::Inference(e.to_string()))?;

                    let mut collector = StreamCollector::new();
                    while let Some(item) = chat_stream.next().await {
                        let event =
                            item.map_err(|e| EngineError::Inference(e.to_string()))?;
                        match collector.process(event) {
                            Some(StreamOutput::TextDelta(delta)) => {
                                emit(AgentEvent::TextDelta { delta });
                            }
                            Some(StreamOutput::ToolCallStart { id, name }) => {
                                emit(AgentEvent::ToolCallStart { id, name });
                            }
                            Some(StreamOutput::ToolCallDelta { .. }) | None => {}
                        }
                    }
                    let result = collector.finish();
                    last_text = result.text.clone();

                    // The assistant message always carries the accumulated
                    // final text, never an empty placeholder.
                    let assistant = if result.tool_calls.is_empty() {
                        Message::assistant(&result.text)
                    } else {
                        Message::assistant_with_tool_calls(
                            &result.text,
                            result.tool_calls.clone(),
                        )
                    }
                    .with_metadata(meta(step_index));

                    let delta = self.commit(&mut thread, current, vec![assistant], &run_id).await?;
                    emit(AgentEvent::Step {
                        node: current.to_string(),
                        delta: delta.messages,
                        at_ms: delta.at_ms,
                    });

                    match self.definition.next(current, &thread.messages)? {
                        Next::End => {
                            info!(thread_id, run_id = %run_id, steps = reasoning_steps, "run finished");
                            emit(AgentEvent::Done {
                                response: result.text.clone(),
                            });
                            return Ok(RunOutcome {
                                thread,
                                response: result.text,
                            });
                        }
                        Next::Node(next) => current = next,
                    }
                }
                NodeKind::ToolExecution => {
                    let calls = thread
                        .last_message()
                        .map(|m| m.tool_calls().to_vec())
                        .unwrap_or_default();
                    debug!(thread_id, count = calls.len(), "dispatching tool calls");

                    let executions = execute_tools_parallel(&self.tools, &calls).await;

                    let mut tool_messages = Vec::with_capacity(executions.len());
                    for exec in &executions {
                        emit(AgentEvent::ToolCallDone {
                            id: exec.call.id.clone(),
                            result: exec.result.clone(),
                        });
                        tool_messages.push(
                            tool_response(&exec.call.id, &exec.result)
                                .with_metadata(meta(step_index)),
                        );
                    }

                    let delta = self
                        .commit(&mut thread, current, tool_messages, &run_id)
                        .await?;
                    emit(AgentEvent::Step {
                        node: current.to_string(),
                        delta: delta.messages,
                        at_ms: delta.at_ms,
                    });

                    match self.definition.next(current, &thread.messages)? {
                        Next::End => {
                            emit(AgentEvent::Done {
                                response: last_text.clone(),
                            });
                            return Ok(RunOutcome {
                                thread,
                                response: last_text,
                            });
                        }
                        Next::Node(next) => current = next,
                    }
                }
            }
        }
    }
}
