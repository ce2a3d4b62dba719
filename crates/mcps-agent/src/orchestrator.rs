//! Conversation loop: model turns interleaved with tool execution

use std::fmt;
use std::time::Instant;

use mcps_client::McpClient;
use mcps_core::{ConversationMessage, ToolCall};
use tracing::{debug, info, warn};

use crate::adapter::ModelAdapter;
use crate::errors::{AgentError, Result};
use crate::types::Usage;

/// Default maximum number of tool rounds per chat
pub const DEFAULT_MAX_TURNS: usize = 10;

/// System prompt asking the model to reason before each tool call
pub const REACT_SYSTEM_PROMPT: &str = "You are a helpful assistant that follows the ReAct pattern.
For each step, you MUST:
1. Think: Reason about what to do next based on the current state
2. Act: Call exactly ONE tool if needed
3. Observe: Process the tool result before deciding next action

Always explain your reasoning before taking an action.
Call only ONE tool at a time, then wait for the result before proceeding.";

/// Options for a conversation
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Maximum model-to-tools round trips in one `chat`
    pub max_turns: usize,

    /// Prepended once, at the start of the history
    pub system_prompt: Option<String>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(mut self, turns: usize) -> Self {
        self.max_turns = turns;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn without_system_prompt(mut self) -> Self {
        self.system_prompt = None;
        self
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            system_prompt: Some(REACT_SYSTEM_PROMPT.to_string()),
        }
    }
}

/// Where a chat currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    AwaitingTools,
    Done,
    Aborted,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Done | TurnState::Aborted)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::AwaitingModel => "awaiting_model",
            TurnState::AwaitingTools => "awaiting_tools",
            TurnState::Done => "done",
            TurnState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Drives one model through tool-calling conversations.
///
/// The history persists across `chat` calls. A chat that fails, or whose
/// future is dropped before completing, leaves no trace in it.
pub struct ConversationOrchestrator<A: ModelAdapter> {
    adapter: A,
    options: ChatOptions,
    history: Vec<ConversationMessage>,
    usage: Usage,
    state: Option<TurnState>,
    // History length before the chat in flight, if any
    checkpoint: Option<usize>,
}

impl<A: ModelAdapter> ConversationOrchestrator<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            options: ChatOptions::default(),
            history: Vec::new(),
            usage: Usage::default(),
            state: None,
            checkpoint: None,
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.checkpoint = None;
    }

    /// Token usage across every chat so far
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// State the last chat ended in (or is in)
    pub fn state(&self) -> Option<TurnState> {
        self.state
    }

    /// Send `input` and run tool rounds until the model answers in text.
    ///
    /// Fails only on model errors or when the model still wants tools after
    /// `max_turns` rounds; tool failures are fed back to the model instead.
    pub async fn chat(&mut self, client: &McpClient, input: &str) -> Result<String> {
        if let Some(checkpoint) = self.checkpoint.take() {
            debug!("Discarding {} message(s) from an interrupted chat", self.history.len() - checkpoint);
            self.history.truncate(checkpoint);
        }

        let started = Instant::now();
        info!("[START] chat ({} / {})", self.adapter.name(), self.adapter.model());

        self.checkpoint = Some(self.history.len());
        let outcome = self.run_turns(client, input).await;
        if let Some(checkpoint) = self.checkpoint.take() {
            // An aborted chat still leaves a well-formed history: every
            // recorded tool call already has its result.
            if matches!(&outcome, Err(e) if !matches!(e, AgentError::MaxTurnsExceeded(_))) {
                self.history.truncate(checkpoint);
            }
        }

        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        match &outcome {
            Ok(_) => info!("[END] chat ({:.3}ms)", elapsed),
            Err(e) => warn!("[END] chat failed: {} ({:.3}ms)", e, elapsed),
        }
        outcome
    }

    async fn run_turns(&mut self, client: &McpClient, input: &str) -> Result<String> {
        if self.history.is_empty() {
            if let Some(prompt) = &self.options.system_prompt {
                self.history.push(ConversationMessage::system(prompt.clone()));
            }
        }
        self.history.push(ConversationMessage::user(input));

        let schema = self.adapter.build_tool_schema(client.all_tools());
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut rounds = 0;
        let mut call_number = 0;
        let mut answer = String::new();
        let mut state = TurnState::AwaitingModel;

        while !state.is_terminal() {
            self.state = Some(state);
            state = match state {
                TurnState::AwaitingModel => {
                    let response = self.adapter.send(&self.history, &schema).await?;
                    self.usage.add(&self.adapter.usage(&response));

                    let calls = self.adapter.extract_tool_calls(&response);
                    let text = self.adapter.final_text(&response);

                    if calls.is_empty() {
                        self.history.push(ConversationMessage::assistant(text.clone()));
                        answer = text;
                        TurnState::Done
                    } else if rounds >= self.options.max_turns {
                        warn!("Max turns ({}) exceeded", self.options.max_turns);
                        TurnState::Aborted
                    } else {
                        if !text.is_empty() {
                            info!("[Thought {}] {}", call_number + 1, text);
                        }
                        self.history
                            .push(ConversationMessage::assistant_with_calls(text, calls.clone()));
                        pending = calls;
                        TurnState::AwaitingTools
                    }
                }
                TurnState::AwaitingTools => {
                    rounds += 1;
                    debug!("Round {}: executing {} tool call(s)", rounds, pending.len());
                    for call in pending.drain(..) {
                        call_number += 1;
                        info!("[Action {}] {}({})", call_number, call.name, call.arguments);
                        let result = client.call_tool(&call.name, call.arguments.clone()).await;
                        info!("[Observation {}] {}", call_number, result.to_model_text());
                        self.history
                            .push(ConversationMessage::tool_result(&call, &result));
                    }
                    TurnState::AwaitingModel
                }
                TurnState::Done | TurnState::Aborted => state,
            };
        }
        self.state = Some(state);

        match state {
            TurnState::Aborted => Err(AgentError::MaxTurnsExceeded(self.options.max_turns)),
            _ => Ok(answer),
        }
    }
}
