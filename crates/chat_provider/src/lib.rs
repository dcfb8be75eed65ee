//! Minimal provider-agnostic contract for one streamed conversation turn.
//!
//! This crate intentionally defines only the shared message history model,
//! the block/turn stream-event vocabulary, and the host-facing provider
//! trait. It excludes provider transport details, wire payload shapes, and
//! session orchestration concerns.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde_json::Value;

/// Shared cancellation flag for an in-flight provider round-trip.
pub type CancelSignal = Arc<AtomicBool>;

/// Message author within a conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One completed tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// A unit of message content delivered by or returned to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text { text: String },
    ToolUse(ToolUse),
    ToolResult { tool_use_id: String, content: String },
}

/// Message payload: plain text or an ordered block list.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One history item. History is append-only; messages are immutable once
/// appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Constructs a plain-text user message.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Constructs a plain-text assistant message.
    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Constructs the assistant message recording a tool call alongside the
    /// text streamed before it.
    #[must_use]
    pub fn assistant_tool_call(text: impl Into<String>, tool_use: ToolUse) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(vec![
                ContentBlock::Text { text: text.into() },
                ContentBlock::ToolUse(tool_use),
            ]),
        }
    }

    /// Constructs the user message carrying one tool result back to the
    /// provider.
    #[must_use]
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
            }]),
        }
    }
}

/// Kind of content block a provider has opened mid-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    ToolUse { id: String, name: String },
}

/// Reason a provider reported for ending the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "end_turn" => Self::EndTurn,
            "tool_use" => Self::ToolUse,
            "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndTurn => "end_turn",
            Self::ToolUse => "tool_use",
            Self::MaxTokens => "max_tokens",
            Self::StopSequence => "stop_sequence",
        }
    }

    /// Returns true when this stop reason requests a tool dispatch rather
    /// than a natural end of turn.
    #[must_use]
    pub fn requests_tool(&self) -> bool {
        matches!(self, Self::ToolUse)
    }
}

/// Provider-neutral stream event delivered in provider order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    BlockStart { kind: BlockKind },
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    BlockStop,
    TurnDelta { stop_reason: StopReason },
}

/// Generic host-mediated tool definition advertised to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Input required to start one provider round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// Immutable metadata describing a chat provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Error surfaced by a provider. Terminal for the current turn; the host
/// does not retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    Init(String),
    Transport(String),
    Stream(String),
    Cancelled,
}

impl ProviderError {
    /// Creates a provider initialization error.
    #[must_use]
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init(message.into())
    }

    /// Creates a transport-level error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(message) => write!(f, "provider initialization failed: {message}"),
            Self::Transport(message) => write!(f, "provider transport error: {message}"),
            Self::Stream(message) => write!(f, "provider stream error: {message}"),
            Self::Cancelled => write!(f, "provider round-trip was cancelled"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Provider interface for executing one streamed round-trip.
pub trait ChatProvider {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Streams one provider round-trip, invoking `on_event` for each
    /// decoded block/turn event in provider order. The callback is serial
    /// from the caller's perspective; the only suspension point is the
    /// provider's own blocking read.
    fn stream_turn(
        &mut self,
        request: TurnRequest,
        cancel: CancelSignal,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), ProviderError>;
}
