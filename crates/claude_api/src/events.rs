use serde::{Deserialize, Serialize};

/// Stop reason reported by a `message_delta` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl TurnStopReason {
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
}

/// Content block opened by a `content_block_start` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StartedBlock {
    Text,
    ToolUse { id: String, name: String },
}

/// Incremental payload carried by a `content_block_delta` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

/// Stream event emitted by the parser after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeStreamEvent {
    MessageStart,
    ContentBlockStart { block: StartedBlock },
    ContentBlockDelta { delta: ContentDelta },
    ContentBlockStop,
    MessageDelta { stop_reason: Option<TurnStopReason> },
    MessageStop,
    Ping,
    Error {
        code: Option<String>,
        message: Option<String>,
    },
}

impl ClaudeStreamEvent {
    /// Returns true when this event terminates the stream for the caller.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MessageStop | Self::Error { .. })
    }
}
