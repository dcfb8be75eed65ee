use chat_provider::{BlockKind, StopReason, StreamEvent, ToolUse};
use serde_json::Value;
use tracing::warn;

/// Decoder position within the provider's block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Idle,
    TextBlock,
    ToolBlock,
}

/// Effect produced by one decoder transition.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEffect {
    /// Streamed assistant text, for immediate echo.
    TextChunk(String),
    /// The provider reported a natural end of turn.
    TurnFinished,
    /// Exactly one tool invocation is complete and ready for dispatch.
    ToolUseReady(ToolUse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingTool {
    id: String,
    name: String,
}

/// Incremental decoder from provider stream events to turn-level effects.
///
/// An explicit state tag plus a pure transition function: each event maps
/// to `(next state, effects)` with no suspension primitive. At most one
/// tool-use block accumulates at any time.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    state: DecoderState,
    assistant_text: String,
    pending_tool: Option<PendingTool>,
    json_buffer: String,
    completed_tool: Option<ToolUse>,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    #[must_use]
    pub fn assistant_text(&self) -> &str {
        &self.assistant_text
    }

    /// Takes the accumulated assistant text, resetting the buffer for the
    /// next round-trip.
    pub fn take_assistant_text(&mut self) -> String {
        std::mem::take(&mut self.assistant_text)
    }

    /// Applies one provider event and returns the effects it produced.
    pub fn on_event(&mut self, event: StreamEvent) -> Vec<DecodeEffect> {
        match (self.state, event) {
            (DecoderState::Idle, StreamEvent::BlockStart { kind }) => {
                match kind {
                    BlockKind::Text => self.state = DecoderState::TextBlock,
                    BlockKind::ToolUse { id, name } => {
                        self.state = DecoderState::ToolBlock;
                        self.json_buffer.clear();
                        self.pending_tool = Some(PendingTool { id, name });
                    }
                }
                Vec::new()
            }
            (DecoderState::TextBlock, StreamEvent::TextDelta { text }) => {
                self.assistant_text.push_str(&text);
                vec![DecodeEffect::TextChunk(text)]
            }
            (DecoderState::TextBlock, StreamEvent::BlockStop) => {
                self.state = DecoderState::Idle;
                Vec::new()
            }
            (DecoderState::ToolBlock, StreamEvent::InputJsonDelta { partial_json }) => {
                self.json_buffer.push_str(&partial_json);
                Vec::new()
            }
            (DecoderState::ToolBlock, StreamEvent::BlockStop) => {
                self.state = DecoderState::Idle;
                self.finish_tool_block();
                Vec::new()
            }
            (_, StreamEvent::TurnDelta { stop_reason }) => self.on_turn_delta(stop_reason),
            (state, event) => {
                warn!(?state, ?event, "ignoring stream event outside its expected state");
                Vec::new()
            }
        }
    }

    /// Parses the accumulated tool-input buffer. A parse failure degrades
    /// to an empty input mapping; it is never fatal.
    fn finish_tool_block(&mut self) {
        let Some(pending) = self.pending_tool.take() else {
            return;
        };

        let input = if self.json_buffer.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str::<Value>(&self.json_buffer) {
                Ok(value) => value,
                Err(error) => {
                    warn!(%error, buffer = %self.json_buffer, "failed to parse tool input JSON; substituting an empty mapping");
                    Value::Object(serde_json::Map::new())
                }
            }
        };

        self.completed_tool = Some(ToolUse {
            id: pending.id,
            name: pending.name,
            input,
        });
        self.json_buffer.clear();
    }

    fn on_turn_delta(&mut self, stop_reason: StopReason) -> Vec<DecodeEffect> {
        if stop_reason.requests_tool() {
            match self.completed_tool.take() {
                Some(tool_use) => vec![DecodeEffect::ToolUseReady(tool_use)],
                None => {
                    warn!("turn requested a tool dispatch but no completed tool-use block exists");
                    vec![DecodeEffect::TurnFinished]
                }
            }
        } else {
            vec![DecodeEffect::TurnFinished]
        }
    }
}
