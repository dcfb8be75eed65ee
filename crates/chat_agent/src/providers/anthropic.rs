use chat_provider::{
    BlockKind, CancelSignal, ChatProvider, ContentBlock, Message, MessageContent, ProviderError,
    ProviderProfile, Role, StopReason, StreamEvent, ToolDefinition, TurnRequest,
};
use claude_api::events::{ClaudeStreamEvent, ContentDelta, StartedBlock, TurnStopReason};
use claude_api::payload::{MessagesRequest, WireBlock, WireContent, WireMessage, WireRole, WireTool};
use claude_api::{ClaudeApiClient, ClaudeApiConfig, ClaudeApiError};

/// Anthropic Messages transport behind the provider-neutral contract.
pub struct AnthropicProvider {
    client: ClaudeApiClient,
}

impl AnthropicProvider {
    pub fn new(config: ClaudeApiConfig) -> Result<Self, ProviderError> {
        let client = ClaudeApiClient::new(config)
            .map_err(|error| ProviderError::init(error.to_string()))?;
        Ok(Self { client })
    }
}

impl ChatProvider for AnthropicProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: "anthropic".to_string(),
            model_id: self.client.config().model.clone(),
        }
    }

    fn stream_turn(
        &mut self,
        request: TurnRequest,
        cancel: CancelSignal,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), ProviderError> {
        let wire_request = MessagesRequest::streaming(
            self.client.config(),
            request.system,
            request.messages.iter().map(wire_message).collect(),
            request.tools.iter().map(wire_tool).collect(),
        );

        self.client
            .stream_with_handler(&wire_request, Some(&cancel), |event| {
                if let Some(mapped) = map_stream_event(event) {
                    on_event(mapped);
                }
            })
            .map(|_| ())
            .map_err(provider_error)
    }
}

fn provider_error(error: ClaudeApiError) -> ProviderError {
    match error {
        ClaudeApiError::Cancelled => ProviderError::Cancelled,
        ClaudeApiError::StreamFailed { .. } => ProviderError::Stream(error.to_string()),
        other => ProviderError::Transport(other.to_string()),
    }
}

fn wire_message(message: &Message) -> WireMessage {
    let role = match message.role {
        Role::User => WireRole::User,
        Role::Assistant => WireRole::Assistant,
    };

    let content = match &message.content {
        MessageContent::Text(text) => WireContent::Text(text.clone()),
        MessageContent::Blocks(blocks) => {
            WireContent::Blocks(blocks.iter().map(wire_block).collect())
        }
    };

    WireMessage { role, content }
}

fn wire_block(block: &ContentBlock) -> WireBlock {
    match block {
        ContentBlock::Text { text } => WireBlock::Text { text: text.clone() },
        ContentBlock::ToolUse(tool_use) => WireBlock::ToolUse {
            id: tool_use.id.clone(),
            name: tool_use.name.clone(),
            input: tool_use.input.clone(),
        },
        ContentBlock::ToolResult {
            tool_use_id,
            content,
        } => WireBlock::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: content.clone(),
        },
    }
}

fn wire_tool(tool: &ToolDefinition) -> WireTool {
    WireTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.input_schema.clone(),
    }
}

fn map_stream_event(event: ClaudeStreamEvent) -> Option<StreamEvent> {
    match event {
        ClaudeStreamEvent::ContentBlockStart { block } => Some(StreamEvent::BlockStart {
            kind: match block {
                StartedBlock::Text => BlockKind::Text,
                StartedBlock::ToolUse { id, name } => BlockKind::ToolUse { id, name },
            },
        }),
        ClaudeStreamEvent::ContentBlockDelta { delta } => Some(match delta {
            ContentDelta::TextDelta { text } => StreamEvent::TextDelta { text },
            ContentDelta::InputJsonDelta { partial_json } => {
                StreamEvent::InputJsonDelta { partial_json }
            }
        }),
        ClaudeStreamEvent::ContentBlockStop => Some(StreamEvent::BlockStop),
        ClaudeStreamEvent::MessageDelta {
            stop_reason: Some(reason),
        } => Some(StreamEvent::TurnDelta {
            stop_reason: match reason {
                TurnStopReason::EndTurn => StopReason::EndTurn,
                TurnStopReason::ToolUse => StopReason::ToolUse,
                TurnStopReason::MaxTokens => StopReason::MaxTokens,
                TurnStopReason::StopSequence => StopReason::StopSequence,
            },
        }),
        ClaudeStreamEvent::MessageStart
        | ClaudeStreamEvent::MessageDelta { stop_reason: None }
        | ClaudeStreamEvent::MessageStop
        | ClaudeStreamEvent::Ping
        | ClaudeStreamEvent::Error { .. } => None,
    }
}
