use std::collections::VecDeque;
use std::sync::atomic::Ordering;

use chat_provider::{
    BlockKind, CancelSignal, ChatProvider, ProviderError, ProviderProfile, StopReason,
    StreamEvent, TurnRequest,
};

/// Deterministic scripted provider for offline runs and tests.
///
/// Each `stream_turn` call replays the next scripted round-trip; when the
/// script is exhausted a canned text turn is emitted.
pub struct MockProvider {
    script: VecDeque<Vec<StreamEvent>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockProvider {
    #[must_use]
    pub fn new(script: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Event sequence for one text-only round-trip ending the turn.
    #[must_use]
    pub fn text_turn(chunks: &[&str]) -> Vec<StreamEvent> {
        let mut events = vec![StreamEvent::BlockStart {
            kind: BlockKind::Text,
        }];
        events.extend(chunks.iter().map(|chunk| StreamEvent::TextDelta {
            text: (*chunk).to_string(),
        }));
        events.push(StreamEvent::BlockStop);
        events.push(StreamEvent::TurnDelta {
            stop_reason: StopReason::EndTurn,
        });
        events
    }

    /// Event sequence for a round-trip that streams `text` and then
    /// requests one tool call with the given JSON input fragments.
    #[must_use]
    pub fn tool_turn(text: &str, id: &str, name: &str, json_fragments: &[&str]) -> Vec<StreamEvent> {
        let mut events = vec![
            StreamEvent::BlockStart {
                kind: BlockKind::Text,
            },
            StreamEvent::TextDelta {
                text: text.to_string(),
            },
            StreamEvent::BlockStop,
            StreamEvent::BlockStart {
                kind: BlockKind::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            },
        ];
        events.extend(
            json_fragments
                .iter()
                .map(|fragment| StreamEvent::InputJsonDelta {
                    partial_json: (*fragment).to_string(),
                }),
        );
        events.push(StreamEvent::BlockStop);
        events.push(StreamEvent::TurnDelta {
            stop_reason: StopReason::ToolUse,
        });
        events
    }
}

impl ChatProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: "mock".to_string(),
            model_id: "mock-model".to_string(),
        }
    }

    fn stream_turn(
        &mut self,
        _request: TurnRequest,
        cancel: CancelSignal,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), ProviderError> {
        if cancel.load(Ordering::Acquire) {
            return Err(ProviderError::Cancelled);
        }

        let events = self
            .script
            .pop_front()
            .unwrap_or_else(|| Self::text_turn(&["Mock assistant reply."]));

        for event in events {
            on_event(event);
        }

        Ok(())
    }
}
