use claude_api::events::{ClaudeStreamEvent, ContentDelta, StartedBlock, TurnStopReason};
use claude_api::sse::SseStreamParser;

#[test]
fn full_text_turn_parses_in_order() {
    let frames = concat!(
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"a\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"b\"}}\n\n",
        "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );

    let events = SseStreamParser::parse_frames(frames);
    assert_eq!(
        events,
        vec![
            ClaudeStreamEvent::MessageStart,
            ClaudeStreamEvent::ContentBlockStart {
                block: StartedBlock::Text,
            },
            ClaudeStreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta {
                    text: "a".to_string(),
                },
            },
            ClaudeStreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta {
                    text: "b".to_string(),
                },
            },
            ClaudeStreamEvent::ContentBlockStop,
            ClaudeStreamEvent::MessageDelta {
                stop_reason: Some(TurnStopReason::EndTurn),
            },
            ClaudeStreamEvent::MessageStop,
        ]
    );
}

#[test]
fn tool_use_block_carries_identity_and_json_fragments() {
    let frames = concat!(
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"apply_diff\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"target_path\\\":\\\"f\\\"\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"}\"}}\n\n",
        "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"tool_use\"}}\n\n",
    );

    let events = SseStreamParser::parse_frames(frames);
    assert_eq!(
        events[0],
        ClaudeStreamEvent::ContentBlockStart {
            block: StartedBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "apply_diff".to_string(),
            },
        }
    );
    assert_eq!(
        events[1],
        ClaudeStreamEvent::ContentBlockDelta {
            delta: ContentDelta::InputJsonDelta {
                partial_json: "{\"target_path\":\"f\"".to_string(),
            },
        }
    );
    assert_eq!(
        events.last(),
        Some(&ClaudeStreamEvent::MessageDelta {
            stop_reason: Some(TurnStopReason::ToolUse),
        })
    );
}

#[test]
fn frames_split_across_feeds_are_reassembled() {
    let mut parser = SseStreamParser::default();

    let first = parser.feed(b"data: {\"type\":\"content_block_de");
    assert!(first.is_empty());

    let second = parser.feed(
        b"lta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"joined\"}}\n\n",
    );
    assert_eq!(
        second,
        vec![ClaudeStreamEvent::ContentBlockDelta {
            delta: ContentDelta::TextDelta {
                text: "joined".to_string(),
            },
        }]
    );
    assert!(parser.is_empty_buffer());
}

#[test]
fn ping_and_unknown_events_do_not_break_the_stream() {
    let frames = concat!(
        "data: {\"type\":\"ping\"}\n\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"server_tool_use\"}}\n\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );

    let events = SseStreamParser::parse_frames(frames);
    assert_eq!(
        events,
        vec![ClaudeStreamEvent::Ping, ClaudeStreamEvent::MessageStop]
    );
}

#[test]
fn error_event_exposes_code_and_message() {
    let frames =
        "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"busy\"}}\n\n";

    let events = SseStreamParser::parse_frames(frames);
    assert_eq!(
        events,
        vec![ClaudeStreamEvent::Error {
            code: Some("overloaded_error".to_string()),
            message: Some("busy".to_string()),
        }]
    );
}
