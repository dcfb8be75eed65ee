use serde_json::Value;
use tracing::debug;

use crate::events::{ClaudeStreamEvent, ContentDelta, StartedBlock, TurnStopReason};

/// Incremental parser for SSE text streams.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: String,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ClaudeStreamEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut events = Vec::new();

        while let Some(split) = self.buffer.find("\n\n") {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);

            if let Some(payload) = extract_data_payload(&frame) {
                if payload == "[DONE]" || payload.is_empty() {
                    continue;
                }

                match serde_json::from_str::<Value>(&payload) {
                    Ok(value) => {
                        if let Some(event) = map_event(value) {
                            events.push(event);
                        }
                    }
                    Err(error) => {
                        debug!(%error, "skipping undecodable SSE frame");
                    }
                }
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<ClaudeStreamEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn map_event(value: Value) -> Option<ClaudeStreamEvent> {
    let event_type = value.get("type")?.as_str()?;

    match event_type {
        "message_start" => Some(ClaudeStreamEvent::MessageStart),
        "content_block_start" => {
            let block = value.get("content_block")?;
            let block_type = block.get("type").and_then(Value::as_str).unwrap_or("");
            let started = match block_type {
                "text" => StartedBlock::Text,
                "tool_use" => StartedBlock::ToolUse {
                    id: block
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned(),
                    name: block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned(),
                },
                _ => return None,
            };
            Some(ClaudeStreamEvent::ContentBlockStart { block: started })
        }
        "content_block_delta" => {
            let delta = value.get("delta")?;
            let delta_type = delta.get("type").and_then(Value::as_str).unwrap_or("");
            let mapped = match delta_type {
                "text_delta" => ContentDelta::TextDelta {
                    text: delta
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned(),
                },
                "input_json_delta" => ContentDelta::InputJsonDelta {
                    partial_json: delta
                        .get("partial_json")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned(),
                },
                _ => return None,
            };
            Some(ClaudeStreamEvent::ContentBlockDelta { delta: mapped })
        }
        "content_block_stop" => Some(ClaudeStreamEvent::ContentBlockStop),
        "message_delta" => {
            let stop_reason = value
                .get("delta")
                .and_then(|delta| delta.get("stop_reason"))
                .and_then(Value::as_str)
                .and_then(TurnStopReason::parse);
            Some(ClaudeStreamEvent::MessageDelta { stop_reason })
        }
        "message_stop" => Some(ClaudeStreamEvent::MessageStop),
        "ping" => Some(ClaudeStreamEvent::Ping),
        "error" => {
            let code = value
                .get("error")
                .and_then(|error| error.get("type"))
                .and_then(Value::as_str)
                .map(ToString::to_string);
            let message = value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(ToString::to_string);
            Some(ClaudeStreamEvent::Error { code, message })
        }
        _ => None,
    }
}
