use chat_provider::{ContentBlock, Message, MessageContent, Role, ToolUse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// On-disk shape of one saved conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatFile {
    pub system_prompt: String,
    pub history: Vec<WireMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: WireContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Blocks(Vec<WireContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::User => WireRole::User,
            Role::Assistant => WireRole::Assistant,
        };

        let content = match &message.content {
            MessageContent::Text(text) => WireContent::Text(text.clone()),
            MessageContent::Blocks(blocks) => {
                WireContent::Blocks(blocks.iter().map(WireContentBlock::from).collect())
            }
        };

        Self { role, content }
    }
}

impl From<&ContentBlock> for WireContentBlock {
    fn from(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => Self::Text { text: text.clone() },
            ContentBlock::ToolUse(tool_use) => Self::ToolUse {
                id: tool_use.id.clone(),
                name: tool_use.name.clone(),
                input: tool_use.input.clone(),
            },
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => Self::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
            },
        }
    }
}

impl From<WireMessage> for Message {
    fn from(message: WireMessage) -> Self {
        let role = match message.role {
            WireRole::User => Role::User,
            WireRole::Assistant => Role::Assistant,
        };

        let content = match message.content {
            WireContent::Text(text) => MessageContent::Text(text),
            WireContent::Blocks(blocks) => {
                MessageContent::Blocks(blocks.into_iter().map(ContentBlock::from).collect())
            }
        };

        Self { role, content }
    }
}

impl From<WireContentBlock> for ContentBlock {
    fn from(block: WireContentBlock) -> Self {
        match block {
            WireContentBlock::Text { text } => Self::Text { text },
            WireContentBlock::ToolUse { id, name, input } => {
                Self::ToolUse(ToolUse { id, name, input })
            }
            WireContentBlock::ToolResult {
                tool_use_id,
                content,
            } => Self::ToolResult {
                tool_use_id,
                content,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chat_provider::Message;
    use serde_json::json;

    use super::{ChatFile, WireMessage};

    #[test]
    fn plain_text_history_serializes_as_bare_strings() {
        let file = ChatFile {
            system_prompt: "be helpful".to_string(),
            history: vec![
                WireMessage::from(&Message::user_text("hi")),
                WireMessage::from(&Message::assistant_text("hello")),
            ],
        };

        let value = serde_json::to_value(&file).expect("chat file serializes");
        assert_eq!(value["history"][0]["role"], json!("user"));
        assert_eq!(value["history"][0]["content"], json!("hi"));
        assert_eq!(value["history"][1]["content"], json!("hello"));
    }

    #[test]
    fn tool_messages_round_trip_through_the_wire_shape() {
        let call = Message::assistant_tool_call(
            "on it",
            chat_provider::ToolUse {
                id: "toolu_1".to_string(),
                name: "execute_command".to_string(),
                input: json!({"command": "ls", "purpose": "list"}),
            },
        );
        let result = Message::tool_result("toolu_1", "<result/>");

        for message in [call, result] {
            let wire = WireMessage::from(&message);
            let text = serde_json::to_string(&wire).expect("serialize");
            let parsed: WireMessage = serde_json::from_str(&text).expect("deserialize");
            assert_eq!(Message::from(parsed), message);
        }
    }
}
