use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ClaudeApiConfig;

/// One request body for the Messages endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub system: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tools: Vec<WireTool>,
    pub stream: bool,
}

impl MessagesRequest {
    /// Builds a streaming request using the transport config's model and
    /// token budget.
    #[must_use]
    pub fn streaming(
        config: &ClaudeApiConfig,
        system: impl Into<String>,
        messages: Vec<WireMessage>,
        tools: Vec<WireTool>,
    ) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system: system.into(),
            messages,
            tools,
            stream: true,
        }
    }
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

/// Message content: a bare string or an ordered block list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Blocks(Vec<WireBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireBlock {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub input_schema: Value,
}
