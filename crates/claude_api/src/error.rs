use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum ClaudeApiError {
    MissingApiKey,
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Read(std::io::Error),
    Serde(JsonError),
    StreamFailed {
        code: Option<String>,
        message: String,
    },
    Cancelled,
    Unknown(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl fmt::Display for ClaudeApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Read(error) => write!(f, "stream read failure: {error}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::StreamFailed { code, message } => match code {
                Some(code) if !code.trim().is_empty() => {
                    write!(f, "stream failed ({code}): {message}")
                }
                _ => write!(f, "stream failed: {message}"),
            },
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ClaudeApiError {}

impl From<reqwest::Error> for ClaudeApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ClaudeApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

impl From<std::io::Error> for ClaudeApiError {
    fn from(error: std::io::Error) -> Self {
        Self::Read(error)
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let parsed = match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => payload,
        Err(_) => {
            return if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.to_string()
            };
        }
    };

    if let Some(error) = parsed.value {
        let kind = error.type_.as_deref().unwrap_or("");
        if let Some(message) = error.message.as_deref().filter(|value| !value.is_empty()) {
            return if kind.is_empty() {
                message.to_owned()
            } else {
                format!("{kind}: {message}")
            };
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
