use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_ANTHROPIC_BASE_URL;

/// Default model requested when the caller does not override it.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Default completion budget per round-trip.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Protocol version carried in the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Beta flag enabling the extended completion budget.
pub const DEFAULT_BETA: &str = "max-tokens-3-5-sonnet-2024-07-15";

/// Transport configuration for Messages API requests.
#[derive(Debug, Clone)]
pub struct ClaudeApiConfig {
    /// API key passed to `x-api-key`.
    pub api_key: String,
    /// Base URL for Anthropic endpoints.
    pub base_url: String,
    /// Model identifier requested for each round-trip.
    pub model: String,
    /// Completion token budget per round-trip.
    pub max_tokens: u32,
    /// Optional `anthropic-beta` header value.
    pub beta: Option<String>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for ClaudeApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            beta: Some(DEFAULT_BETA.to_string()),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl ClaudeApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_beta(mut self, beta: impl Into<String>) -> Self {
        self.beta = Some(beta.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
