pub mod anthropic;
pub mod mock;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;

use chat_provider::{ChatProvider, ProviderError};
use claude_api::ClaudeApiConfig;

pub const PROVIDER_ENV_VAR: &str = "TANDEM_PROVIDER";
pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";
pub const MODEL_ENV_VAR: &str = "TANDEM_MODEL";

/// Selects a provider from the environment: `TANDEM_PROVIDER=mock` for a
/// deterministic local run, otherwise the Anthropic transport.
pub fn provider_from_env() -> Result<Box<dyn ChatProvider>, ProviderError> {
    if std::env::var(PROVIDER_ENV_VAR).as_deref() == Ok("mock") {
        return Ok(Box::new(MockProvider::default()));
    }

    let api_key = std::env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ProviderError::init("ANTHROPIC_API_KEY not found in environment"))?;

    let mut config = ClaudeApiConfig::new(api_key);
    if let Ok(model) = std::env::var(MODEL_ENV_VAR) {
        if !model.trim().is_empty() {
            config = config.with_model(model.trim().to_string());
        }
    }

    Ok(Box::new(AnthropicProvider::new(config)?))
}
