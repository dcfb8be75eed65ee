use std::collections::BTreeMap;

use crate::config::{ClaudeApiConfig, ANTHROPIC_VERSION};
use crate::error::ClaudeApiError;

pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_VERSION: &str = "anthropic-version";
pub const HEADER_BETA: &str = "anthropic-beta";
pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for Messages transport requests.
pub fn build_headers(
    config: &ClaudeApiConfig,
    user_agent: Option<&str>,
) -> Result<BTreeMap<String, String>, ClaudeApiError> {
    if config.api_key.trim().is_empty() {
        return Err(ClaudeApiError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_API_KEY.to_owned(),
        config.api_key.trim().to_owned(),
    );
    headers.insert(HEADER_VERSION.to_owned(), ANTHROPIC_VERSION.to_owned());
    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    if let Some(beta) = config.beta.as_deref() {
        if !beta.trim().is_empty() {
            headers.insert(HEADER_BETA.to_owned(), beta.trim().to_owned());
        }
    }

    let ua = match (user_agent, config.user_agent.as_deref()) {
        (Some(explicit), _) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        (None, Some(explicit)) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        _ => default_user_agent(),
    };
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

fn default_user_agent() -> String {
    format!(
        "tandem/{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::{build_headers, HEADER_API_KEY, HEADER_BETA, HEADER_USER_AGENT};
    use crate::config::ClaudeApiConfig;
    use crate::error::ClaudeApiError;

    #[test]
    fn missing_api_key_is_rejected() {
        let config = ClaudeApiConfig::default();
        assert!(matches!(
            build_headers(&config, None),
            Err(ClaudeApiError::MissingApiKey)
        ));
    }

    #[test]
    fn headers_carry_key_version_and_beta() {
        let config = ClaudeApiConfig::new("sk-test");
        let headers = build_headers(&config, None).expect("headers build");
        assert_eq!(headers.get(HEADER_API_KEY).map(String::as_str), Some("sk-test"));
        assert!(headers.contains_key(HEADER_BETA));
        assert!(headers.contains_key(HEADER_USER_AGENT));
    }

    #[test]
    fn explicit_user_agent_wins_over_config() {
        let config = ClaudeApiConfig::new("sk-test").with_user_agent("from-config");
        let headers = build_headers(&config, Some("explicit")).expect("headers build");
        assert_eq!(
            headers.get(HEADER_USER_AGENT).map(String::as_str),
            Some("explicit")
        );
    }
}
