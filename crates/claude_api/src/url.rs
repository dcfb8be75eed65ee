/// Default base URL for Anthropic Messages API requests.
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Normalize a base URL to a Messages endpoint.
///
/// Normalization rules:
/// 1) keep `/v1/messages` unchanged
/// 2) append `/messages` when path ends in `/v1`
/// 3) append `/v1/messages` otherwise
pub fn normalize_messages_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_ANTHROPIC_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/v1/messages") {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/v1") {
        return format!("{trimmed}/messages");
    }
    format!("{trimmed}/v1/messages")
}

#[cfg(test)]
mod tests {
    use super::{normalize_messages_url, DEFAULT_ANTHROPIC_BASE_URL};

    #[test]
    fn empty_input_uses_default_base() {
        assert_eq!(
            normalize_messages_url(""),
            format!("{DEFAULT_ANTHROPIC_BASE_URL}/v1/messages")
        );
    }

    #[test]
    fn existing_endpoint_is_kept() {
        assert_eq!(
            normalize_messages_url("https://api.anthropic.com/v1/messages/"),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn version_suffix_gets_messages_appended() {
        assert_eq!(
            normalize_messages_url("https://proxy.internal/v1"),
            "https://proxy.internal/v1/messages"
        );
    }
}
