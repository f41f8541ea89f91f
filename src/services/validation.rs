use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Longest channel name the engine accepts, in bytes.
pub const MAX_CHANNEL_NAME_BYTES: usize = 64;

static CHANNEL_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9 !#$%&()+\-:;<=.>?@\[\]^_{}|~,]+$").expect("Invalid channel name regex")
});

static INJECT_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(rtmps?|https?)://\S+$").expect("Invalid inject URL regex")
});

/// Operator input that fails a precondition. The message is shown as the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Fill channel name first")]
    EmptyChannelName,

    #[error("Channel name must be at most {MAX_CHANNEL_NAME_BYTES} bytes")]
    ChannelNameTooLong,

    #[error("Channel name contains unsupported characters: {0}")]
    InvalidChannelName(String),

    #[error("Fill INJECT URL first")]
    EmptyInjectUrl,

    #[error("Inject URL must start with rtmp://, rtmps://, http:// or https://")]
    UnsupportedInjectUrl(String),
}

/// Validate a channel name, returning it trimmed.
pub fn validate_channel_name(input: &str) -> Result<&str, InputError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(InputError::EmptyChannelName);
    }
    if name.len() > MAX_CHANNEL_NAME_BYTES {
        return Err(InputError::ChannelNameTooLong);
    }
    if !CHANNEL_NAME_PATTERN.is_match(name) {
        return Err(InputError::InvalidChannelName(name.to_string()));
    }
    Ok(name)
}

/// Validate a stream URL for injection, returning it trimmed.
pub fn validate_inject_url(input: &str) -> Result<&str, InputError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(InputError::EmptyInjectUrl);
    }
    if !INJECT_URL_PATTERN.is_match(url) {
        return Err(InputError::UnsupportedInjectUrl(url.to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_channel_name() {
        assert_eq!(validate_channel_name(""), Err(InputError::EmptyChannelName));
        assert_eq!(validate_channel_name("   "), Err(InputError::EmptyChannelName));
        assert_eq!(
            InputError::EmptyChannelName.to_string(),
            "Fill channel name first"
        );
    }

    #[test]
    fn test_channel_name_trimmed() {
        assert_eq!(validate_channel_name("  demo_1 "), Ok("demo_1"));
    }

    #[test]
    fn test_channel_name_rules() {
        assert_eq!(
            validate_channel_name(&"a".repeat(65)),
            Err(InputError::ChannelNameTooLong)
        );
        assert!(matches!(
            validate_channel_name("caf\u{e9}"),
            Err(InputError::InvalidChannelName(_))
        ));
        assert!(validate_channel_name("room-42 [test]").is_ok());
    }

    #[test]
    fn test_inject_url_schemes() {
        assert_eq!(
            validate_inject_url(" rtmp://example.com/live/a "),
            Ok("rtmp://example.com/live/a")
        );
        assert!(validate_inject_url("HTTPS://example.com/a.flv").is_ok());
        assert!(matches!(
            validate_inject_url("ftp://example.com/a"),
            Err(InputError::UnsupportedInjectUrl(_))
        ));
        assert_eq!(validate_inject_url(""), Err(InputError::EmptyInjectUrl));
        assert_eq!(
            InputError::EmptyInjectUrl.to_string(),
            "Fill INJECT URL first"
        );
    }
}
