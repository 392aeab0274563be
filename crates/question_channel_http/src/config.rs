use std::time::Duration;

/// Default backend origin used by local development setups.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Transport configuration for question fetch requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Base URL for the backend; the chat path is appended to it.
    pub base_url: String,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl ChannelConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ChannelConfig, DEFAULT_BASE_URL};

    #[test]
    fn default_points_at_local_backend_without_timeout() {
        let config = ChannelConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn builder_overrides_base_url_and_timeout() {
        let config =
            ChannelConfig::new("https://assess.example.com").with_timeout(Duration::from_secs(30));
        assert_eq!(config.base_url, "https://assess.example.com");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }
}
