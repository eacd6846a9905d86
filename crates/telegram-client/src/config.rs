//! Configuration types for telegram-client.

/// Default Bot API host.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Configuration for connecting to the Bot API.
#[derive(Clone)]
pub struct BotConfig {
    /// Base URL of the Bot API (e.g., "https://api.telegram.org").
    pub base_url: String,
    /// Bot token issued by BotFather.
    pub token: String,
    /// Long-poll timeout in seconds passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    /// Create a configuration against the public Bot API.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    /// Create a configuration against a custom Bot API server.
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            poll_timeout_secs: 25,
        }
    }

    /// Get the URL for a Bot API method.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }
}

// The token is a credential; keep it out of logs.
impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}
