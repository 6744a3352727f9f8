//! GitHub client configuration.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default base URL of the GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Configuration for the GitHub HTTP client.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// Token used as bearer credential for every API request
    #[cfg_attr(
        feature = "config",
        arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)
    )]
    #[serde(default, skip_serializing)]
    pub github_token: String,

    /// Base URL of the GitHub REST API
    #[cfg_attr(
        feature = "config",
        arg(
            long = "github-api-url",
            env = "GITHUB_API_URL",
            default_value = DEFAULT_API_URL
        )
    )]
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            api_url: default_api_url(),
            http_timeout: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl fmt::Debug for ReqwestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestConfig")
            .field("github_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("http_timeout", &self.http_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ReqwestConfig {
    /// Create a new configuration with the given API token.
    pub fn new(github_token: impl Into<String>) -> Self {
        Self {
            github_token: github_token.into(),
            ..Self::default()
        }
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    fn default_user_agent() -> String {
        format!("pbom/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Returns true if the client would authenticate its requests.
    pub fn has_token(&self) -> bool {
        !self.github_token.trim().is_empty()
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReqwestConfig::default();
        assert_eq!(config.http_timeout, 30);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.has_token());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ReqwestConfig::new("token")
            .with_timeout(120)
            .with_user_agent("custom-agent/1.0");

        assert!(config.has_token());
        assert_eq!(config.http_timeout, 120);
        assert_eq!(config.effective_user_agent(), "custom-agent/1.0");
    }

    #[test]
    fn test_effective_timeout_uses_default_when_zero() {
        let config = ReqwestConfig::default().with_timeout(0);
        assert_eq!(
            config.effective_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_token_is_never_printed() {
        let config = ReqwestConfig::new("ghp_secret");

        assert!(!format!("{config:?}").contains("ghp_secret"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("ghp_secret"));
    }
}
