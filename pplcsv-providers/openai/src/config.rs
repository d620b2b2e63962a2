//! Connection settings for the completion endpoint.

use std::{fmt, time::Duration};

/// Base URL used when configuration does not name one; matches the default
/// address of a local vLLM server.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/v1";

/// Settings for [`crate::OpenAiScorer`].
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use pplcsv_providers_openai::OpenAiConfig;
///
/// let config = OpenAiConfig::new("http://gpu-box:8000/v1/")
///     .with_api_key(Some("secret".to_owned()))
///     .with_timeout(Some(Duration::from_secs(30)));
/// assert_eq!(config.completions_url(), "http://gpu-box:8000/v1/completions");
/// assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
/// ```
#[derive(Clone)]
pub struct OpenAiConfig {
    api_base: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl OpenAiConfig {
    /// Creates settings for the server at `api_base` with no key and no
    /// request timeout.
    #[must_use]
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: None,
            timeout: None,
        }
    }

    /// Sets the bearer token sent with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Sets the per-request timeout. `None` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the bearer token, if any.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Returns the per-request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the full URL of the completions endpoint.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/completions", self.api_base.trim_end_matches('/'))
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
