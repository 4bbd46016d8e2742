//! Client configuration.
//!
//! The only configurable value is the analysis service base URL. Environment
//! variables are used as defaults so embedders can construct a [`Config`]
//! without touching the process environment.

/// Configuration for the analysis service connection.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the analysis service, without a trailing slash.
    pub base_url: String,
}

impl Config {
    /// Default service endpoint when nothing is configured.
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:8000";

    /// Build a config with an explicit base URL. Trailing slashes are trimmed
    /// so URL joining stays predictable.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Load configuration from environment variables.
    ///
    /// - `ADVISOR_BASE_URL` - analysis service endpoint (defaults to
    ///   `http://127.0.0.1:8000`)
    pub fn from_env() -> Self {
        let base_url = std::env::var("ADVISOR_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}
