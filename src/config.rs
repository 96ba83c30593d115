//! Configuration for talking to the content backend.
//!
//! Every knob lives in [`ClientConfig`], built via [`ClientConfigBuilder`].
//! The defaults reproduce a local development setup: backend on
//! `http://localhost:8000`, no request timeout.

use crate::error::CommunityGenError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Origin the backend listens on unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Upload ceiling the backend advertises (5 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Path of the entity-extraction endpoint.
pub const EXTRACT_PATH: &str = "/extract-info/";

/// Path of the content-generation endpoint.
pub const GENERATE_PATH: &str = "/generate-content/";

/// Configuration for [`crate::backend::HttpBackend`].
///
/// # Example
/// ```rust
/// use community_gen::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://127.0.0.1:9000/")
///     .timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.endpoint("/extract-info/"), "http://127.0.0.1:9000/extract-info/");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend origin, scheme included. A trailing slash is stripped on build.
    pub base_url: String,

    /// Per-request timeout in seconds. Default: none.
    ///
    /// Generation calls routinely take tens of seconds while the vendor
    /// model writes. With no timeout a hung backend leaves the request
    /// pending until the caller drops the future.
    pub timeout_secs: Option<u64>,

    /// Connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Size limit quoted when the backend answers 413. Default: 5 MB.
    pub max_upload_bytes: u64,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            connect_timeout_secs: 10,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            user_agent: concat!("community-gen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Absolute URL for an endpoint path such as [`EXTRACT_PATH`].
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.config.timeout_secs = None;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs.max(1);
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, CommunityGenError> {
        let trimmed = self.config.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(CommunityGenError::InvalidConfig(format!(
                "Backend URL must start with http:// or https://, got '{}'",
                self.config.base_url
            )));
        }
        if reqwest::Url::parse(&trimmed).is_err() {
            return Err(CommunityGenError::InvalidConfig(format!(
                "Backend URL '{}' is not a valid URL",
                self.config.base_url
            )));
        }
        if self.config.timeout_secs == Some(0) {
            return Err(CommunityGenError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        if self.config.max_upload_bytes == 0 {
            return Err(CommunityGenError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        self.config.base_url = trimmed;
        Ok(self.config)
    }
}
