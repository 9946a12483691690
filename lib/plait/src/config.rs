//! Client configuration types.

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

/// Default limit for buffered response bodies (2 GiB).
pub const DEFAULT_MAX_RESPONSE_BUFFER_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Configuration for the HTTP client.
///
/// The connection settings are read once, when the transport is created. The request
/// settings seed the client's mutable properties (see [`crate::Client`]).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout duration, covering the whole pipeline.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Base address relative request URIs are resolved against.
    pub base_address: Option<Url>,
    /// Headers added to every request that does not set them.
    pub default_headers: HashMap<String, String>,
    /// Maximum number of bytes buffered from a response body.
    pub max_response_buffer_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            base_address: None,
            default_headers: HashMap::new(),
            max_response_buffer_size: DEFAULT_MAX_RESPONSE_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    base_address: Option<Url>,
    default_headers: HashMap<String, String>,
    max_response_buffer_size: Option<u64>,
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the base address.
    #[must_use]
    pub fn base_address(mut self, url: Url) -> Self {
        self.base_address = Some(url);
        self
    }

    /// Add a default request header.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Set the maximum number of bytes buffered from a response body.
    #[must_use]
    pub const fn max_response_buffer_size(mut self, bytes: u64) -> Self {
        self.max_response_buffer_size = Some(bytes);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            base_address: self.base_address,
            default_headers: self.default_headers,
            max_response_buffer_size: self
                .max_response_buffer_size
                .unwrap_or(defaults.max_response_buffer_size),
        }
    }
}
