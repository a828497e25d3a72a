use crate::client::core::Client;
use crate::config::ClientConfig;
use crate::request::{SearchParams, SearchParamsTransform};
use crate::timeout::Timeout;
use crate::transport::{HttpTransport, Transport};
use crate::{Error, ErrorContext, Result};
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builder for creating clients with custom configuration.
///
/// Values set on the builder win over the environment:
/// - `KUBO_RPC_URL` (default `http://127.0.0.1:5001`)
/// - `KUBO_RPC_TIMEOUT` (milliseconds or a duration string; default none)
/// - `KUBO_RPC_POOL_MAX_IDLE_PER_HOST` (default 32)
/// - `KUBO_RPC_POOL_IDLE_TIMEOUT_SECS` (default 90)
/// - `KUBO_RPC_PROXY_URL`
pub struct ClientBuilder {
    base_url: Option<String>,
    api_path: Option<String>,
    headers: HeaderMap,
    search_params: SearchParams,
    timeout: Option<Timeout>,
    throw_http_errors: bool,
    transform_search_params: Option<Option<SearchParamsTransform>>,
    buffer_stream_uploads: Option<bool>,
    pool_max_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    proxy_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_path: None,
            headers: HeaderMap::new(),
            search_params: SearchParams::new(),
            timeout: None,
            throw_http_errors: true,
            transform_search_params: None,
            buffer_stream_uploads: None,
            pool_max_idle_per_host: None,
            pool_idle_timeout: None,
            proxy_url: None,
            transport: None,
        }
    }

    /// Daemon address, e.g. `http://127.0.0.1:5001`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// API prefix (default `/api/v0`).
    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = Some(path.into());
        self
    }

    /// Header sent with every call.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Query parameter sent with every call.
    pub fn search_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.search_params.append(key, value);
        self
    }

    /// Default timeout for every call.
    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn throw_http_errors(mut self, enable: bool) -> Self {
        self.throw_http_errors = enable;
        self
    }

    /// Replace the default kebab-case parameter transform. `None` sends keys as given.
    pub fn transform_search_params(mut self, transform: Option<SearchParamsTransform>) -> Self {
        self.transform_search_params = Some(transform);
        self
    }

    /// Collect streaming uploads in memory before sending (on by default for `wasm32`).
    pub fn buffer_stream_uploads(mut self, enable: bool) -> Self {
        self.buffer_stream_uploads = Some(enable);
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = Some(n);
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    /// Use `transport` instead of building an `HttpTransport`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resolve builder values and environment overrides into a config.
    pub fn build_config(self) -> Result<(ClientConfig, Option<Arc<dyn Transport>>)> {
        let mut config = ClientConfig::default();

        let base_url = self
            .base_url
            .or_else(|| env_string("KUBO_RPC_URL"));
        if let Some(raw) = base_url {
            config.base_url = Url::parse(raw.trim()).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid base URL '{}'", raw),
                    ErrorContext::new()
                        .with_field_path("base_url")
                        .with_details(e.to_string())
                        .with_source("client_builder"),
                )
            })?;
        }
        if let Some(api_path) = self.api_path {
            config.api_path = api_path;
        }

        config.headers.extend(self.headers);
        config.search_params.merge(self.search_params);

        let timeout = self
            .timeout
            .or_else(|| env_string("KUBO_RPC_TIMEOUT").map(Timeout::Text));
        if let Some(t) = &timeout {
            // fail at build time rather than on the first call
            t.duration()?;
        }
        config.timeout = timeout;

        config.throw_http_errors = self.throw_http_errors;
        if let Some(transform) = self.transform_search_params {
            config.transform_search_params = transform;
        }
        if let Some(buffer) = self.buffer_stream_uploads {
            config.buffer_stream_uploads = buffer;
        }

        config.pool_max_idle_per_host = self
            .pool_max_idle_per_host
            .or_else(|| env_parse("KUBO_RPC_POOL_MAX_IDLE_PER_HOST"))
            .unwrap_or(config.pool_max_idle_per_host);
        config.pool_idle_timeout = self
            .pool_idle_timeout
            .or_else(|| env_parse::<u64>("KUBO_RPC_POOL_IDLE_TIMEOUT_SECS").map(Duration::from_secs))
            .unwrap_or(config.pool_idle_timeout);
        config.proxy_url = self.proxy_url.or_else(|| env_string("KUBO_RPC_PROXY_URL"));

        Ok((config, self.transport))
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let (config, transport) = self.build_config()?;
        let transport = match transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&config)?),
        };
        Ok(Client::with_transport(transport, config))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|s| s.parse::<T>().ok())
}
